//! Authentication service - Session tokens and principal resolution.
//!
//! Tokens are stateless JWTs; every authenticated request reloads the user
//! and its roles so revocations take effect immediately.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::ActivityService;
use crate::config::{Config, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER};
use crate::errors::{AppError, AppResult};
use crate::infra::repositories::{RbacRepository, UserRepository};
use domain::{AccessProfile, DomainError, NewActivity, Password, User, ACTION_LOGIN, ACTION_LOGOUT};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// JWT claims payload
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// Token returned after a successful sign-in
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenResponse {
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Lifetime in seconds
    #[schema(example = 86400)]
    pub expires_in: i64,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Check credentials and open a session
    async fn login(&self, email: String, password: String) -> AppResult<(User, TokenResponse)>;

    /// Sign a session token for an already authenticated user
    fn issue_token(&self, user: &User) -> AppResult<TokenResponse>;

    fn verify_token(&self, token: &str) -> AppResult<Claims>;

    /// Resolve a token into the live user and its effective access
    async fn authenticate(&self, token: &str) -> AppResult<(User, AccessProfile)>;

    async fn logout(&self, user_id: Uuid);
}

fn generate_token(user: &User, config: &Config) -> AppResult<TokenResponse> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.jwt_expiration_hours);

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )?;

    Ok(TokenResponse {
        access_token: token,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        expires_in: config.jwt_expiration_hours * SECONDS_PER_HOUR,
    })
}

fn verify_token_internal(token: &str, config: &Config) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    rbac: Arc<dyn RbacRepository>,
    activity: Arc<dyn ActivityService>,
    config: Config,
}

impl Authenticator {
    pub fn new(
        users: Arc<dyn UserRepository>,
        rbac: Arc<dyn RbacRepository>,
        activity: Arc<dyn ActivityService>,
        config: Config,
    ) -> Self {
        Self {
            users,
            rbac,
            activity,
            config,
        }
    }
}

#[async_trait]
impl AuthService for Authenticator {
    async fn login(&self, email: String, password: String) -> AppResult<(User, TokenResponse)> {
        let user = self.users.find_by_email(&email).await?;

        // Verify against a dummy hash when the account is missing so both
        // paths cost the same.
        let dummy_hash = "$argon2id$v=19$m=19456,t=2,p=1$dummysalt123456$dummyhash1234567890123456789012";

        let stored_hash = user
            .as_ref()
            .and_then(|u| u.password_hash.as_deref())
            .unwrap_or(dummy_hash);
        let password_valid = Password::from_hash(stored_hash.to_string()).verify(&password);

        let user = match user {
            Some(user) if password_valid && user.password_hash.is_some() => user,
            _ => {
                tracing::debug!(email = %email, "Rejected login attempt");
                return Err(DomainError::InvalidCredentials.into());
            }
        };

        let token = generate_token(&user, &self.config)?;

        self.activity
            .record(
                NewActivity::new("user", ACTION_LOGIN)
                    .by(Some(user.id))
                    .on(user.id)
                    .describe(format!("{} signed in", user.email)),
            )
            .await;

        Ok((user, token))
    }

    fn issue_token(&self, user: &User) -> AppResult<TokenResponse> {
        generate_token(user, &self.config)
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        verify_token_internal(token, &self.config)
    }

    async fn authenticate(&self, token: &str) -> AppResult<(User, AccessProfile)> {
        let claims = self.verify_token(token)?;

        // Trashed accounts lose their sessions
        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let roles = self.rbac.roles_for_user(user.id).await?;
        Ok((user, AccessProfile::from_roles(&roles)))
    }

    async fn logout(&self, user_id: Uuid) {
        self.activity
            .record(
                NewActivity::new("user", ACTION_LOGOUT)
                    .by(Some(user_id))
                    .on(user_id)
                    .describe("signed out"),
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::{MockRbacRepository, MockUserRepository};
    use crate::services::MockActivityService;

    fn user_with_password(plain: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: Some(Password::new(plain).unwrap().into_string()),
            email_verified_at: Some(Utc::now()),
            avatar_path: None,
            provider: None,
            provider_id: None,
            roles: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn quiet_activity() -> Arc<MockActivityService> {
        let mut activity = MockActivityService::new();
        activity.expect_record().returning(|_| ());
        Arc::new(activity)
    }

    #[tokio::test]
    async fn test_login_issues_token_that_verifies() {
        let user = user_with_password("correct-horse");
        let stored = user.clone();

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(stored.clone())));

        let auth = Authenticator::new(
            Arc::new(users),
            Arc::new(MockRbacRepository::new()),
            quiet_activity(),
            Config::for_tests(),
        );

        let (logged_in, token) = auth
            .login("ada@example.com".into(), "correct-horse".into())
            .await
            .unwrap();

        assert_eq!(logged_in.id, user.id);
        let claims = auth.verify_token(&token.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
    }

    #[tokio::test]
    async fn test_wrong_password_fails_on_email_field() {
        let stored = user_with_password("correct-horse");

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(stored.clone())));

        let mut activity = MockActivityService::new();
        activity.expect_record().never();

        let auth = Authenticator::new(
            Arc::new(users),
            Arc::new(MockRbacRepository::new()),
            Arc::new(activity),
            Config::for_tests(),
        );

        let err = auth
            .login("ada@example.com".into(), "wrong-horse".into())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref f) if f.contains("email")));
    }

    #[tokio::test]
    async fn test_oauth_only_account_cannot_use_password_login() {
        let mut stored = user_with_password("irrelevant");
        stored.password_hash = None;

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(stored.clone())));

        let auth = Authenticator::new(
            Arc::new(users),
            Arc::new(MockRbacRepository::new()),
            quiet_activity(),
            Config::for_tests(),
        );

        assert!(auth
            .login("ada@example.com".into(), "irrelevant".into())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_trashed_user() {
        let user = user_with_password("correct-horse");

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));

        let auth = Authenticator::new(
            Arc::new(users),
            Arc::new(MockRbacRepository::new()),
            quiet_activity(),
            Config::for_tests(),
        );

        let token = auth.issue_token(&user).unwrap();
        let err = auth.authenticate(&token.access_token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let auth = Authenticator::new(
            Arc::new(MockUserRepository::new()),
            Arc::new(MockRbacRepository::new()),
            quiet_activity(),
            Config::for_tests(),
        );
        assert!(matches!(
            auth.verify_token("not.a.jwt"),
            Err(AppError::Jwt(_))
        ));
    }
}
