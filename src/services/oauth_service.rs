//! Social sign-in through OAuth 2 authorization-code providers.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, Url};
use serde::Deserialize;

use super::{ActivityService, AuthService, TokenResponse};
use crate::config::{Config, OAuthCredentials};
use crate::errors::{AppError, AppResult};
use crate::infra::repositories::{NewUser, RbacRepository, UserRepository};
use domain::{NewActivity, User, ACTION_LOGIN, GUARD_WEB};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            _ => Err(AppError::NotFound),
        }
    }
}

/// Identity returned by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub provider_id: String,
    pub email: String,
    pub name: String,
}

/// Provider-facing half of the flow
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait OAuthClient: Send + Sync {
    /// Where to send the browser, carrying `state`
    fn authorize_url(&self, provider: OAuthProvider, state: &str) -> AppResult<String>;

    /// Exchange the callback code and fetch the signed-in identity
    async fn fetch_profile(&self, provider: OAuthProvider, code: &str) -> AppResult<OAuthProfile>;
}

#[derive(Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Deserialize)]
struct GoogleUser {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

fn provider_error(e: reqwest::Error) -> AppError {
    AppError::OAuth(e.to_string())
}

/// `reqwest` client talking to the real providers
pub struct HttpOAuthClient {
    http: Client,
    config: Config,
}

impl HttpOAuthClient {
    pub fn new(config: Config) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Unconfigured providers do not exist as far as routing is concerned.
    fn credentials(&self, provider: OAuthProvider) -> AppResult<&OAuthCredentials> {
        match provider {
            OAuthProvider::Google => self.config.google_oauth.as_ref(),
            OAuthProvider::Github => self.config.github_oauth.as_ref(),
        }
        .ok_or(AppError::NotFound)
    }

    fn redirect_uri(&self, provider: OAuthProvider) -> String {
        format!(
            "{}/auth/{}/callback",
            self.config.app_url.trim_end_matches('/'),
            provider
        )
    }

    async fn exchange_code(&self, provider: OAuthProvider, code: &str) -> AppResult<String> {
        let credentials = self.credentials(provider)?;
        let redirect_uri = self.redirect_uri(provider);
        let token_url = match provider {
            OAuthProvider::Google => "https://oauth2.googleapis.com/token",
            OAuthProvider::Github => "https://github.com/login/oauth/access_token",
        };

        let token: AccessToken = self
            .http
            .post(token_url)
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(provider_error)?
            .error_for_status()
            .map_err(provider_error)?
            .json()
            .await
            .map_err(provider_error)?;

        Ok(token.access_token)
    }

    async fn google_profile(&self, token: &str) -> AppResult<OAuthProfile> {
        let user: GoogleUser = self
            .http
            .get("https://www.googleapis.com/oauth2/v3/userinfo")
            .bearer_auth(token)
            .send()
            .await
            .map_err(provider_error)?
            .error_for_status()
            .map_err(provider_error)?
            .json()
            .await
            .map_err(provider_error)?;

        let email = user
            .email
            .ok_or_else(|| AppError::OAuth("Google account has no email".into()))?;
        Ok(OAuthProfile {
            provider_id: user.sub,
            name: user.name.unwrap_or_else(|| email.clone()),
            email,
        })
    }

    async fn github_profile(&self, token: &str) -> AppResult<OAuthProfile> {
        let user: GithubUser = self
            .http
            .get("https://api.github.com/user")
            .bearer_auth(token)
            .header(header::USER_AGENT, env!("CARGO_PKG_NAME"))
            .send()
            .await
            .map_err(provider_error)?
            .error_for_status()
            .map_err(provider_error)?
            .json()
            .await
            .map_err(provider_error)?;

        let email = match user.email {
            Some(email) => email,
            // Private addresses only show up on the emails endpoint
            None => {
                let emails: Vec<GithubEmail> = self
                    .http
                    .get("https://api.github.com/user/emails")
                    .bearer_auth(token)
                    .header(header::USER_AGENT, env!("CARGO_PKG_NAME"))
                    .send()
                    .await
                    .map_err(provider_error)?
                    .error_for_status()
                    .map_err(provider_error)?
                    .json()
                    .await
                    .map_err(provider_error)?;
                emails
                    .into_iter()
                    .find(|e| e.primary && e.verified)
                    .map(|e| e.email)
                    .ok_or_else(|| AppError::OAuth("GitHub account has no verified email".into()))?
            }
        };

        Ok(OAuthProfile {
            provider_id: user.id.to_string(),
            name: user.name.unwrap_or(user.login),
            email,
        })
    }
}

#[async_trait]
impl OAuthClient for HttpOAuthClient {
    fn authorize_url(&self, provider: OAuthProvider, state: &str) -> AppResult<String> {
        let credentials = self.credentials(provider)?;
        let redirect_uri = self.redirect_uri(provider);

        let (base, scope) = match provider {
            OAuthProvider::Google => (
                "https://accounts.google.com/o/oauth2/v2/auth",
                "openid email profile",
            ),
            OAuthProvider::Github => ("https://github.com/login/oauth/authorize", "read:user user:email"),
        };

        let url = Url::parse_with_params(
            base,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::internal(format!("Invalid authorize URL: {}", e)))?;

        Ok(url.into())
    }

    async fn fetch_profile(&self, provider: OAuthProvider, code: &str) -> AppResult<OAuthProfile> {
        let token = self.exchange_code(provider, code).await?;
        match provider {
            OAuthProvider::Google => self.google_profile(&token).await,
            OAuthProvider::Github => self.github_profile(&token).await,
        }
    }
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SocialAuthService: Send + Sync {
    fn redirect_url(&self, provider: &str, state: &str) -> AppResult<String>;

    /// Finish the callback: find, link or create the account and open a session
    async fn login(&self, provider: &str, code: &str) -> AppResult<(User, TokenResponse)>;
}

pub struct SocialAuthenticator {
    client: Arc<dyn OAuthClient>,
    users: Arc<dyn UserRepository>,
    rbac: Arc<dyn RbacRepository>,
    auth: Arc<dyn AuthService>,
    activity: Arc<dyn ActivityService>,
    default_role: String,
}

impl SocialAuthenticator {
    pub fn new(
        client: Arc<dyn OAuthClient>,
        users: Arc<dyn UserRepository>,
        rbac: Arc<dyn RbacRepository>,
        auth: Arc<dyn AuthService>,
        activity: Arc<dyn ActivityService>,
        default_role: String,
    ) -> Self {
        Self {
            client,
            users,
            rbac,
            auth,
            activity,
            default_role,
        }
    }

    async fn resolve_user(&self, provider: OAuthProvider, profile: OAuthProfile) -> AppResult<User> {
        if let Some(user) = self
            .users
            .find_by_provider(provider.as_str(), &profile.provider_id)
            .await?
        {
            if user.is_deleted() {
                return Err(AppError::Unauthorized);
            }
            return Ok(user);
        }

        if let Some(user) = self.users.find_by_email(&profile.email).await? {
            tracing::info!(user_id = %user.id, provider = %provider, "Linking OAuth identity");
            return self
                .users
                .link_provider(user.id, provider.as_str(), &profile.provider_id)
                .await;
        }

        // A trashed account still owns its address
        if self.users.email_taken(&profile.email, None).await? {
            return Err(AppError::taken("email"));
        }

        let role = self
            .rbac
            .find_role_by_name(&self.default_role, GUARD_WEB)
            .await?;
        if role.is_none() {
            tracing::warn!(role = %self.default_role, "Default OAuth role missing, creating user without role");
        }

        let user = self
            .users
            .create(NewUser {
                name: profile.name,
                email: profile.email,
                password_hash: None,
                email_verified_at: Some(Utc::now()),
                provider: Some(provider.as_str().to_string()),
                provider_id: Some(profile.provider_id),
                role_id: role.map(|r| r.id),
            })
            .await?;
        tracing::info!(user_id = %user.id, provider = %provider, "User registered through OAuth");
        Ok(user)
    }
}

#[async_trait]
impl SocialAuthService for SocialAuthenticator {
    fn redirect_url(&self, provider: &str, state: &str) -> AppResult<String> {
        self.client.authorize_url(provider.parse()?, state)
    }

    async fn login(&self, provider: &str, code: &str) -> AppResult<(User, TokenResponse)> {
        let provider: OAuthProvider = provider.parse()?;
        let profile = self.client.fetch_profile(provider, code).await?;
        let user = self.resolve_user(provider, profile).await?;
        let token = self.auth.issue_token(&user)?;

        self.activity
            .record(
                NewActivity::new("user", ACTION_LOGIN)
                    .by(Some(user.id))
                    .on(user.id)
                    .describe(format!("{} signed in with {}", user.email, provider)),
            )
            .await;
        Ok((user, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::{MockRbacRepository, MockUserRepository};
    use crate::services::{MockActivityService, MockAuthService};
    use uuid::Uuid;

    fn profile() -> OAuthProfile {
        OAuthProfile {
            provider_id: "12345".into(),
            email: "octo@example.com".into(),
            name: "Octo".into(),
        }
    }

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Octo".into(),
            email: email.into(),
            password_hash: None,
            email_verified_at: Some(Utc::now()),
            avatar_path: None,
            provider: Some("github".into()),
            provider_id: Some("12345".into()),
            roles: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn token() -> TokenResponse {
        TokenResponse {
            access_token: "jwt".into(),
            token_type: "Bearer".into(),
            expires_in: 60,
        }
    }

    fn authenticator(
        users: MockUserRepository,
        rbac: MockRbacRepository,
    ) -> SocialAuthenticator {
        let mut client = MockOAuthClient::new();
        client.expect_fetch_profile().returning(|_, _| Ok(profile()));

        let mut auth = MockAuthService::new();
        auth.expect_issue_token().returning(|_| Ok(token()));

        let mut activity = MockActivityService::new();
        activity.expect_record().returning(|_| ());

        SocialAuthenticator::new(
            Arc::new(client),
            Arc::new(users),
            Arc::new(rbac),
            Arc::new(auth),
            Arc::new(activity),
            "user".into(),
        )
    }

    #[test]
    fn test_unknown_provider_is_not_found() {
        assert!(matches!("twitter".parse::<OAuthProvider>(), Err(AppError::NotFound)));
        assert_eq!("github".parse::<OAuthProvider>().ok(), Some(OAuthProvider::Github));
    }

    #[test]
    fn test_unconfigured_provider_is_not_found() {
        let client = HttpOAuthClient::new(Config::for_tests());
        assert!(matches!(
            client.authorize_url(OAuthProvider::Google, "abc"),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn test_authorize_url_carries_state() {
        let mut config = Config::for_tests();
        config.github_oauth = Some(OAuthCredentials {
            client_id: "cid".into(),
            client_secret: "secret".into(),
        });
        let url = HttpOAuthClient::new(config)
            .authorize_url(OAuthProvider::Github, "xyz")
            .unwrap();

        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains("client_id=cid"));
        assert!(!url.contains("secret"));
    }

    #[tokio::test]
    async fn test_existing_email_is_linked() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_provider().returning(|_, _| Ok(None));
        users
            .expect_find_by_email()
            .returning(|email| Ok(Some(user(email))));
        users
            .expect_link_provider()
            .withf(|_, provider, id| provider == "github" && id == "12345")
            .times(1)
            .returning(|_, _, _| Ok(user("octo@example.com")));
        users.expect_create().never();

        let (linked, _) = authenticator(users, MockRbacRepository::new())
            .login("github", "code")
            .await
            .unwrap();
        assert_eq!(linked.email, "octo@example.com");
    }

    #[tokio::test]
    async fn test_new_identity_creates_verified_user_with_default_role() {
        let role_id = Uuid::new_v4();

        let mut users = MockUserRepository::new();
        users.expect_find_by_provider().returning(|_, _| Ok(None));
        users.expect_find_by_email().returning(|_| Ok(None));
        users.expect_email_taken().returning(|_, _| Ok(false));
        users
            .expect_create()
            .withf(move |u| {
                u.password_hash.is_none()
                    && u.email_verified_at.is_some()
                    && u.role_id == Some(role_id)
                    && u.provider.as_deref() == Some("github")
            })
            .times(1)
            .returning(|u| Ok(user(&u.email)));

        let mut rbac = MockRbacRepository::new();
        rbac.expect_find_role_by_name().returning(move |name, guard| {
            Ok(Some(domain::Role {
                id: role_id,
                name: name.to_string(),
                guard_name: guard.to_string(),
                permissions: vec![],
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }))
        });

        authenticator(users, rbac).login("github", "code").await.unwrap();
    }

    #[tokio::test]
    async fn test_trashed_identity_is_refused() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_provider().returning(|_, _| {
            let mut u = user("octo@example.com");
            u.deleted_at = Some(Utc::now());
            Ok(Some(u))
        });

        let err = authenticator(users, MockRbacRepository::new())
            .login("github", "code")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }
}
