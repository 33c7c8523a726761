//! Session authentication and authorization gates.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::marker::PhantomData;

use crate::api::AppState;
use crate::config::{BEARER_TOKEN_PREFIX, SESSION_COOKIE};
use crate::errors::AppError;
use domain::{AccessProfile, User};

/// Authenticated principal, reloaded from the store on every request
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub user: User,
    pub access: AccessProfile,
}

impl CurrentUser {
    pub fn id(&self) -> uuid::Uuid {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.access.is_admin()
    }

    pub fn can(&self, permission: &str) -> bool {
        self.access.has_permission(permission)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Permission name checked by the [`Authorized`] extractor
pub trait RequiredPermission: Send + Sync + 'static {
    const NAME: &'static str;
}

macro_rules! permission_markers {
    ($($marker:ident => $name:path),* $(,)?) => {
        $(
            #[derive(Debug)]
            pub struct $marker;

            impl super::RequiredPermission for $marker {
                const NAME: &'static str = $name;
            }
        )*
    };
}

/// One marker type per catalogue permission.
pub mod permission {
    permission_markers! {
        ViewDashboard => domain::PERM_VIEW_DASHBOARD,
        ViewUsers => domain::PERM_VIEW_USERS,
        CreateUsers => domain::PERM_CREATE_USERS,
        EditUsers => domain::PERM_EDIT_USERS,
        DeleteUsers => domain::PERM_DELETE_USERS,
        RestoreUsers => domain::PERM_RESTORE_USERS,
        ForceDeleteUsers => domain::PERM_FORCE_DELETE_USERS,
        ViewProduction => domain::PERM_VIEW_PRODUCTION,
        ManageProduction => domain::PERM_MANAGE_PRODUCTION,
        RecordOutput => domain::PERM_RECORD_OUTPUT,
        ViewGallery => domain::PERM_VIEW_GALLERY,
        ManageGallery => domain::PERM_MANAGE_GALLERY,
        ManageSettings => domain::PERM_MANAGE_SETTINGS,
    }
}

/// Current user holding permission `P`.
///
/// Resolved from the request parts, so it must come before `Path`, `Json`,
/// `ValidatedJson` or `Multipart`. A caller without the permission gets 403
/// before the path or body is looked at.
#[derive(Debug)]
pub struct Authorized<P>(pub CurrentUser, pub PhantomData<P>);

#[async_trait]
impl<S: Send + Sync, P: RequiredPermission> FromRequestParts<S> for Authorized<P> {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let current_user = CurrentUser::from_request_parts(parts, state).await?;
        require_permission(&current_user, P::NAME)?;
        Ok(Self(current_user, PhantomData))
    }
}

/// Session token from the `session` cookie, falling back to a bearer header.
fn session_token(request: &Request) -> Option<String> {
    let jar = CookieJar::from_headers(request.headers());
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_TOKEN_PREFIX))
        .map(str::to_string)
}

/// Session authentication middleware.
///
/// Resolves the session token into a live user, rejects unverified
/// addresses, then injects the [`CurrentUser`] into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(&request).ok_or(AppError::Unauthorized)?;

    let (user, access) = state.services.auth.authenticate(&token).await?;

    if !user.is_verified() {
        tracing::debug!(user_id = %user.id, "Rejected unverified user");
        return Err(AppError::Unverified);
    }

    request.extensions_mut().insert(CurrentUser { user, access });

    Ok(next.run(request).await)
}

/// Admin-area gate; must run after [`auth_middleware`].
pub async fn admin_middleware(
    current_user: CurrentUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_admin(&current_user)?;
    Ok(next.run(request).await)
}

/// Require admin role, returns Forbidden error if not admin.
pub fn require_admin(user: &CurrentUser) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Require a permission string, returns Forbidden error when missing.
pub fn require_permission(user: &CurrentUser, permission: &str) -> Result<(), AppError> {
    if user.can(permission) {
        Ok(())
    } else {
        tracing::debug!(user_id = %user.id(), permission, "Permission denied");
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn current_user(roles: &[&str], permissions: &[&str]) -> CurrentUser {
        CurrentUser {
            user: User {
                id: Uuid::new_v4(),
                name: "Test".into(),
                email: "test@example.com".into(),
                password_hash: None,
                email_verified_at: Some(Utc::now()),
                avatar_path: None,
                provider: None,
                provider_id: None,
                roles: vec![],
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
            },
            access: AccessProfile {
                roles: roles.iter().map(|r| r.to_string()).collect::<BTreeSet<_>>(),
                permissions: permissions.iter().map(|p| p.to_string()).collect(),
            },
        }
    }

    #[test]
    fn test_permission_gate() {
        let user = current_user(&[], &["view-users"]);
        assert!(require_permission(&user, "view-users").is_ok());
        assert!(matches!(
            require_permission(&user, "delete-users"),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(require_admin(&user), Err(AppError::Forbidden)));
        assert!(require_admin(&current_user(&["admin"], &[])).is_ok());
    }

    #[tokio::test]
    async fn test_authorized_checks_marker_permission() {
        let (mut parts, _) = Request::builder()
            .body(axum::body::Body::empty())
            .unwrap()
            .into_parts();
        parts
            .extensions
            .insert(current_user(&[], &[domain::PERM_VIEW_PRODUCTION]));

        let allowed =
            Authorized::<permission::ViewProduction>::from_request_parts(&mut parts, &()).await;
        assert!(allowed.is_ok());

        let denied =
            Authorized::<permission::ManageProduction>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(denied, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_authorized_without_session_is_unauthorized() {
        let (mut parts, _) = Request::builder()
            .body(axum::body::Body::empty())
            .unwrap()
            .into_parts();
        let result =
            Authorized::<permission::ViewUsers>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_cookie_wins_over_header() {
        let request = Request::builder()
            .header(COOKIE, "session=from-cookie")
            .header(AUTHORIZATION, "Bearer from-header")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(session_token(&request).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_bearer_header_is_accepted() {
        let request = Request::builder()
            .header(AUTHORIZATION, "Bearer abc")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(session_token(&request).as_deref(), Some("abc"));
    }
}
