//! Authentication handlers: password login, logout and OAuth sign-in.

use axum::{
    extract::{Path, Query, State},
    http::header::AUTHORIZATION,
    http::HeaderMap,
    response::{Json, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::AppState;
use crate::config::{
    BEARER_TOKEN_PREFIX, OAUTH_STATE_COOKIE, OAUTH_STATE_TTL_SECONDS, SESSION_COOKIE,
};
use crate::errors::{AppError, AppResult};
use crate::services::TokenResponse;
use crate::types::NoContent;
use domain::UserResponse;

/// User login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// User email address
    #[validate(email(message = "The email field must be a valid email address."))]
    #[schema(example = "admin@example.com")]
    pub email: String,
    /// User password
    #[validate(length(min = 1, message = "The password field is required."))]
    #[schema(example = "password")]
    pub password: String,
}

/// Session opened by a successful login
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub token: TokenResponse,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.config.secure_cookies())
        .same_site(SameSite::Lax)
        .build()
}

fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

/// Random OAuth `state` stamped with its issue time: `{nonce}.{unix_seconds}`
fn issue_state(now: i64) -> String {
    format!("{}.{}", Uuid::new_v4().simple(), now)
}

/// The callback `state` must equal the cookie copy and still be fresh.
fn state_is_valid(expected: Option<&str>, received: Option<&str>, now: i64) -> bool {
    let (Some(expected), Some(received)) = (expected, received) else {
        return false;
    };
    if expected != received {
        return false;
    }
    received
        .rsplit_once('.')
        .and_then(|(_, issued)| issued.parse::<i64>().ok())
        .is_some_and(|issued| now - issued <= OAUTH_STATE_TTL_SECONDS && issued <= now)
}

/// Login and open a session
#[utoipa::path(
    post,
    path = "/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 422, description = "Invalid credentials or input"),
        (status = 429, description = "Too many attempts")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let (user, token) = state
        .services
        .auth
        .login(payload.email, payload.password)
        .await?;

    let jar = jar.add(session_cookie(&state, token.access_token.clone()));
    Ok((
        jar,
        Json(LoginResponse {
            user: UserResponse::from(user),
            token,
        }),
    ))
}

/// Close the session
#[utoipa::path(
    post,
    path = "/logout",
    tag = "Authentication",
    responses((status = 204, description = "Session closed"))
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> (CookieJar, NoContent) {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix(BEARER_TOKEN_PREFIX))
                .map(str::to_string)
        });

    // An expired or forged token still gets its cookie cleared
    if let Some(claims) = token.and_then(|t| state.services.auth.verify_token(&t).ok()) {
        state.services.auth.logout(claims.sub).await;
    }

    (jar.remove(removal(SESSION_COOKIE)), NoContent)
}

/// Start an OAuth sign-in
#[utoipa::path(
    get,
    path = "/auth/{provider}/redirect",
    tag = "Authentication",
    params(("provider" = String, Path, description = "google or github")),
    responses(
        (status = 303, description = "Redirect to the provider"),
        (status = 404, description = "Unknown or unconfigured provider")
    )
)]
pub async fn oauth_redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Redirect)> {
    let csrf = issue_state(Utc::now().timestamp());
    let url = state.services.social.redirect_url(&provider, &csrf)?;

    let cookie = Cookie::build((OAUTH_STATE_COOKIE, csrf))
        .path("/")
        .http_only(true)
        .secure(state.config.secure_cookies())
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), Redirect::to(&url)))
}

/// Finish an OAuth sign-in
#[utoipa::path(
    get,
    path = "/auth/{provider}/callback",
    tag = "Authentication",
    params(
        ("provider" = String, Path, description = "google or github"),
        CallbackQuery
    ),
    responses(
        (status = 303, description = "Signed in, redirect to the dashboard"),
        (status = 400, description = "Missing code or state mismatch"),
        (status = 404, description = "Unknown or unconfigured provider")
    )
)]
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Redirect)> {
    let expected = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    if !state_is_valid(
        expected.as_deref(),
        query.state.as_deref(),
        Utc::now().timestamp(),
    ) {
        tracing::warn!(provider = %provider, "OAuth state mismatch or expired");
        return Err(AppError::bad_request("Invalid OAuth state."));
    }
    let code = query
        .code
        .ok_or_else(|| AppError::bad_request("Missing authorization code."))?;

    let (_, token) = state.services.social.login(&provider, &code).await?;

    let jar = jar
        .remove(removal(OAUTH_STATE_COOKIE))
        .add(session_cookie(&state, token.access_token));
    Ok((jar, Redirect::to("/dashboard")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_must_match_cookie() {
        let state = issue_state(1_000);
        assert!(state_is_valid(Some(&state), Some(&state), 1_010));
        assert!(!state_is_valid(Some(&state), Some("forged.1000"), 1_010));
        assert!(!state_is_valid(None, Some(&state), 1_010));
        assert!(!state_is_valid(Some(&state), None, 1_010));
    }

    #[test]
    fn test_stale_state_is_rejected() {
        let state = issue_state(1_000);
        assert!(state_is_valid(
            Some(&state),
            Some(&state),
            1_000 + OAUTH_STATE_TTL_SECONDS
        ));
        assert!(!state_is_valid(
            Some(&state),
            Some(&state),
            1_001 + OAUTH_STATE_TTL_SECONDS
        ));
    }
}
