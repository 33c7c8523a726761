//! Rate limiting middleware backed by the Redis fixed-window counter.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

use super::CurrentUser;
use crate::api::AppState;
use crate::config::{
    RATE_LIMIT_LOGIN_REQUESTS, RATE_LIMIT_LOGIN_WINDOW_SECONDS, RATE_LIMIT_UPLOAD_REQUESTS,
    RATE_LIMIT_UPLOAD_WINDOW_SECONDS,
};
use crate::errors::AppError;

/// Extract client identifier for rate limiting.
/// Uses X-Forwarded-For header if behind proxy, otherwise uses connection IP.
fn client_identifier(request: &Request) -> String {
    if let Some(ip) = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|forwarded| forwarded.split(',').next())
    {
        return ip.trim().to_string();
    }

    if let Some(real_ip) = request
        .headers()
        .get("X-Real-IP")
        .and_then(|h| h.to_str().ok())
    {
        return real_ip.to_string();
    }

    if let Some(connect_info) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip().to_string();
    }

    "unknown".to_string()
}

/// Count the request against `key` and run the handler when allowed.
///
/// Redis failures deny the request.
async fn throttle(
    state: &AppState,
    key: String,
    max_requests: u64,
    window_seconds: u64,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let decision = match state
        .rate_limiter
        .hit(&key, max_requests, window_seconds)
        .await
    {
        Ok(decision) => decision,
        Err(e) => {
            tracing::error!(error = %e, key = %key, "Rate limit check failed - denying request");
            return Err(AppError::TooManyRequests {
                retry_after: window_seconds,
            });
        }
    };

    if !decision.allowed {
        tracing::warn!(key = %key, count = decision.count, "Rate limit exceeded");
        return Err(AppError::TooManyRequests {
            retry_after: decision.retry_after,
        });
    }

    let mut response = next.run(request).await;

    let remaining = max_requests.saturating_sub(decision.count);
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(max_requests));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));

    Ok(response)
}

/// Login attempts, keyed by client address.
pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = format!("login:{}", client_identifier(&request));
    throttle(
        &state,
        key,
        RATE_LIMIT_LOGIN_REQUESTS,
        RATE_LIMIT_LOGIN_WINDOW_SECONDS,
        request,
        next,
    )
    .await
}

/// Upload endpoints, keyed by the authenticated user.
pub async fn upload_rate_limit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = format!("upload:{}", current_user.id());
    throttle(
        &state,
        key,
        RATE_LIMIT_UPLOAD_REQUESTS,
        RATE_LIMIT_UPLOAD_WINDOW_SECONDS,
        request,
        next,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_identifier(&request), "203.0.113.7");
    }

    #[test]
    fn test_unknown_client() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_identifier(&request), "unknown");
    }
}
