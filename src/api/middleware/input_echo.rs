//! Echo the submitted JSON back inside 422 responses.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::config::UPLOAD_BODY_LIMIT;

fn is_json(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

/// Drop every key that looks like a password, at any depth.
fn strip_passwords(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !key.contains("password"));
            map.values_mut().for_each(strip_passwords);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_passwords),
        _ => {}
    }
}

/// Buffers JSON bodies so a validation failure can return `error.input`.
pub async fn input_echo_middleware(request: Request, next: Next) -> Response {
    if !is_json(&request) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, UPLOAD_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    };
    let input = serde_json::from_slice::<Value>(&bytes).ok();

    let response = next
        .run(Request::from_parts(parts, Body::from(bytes)))
        .await;

    match input {
        Some(input) if response.status() == StatusCode::UNPROCESSABLE_ENTITY => {
            attach_input(response, input).await
        }
        _ => response,
    }
}

async fn attach_input(response: Response, mut input: Value) -> Response {
    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    let mut payload = match serde_json::from_slice::<Value>(&bytes) {
        Ok(payload) => payload,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };

    strip_passwords(&mut input);
    if let Some(error) = payload.get_mut("error").and_then(Value::as_object_mut) {
        error.insert("input".to_string(), input);
    }

    let body = payload.to_string();
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, Body::from(body))
}
