//! Integration tests for the HTTP surface that needs no database or Redis.
//!
//! Extractors, middleware and error rendering are exercised through small
//! axum routers; service-backed routes are covered by the router tests.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    middleware,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceExt;
use utoipa::OpenApi;
use validator::Validate;

use backoffice::api::extractors::ValidatedJson;
use backoffice::api::middleware::input_echo_middleware;
use backoffice::api::ApiDoc;
use backoffice::errors::AppError;
use backoffice::types::{ApiResponse, DataTableRequest};
use domain::production::ensure_date_order;

// =============================================================================
// Test Helpers
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
struct SignupRequest {
    #[validate(email(message = "The email must be a valid email address."))]
    email: String,
    #[validate(length(min = 8, message = "The password must be at least 8 characters."))]
    password: String,
    #[validate(length(min = 1, message = "The name field is required."))]
    name: String,
}

async fn signup(ValidatedJson(req): ValidatedJson<SignupRequest>) -> Json<Value> {
    Json(json!({ "email": req.email, "name": req.name }))
}

fn signup_router() -> Router {
    Router::new()
        .route("/signup", post(signup))
        .layer(middleware::from_fn(input_echo_middleware))
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Validation and input echo
// =============================================================================

#[tokio::test]
async fn test_valid_payload_reaches_handler() {
    let response = signup_router()
        .oneshot(json_request(
            "/signup",
            json!({"email": "ada@example.com", "password": "long-enough", "name": "Ada"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Ada");
}

#[tokio::test]
async fn test_validation_error_lists_fields_and_echoes_input_without_password() {
    let response = signup_router()
        .oneshot(json_request(
            "/signup",
            json!({"email": "not-an-email", "password": "short", "name": "Ada"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    let error = &body["error"];
    assert_eq!(error["code"], "VALIDATION_ERROR");
    assert_eq!(
        error["fields"]["email"][0],
        "The email must be a valid email address."
    );
    assert!(error["fields"]["password"].is_array());
    assert_eq!(error["input"]["email"], "not-an-email");
    assert_eq!(error["input"]["name"], "Ada");
    assert!(error["input"].get("password").is_none());
}

#[tokio::test]
async fn test_wrongly_typed_body_is_unprocessable() {
    let response = signup_router()
        .oneshot(json_request("/signup", json!({"email": 42})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["fields"]["email"][0], "The email field is invalid.");
    assert!(body["error"]["fields"].get("body").is_none());
}

#[tokio::test]
async fn test_missing_field_is_keyed_by_name() {
    let response = signup_router()
        .oneshot(json_request(
            "/signup",
            json!({"email": "ada@example.com", "password": "long-enough"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["fields"]["name"][0], "The name field is required.");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let response = signup_router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Error rendering
// =============================================================================

#[tokio::test]
async fn test_forbidden_body() {
    let response = AppError::Forbidden.into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
    assert_eq!(body["error"]["message"], "This action is unauthorized.");
    assert!(body["error"].get("fields").is_none());
}

#[tokio::test]
async fn test_missing_reference_cites_field() {
    let response = AppError::invalid_reference("line_id").into_response();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(
        body["error"]["fields"]["line_id"][0],
        "The selected line id is invalid."
    );
}

#[tokio::test]
async fn test_internal_error_hides_detail() {
    let response = AppError::internal("connection pool exhausted").into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    let message = body["error"]["message"].as_str().unwrap();
    assert!(!message.contains("pool"));
}

// =============================================================================
// Shared types
// =============================================================================

#[test]
fn test_datatable_request_defaults_and_cap() {
    let req: DataTableRequest = serde_json::from_value(json!({
        "draw": 2,
        "start": 20,
        "length": 1000,
        "search": {"value": "  line  "},
        "order": [{"column": "code", "dir": "desc"}]
    }))
    .unwrap();

    assert_eq!(req.draw, 2);
    assert_eq!(req.offset(), 20);
    assert_eq!(req.limit(), 100);
    assert_eq!(req.term(), Some("line"));
    assert_eq!(req.order[0].column, "code");
}

#[test]
fn test_api_response_with_message() {
    let response = ApiResponse::with_message(42, "Line updated.");
    assert!(response.success);
    assert_eq!(response.data, Some(42));
    assert_eq!(response.message.as_deref(), Some("Line updated."));
}

// =============================================================================
// Business rules visible at the edge
// =============================================================================

#[test]
fn test_schedule_finish_before_start_fails_on_finish_date() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
    let before = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();

    let err = ensure_date_order("start_date", start, "finish_date", before).unwrap_err();
    let app_err = AppError::from(err);
    match app_err {
        AppError::Validation(fields) => assert!(fields.contains("finish_date")),
        other => panic!("expected validation error, got {other:?}"),
    }

    assert!(ensure_date_order("start_date", start, "finish_date", start).is_ok());
}

#[test]
fn test_openapi_document_serializes() {
    let doc = ApiDoc::openapi().to_json().unwrap();
    assert!(doc.contains("/dashboard/users/{id}/restore"));
    assert!(doc.contains("bearer_auth"));
}
