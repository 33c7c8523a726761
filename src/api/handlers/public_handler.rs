//! Unauthenticated endpoints.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::AppState;
use crate::errors::{AppError, AppResult};
use crate::services::StoredFile;
use domain::PublicSettings;

/// Root endpoint
pub async fn root() -> &'static str {
    "Back office API"
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
    services: ServiceHealth,
}

/// Individual service health status
#[derive(Serialize, ToSchema)]
pub struct ServiceHealth {
    database: ServiceStatus,
    redis: ServiceStatus,
}

/// Service status
#[derive(Serialize, ToSchema)]
pub struct ServiceStatus {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<AppResult<()>> for ServiceStatus {
    fn from(result: AppResult<()>) -> Self {
        match result {
            Ok(()) => ServiceStatus {
                status: "healthy",
                error: None,
            },
            Err(e) => ServiceStatus {
                status: "unhealthy",
                error: Some(e.code().to_string()),
            },
        }
    }
}

/// Health check with database and Redis connectivity
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses(
        (status = 200, description = "All dependencies reachable", body = HealthResponse),
        (status = 503, description = "A dependency is down", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (database, redis) = tokio::join!(state.health.database(), state.health.cache());
    let database = ServiceStatus::from(database);
    let redis = ServiceStatus::from(redis);

    let all_healthy = database.status == "healthy" && redis.status == "healthy";
    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" },
        services: ServiceHealth { database, redis },
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

/// Public application settings
#[utoipa::path(
    get,
    path = "/app",
    tag = "System",
    responses((status = 200, description = "Public settings", body = PublicSettings))
)]
pub async fn app_settings(State(state): State<AppState>) -> AppResult<Json<PublicSettings>> {
    let settings = state.services.settings.current().await?;
    Ok(Json(PublicSettings::from(settings)))
}

pub(crate) fn file_response(file: StoredFile) -> Response {
    let content_type = HeaderValue::from_str(&file.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    ([(header::CONTENT_TYPE, content_type)], file.bytes).into_response()
}

/// Public files and avatars
#[utoipa::path(
    get,
    path = "/storage/{path}",
    tag = "Gallery",
    params(("path" = String, Path, description = "Storage-relative file path")),
    responses(
        (status = 200, description = "File contents"),
        (status = 404, description = "Missing or private file")
    )
)]
pub async fn public_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let file = state.services.gallery.open_public(&path).await?;
    Ok(file_response(file))
}
