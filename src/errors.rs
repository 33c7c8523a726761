//! Centralized error handling.
//!
//! Provides a unified error type for the entire application,
//! with automatic HTTP response conversion.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::{DomainError, FieldErrors};
use serde::Serialize;
use thiserror::Error;

use crate::config::{FORBIDDEN_MESSAGE, UNVERIFIED_MESSAGE};

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    #[error("Unauthenticated.")]
    Unauthorized,

    #[error("{}", FORBIDDEN_MESSAGE)]
    Forbidden,

    #[error("{}", UNVERIFIED_MESSAGE)]
    Unverified,

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("{0} already exists")]
    Conflict(String),

    // Validation
    #[error("{0}")]
    Validation(FieldErrors),

    #[error("Invalid input: {0}")]
    BadRequest(String),

    // Throttling & availability
    #[error("Too many requests")]
    TooManyRequests { retry_after: u64 },

    #[error("{0}")]
    Maintenance(String),

    // External service errors
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[error("Authentication error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Cache error")]
    Cache(#[from] redis::RedisError),

    #[error("Storage error")]
    Storage(#[from] std::io::Error),

    #[error("OAuth provider error: {0}")]
    OAuth(String),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::Unverified => "EMAIL_NOT_VERIFIED",
            AppError::NotFound => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::TooManyRequests { .. } => "TOO_MANY_REQUESTS",
            AppError::Maintenance(_) => "MAINTENANCE",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Jwt(_) => "AUTH_ERROR",
            AppError::Cache(_) => "CACHE_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::OAuth(_) => "OAUTH_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::Unverified => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Maintenance(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::OAuth(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Storage(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(fields) => fields
                .first_message()
                .unwrap_or("The given data was invalid.")
                .to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Maintenance(msg) => msg.clone(),

            // Hide details for internal/security errors
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Jwt(e) => {
                tracing::debug!("JWT error: {:?}", e);
                "Invalid or expired session".to_string()
            }
            AppError::Cache(e) => {
                tracing::error!("Cache error: {:?}", e);
                "An internal error occurred".to_string()
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                "An internal error occurred".to_string()
            }
            AppError::OAuth(msg) => {
                tracing::error!("OAuth error: {}", msg);
                "Unable to sign in with the selected provider".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            // Use default message for others
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = match &self {
            AppError::TooManyRequests { retry_after } => Some(*retry_after),
            _ => None,
        };
        let message = self.user_message();
        let code = self.code().to_string();
        let fields = match self {
            AppError::Validation(fields) => Some(fields),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message,
                fields,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Extension trait for running every field check before failing
pub trait CollectFieldErrors {
    /// Moves a validation failure into `errors`; any other error is returned.
    fn collect_into(self, errors: &mut FieldErrors) -> AppResult<()>;
}

impl<E: Into<AppError>> CollectFieldErrors for Result<(), E> {
    fn collect_into(self, errors: &mut FieldErrors) -> AppResult<()> {
        match self.map_err(Into::into) {
            Err(AppError::Validation(fields)) => {
                errors.merge(fields);
                Ok(())
            }
            other => other,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(fields) => AppError::Validation(fields),
            DomainError::Password(msg) => {
                AppError::Validation(FieldErrors::single("password", msg))
            }
            DomainError::NotFound(_) => AppError::NotFound,
            DomainError::Conflict(entity) => AppError::Conflict(entity),
            DomainError::Unauthorized => AppError::Unauthorized,
            DomainError::Forbidden => AppError::Forbidden,
            DomainError::InvalidCredentials => AppError::Validation(FieldErrors::single(
                "email",
                "These credentials do not match our records.",
            )),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Convenience constructors
impl AppError {
    /// Validation failure on a single field
    pub fn field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        AppError::Validation(FieldErrors::single(field, msg))
    }

    /// `The {field} has already been taken.`
    pub fn taken(field: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.add_taken(field);
        AppError::Validation(errors)
    }

    /// `The selected {field} is invalid.`
    pub fn invalid_reference(field: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.add_invalid_reference(field);
        AppError::Validation(errors)
    }

    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Fails with everything collected, if anything was.
    pub fn check_fields(errors: FieldErrors) -> AppResult<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}
