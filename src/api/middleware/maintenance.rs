//! Maintenance-mode gate for the dashboard area.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::CurrentUser;
use crate::api::AppState;
use crate::errors::AppError;

/// Answer 503 to non-admins while maintenance mode is on.
pub async fn maintenance_middleware(
    State(state): State<AppState>,
    current_user: CurrentUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !current_user.is_admin() {
        let settings = state.services.settings.current().await?;
        if settings.maintenance_mode {
            return Err(AppError::Maintenance(settings.maintenance_notice().to_string()));
        }
    }
    Ok(next.run(request).await)
}
