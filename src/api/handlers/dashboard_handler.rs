//! Dashboard home and sidebar.

use axum::{extract::State, response::Json};

use crate::api::middleware::{permission, Authorized, CurrentUser};
use crate::api::pages::Page;
use crate::api::AppState;
use crate::errors::AppResult;
use crate::services::DashboardStats;
use domain::MenuNode;

/// Dashboard counters
#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard page", body = DashboardStats),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn index(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ViewDashboard>,
) -> AppResult<Page<DashboardStats>> {
    let stats = state.services.dashboard.stats().await?;
    Page::render(&state, &current_user, "Dashboard", stats).await
}

/// Navigation visible to the current user
#[utoipa::path(
    get,
    path = "/dashboard/sidebar",
    tag = "Dashboard",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Sidebar tree", body = Vec<MenuNode>))
)]
pub async fn sidebar(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<MenuNode>>> {
    Ok(Json(state.services.menus.sidebar(&current_user.access).await?))
}
