//! Menu administration.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::pages::Page;
use crate::api::AppState;
use crate::errors::AppResult;
use crate::infra::repositories::MenuInput;
use crate::types::{ApiResponse, Created, DataTableRequest, DataTableResponse, NoContent};
use domain::{Menu, MenuNode, MenuPosition};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MenuRequest {
    pub parent_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255, message = "The title must be between 1 and 255 characters."))]
    #[schema(example = "Users")]
    pub title: String,
    #[validate(length(max = 255, message = "The route may not be greater than 255 characters."))]
    #[schema(example = "/dashboard/users")]
    pub route: Option<String>,
    #[validate(length(max = 100, message = "The icon may not be greater than 100 characters."))]
    pub icon: Option<String>,
    #[validate(length(max = 255, message = "The permission may not be greater than 255 characters."))]
    #[schema(example = "view-users")]
    pub permission: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "The position must be at least 0."))]
    pub position: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<MenuRequest> for MenuInput {
    fn from(req: MenuRequest) -> Self {
        MenuInput {
            parent_id: req.parent_id,
            title: req.title,
            route: req.route,
            icon: req.icon,
            permission: req.permission,
            position: req.position,
            is_active: req.is_active,
        }
    }
}

/// Bulk placement update
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderRequest {
    pub items: Vec<MenuPosition>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MenuForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu: Option<Menu>,
    /// Candidate parents
    pub tree: Vec<MenuNode>,
}

#[utoipa::path(get, path = "/admin/menus", tag = "Admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Full menu tree", body = Vec<MenuNode>)))]
pub async fn index(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Page<Vec<MenuNode>>> {
    let tree = state.services.menus.tree().await?;
    Page::render(&state, &current_user, "Admin/Menus/Index", tree).await
}

#[utoipa::path(post, path = "/admin/menus/json", tag = "Admin",
    security(("bearer_auth" = [])), request_body = DataTableRequest,
    responses((status = 200, description = "One draw of the menus table")))]
pub async fn datatable(
    State(state): State<AppState>,
    Json(req): Json<DataTableRequest>,
) -> AppResult<Json<DataTableResponse<Menu>>> {
    Ok(Json(state.services.menus.datatable(&req).await?))
}

#[utoipa::path(get, path = "/admin/menus/create", tag = "Admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Create form", body = MenuForm)))]
pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Page<MenuForm>> {
    let form = MenuForm {
        menu: None,
        tree: state.services.menus.tree().await?,
    };
    Page::render(&state, &current_user, "Admin/Menus/Create", form).await
}

#[utoipa::path(post, path = "/admin/menus", tag = "Admin",
    security(("bearer_auth" = [])), request_body = MenuRequest,
    responses((status = 201, description = "Menu created", body = Menu),
        (status = 422, description = "Validation error")))]
pub async fn store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<MenuRequest>,
) -> AppResult<Created<Menu>> {
    let menu = state
        .services
        .menus
        .create_menu(payload.into(), current_user.id())
        .await?;
    Ok(Created(menu))
}

#[utoipa::path(get, path = "/admin/menus/{id}/edit", tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Menu ID")),
    responses((status = 200, description = "Edit form", body = MenuForm), (status = 404, description = "Menu not found")))]
pub async fn edit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Page<MenuForm>> {
    let form = MenuForm {
        menu: Some(state.services.menus.get_menu(id).await?),
        tree: state.services.menus.tree().await?,
    };
    Page::render(&state, &current_user, "Admin/Menus/Edit", form).await
}

#[utoipa::path(put, path = "/admin/menus/{id}", tag = "Admin",
    security(("bearer_auth" = [])), request_body = MenuRequest,
    params(("id" = Uuid, Path, description = "Menu ID")),
    responses((status = 200, description = "Menu updated", body = Menu),
        (status = 422, description = "Unknown parent or cycle")))]
pub async fn update(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<MenuRequest>,
) -> AppResult<Json<ApiResponse<Menu>>> {
    let menu = state
        .services
        .menus
        .update_menu(id, payload.into(), current_user.id())
        .await?;
    Ok(Json(ApiResponse::with_message(menu, "Menu updated.")))
}

#[utoipa::path(delete, path = "/admin/menus/{id}", tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Menu ID")),
    responses((status = 204, description = "Menu and its subtree deleted")))]
pub async fn destroy(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.menus.delete_menu(id, current_user.id()).await?;
    Ok(NoContent)
}

#[utoipa::path(post, path = "/admin/menus/reorder", tag = "Admin",
    security(("bearer_auth" = [])), request_body = ReorderRequest,
    responses((status = 200, description = "New tree", body = Vec<MenuNode>),
        (status = 422, description = "Unknown menu or a menu placed under itself")))]
pub async fn reorder(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(payload): Json<ReorderRequest>,
) -> AppResult<Json<Vec<MenuNode>>> {
    let tree = state
        .services
        .menus
        .reorder(payload.items, current_user.id())
        .await?;
    Ok(Json(tree))
}
