//! Role and permission administration.

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
use crate::services::{PermissionInput, RoleInput};
use crate::types::{ApiResponse, Created, DataTableRequest, DataTableResponse, NoContent};
use domain::{Permission, Role};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RoleRequest {
    #[validate(length(min = 1, max = 255, message = "The name must be between 1 and 255 characters."))]
    #[schema(example = "editor")]
    pub name: String,
    #[validate(length(max = 255, message = "The guard name may not be greater than 255 characters."))]
    pub guard_name: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Uuid>,
}

impl From<RoleRequest> for RoleInput {
    fn from(req: RoleRequest) -> Self {
        RoleInput {
            name: req.name,
            guard_name: req.guard_name,
            permission_ids: req.permissions,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PermissionRequest {
    #[validate(length(min = 1, max = 255, message = "The name must be between 1 and 255 characters."))]
    #[schema(example = "export-reports")]
    pub name: String,
    #[validate(length(max = 255, message = "The guard name may not be greater than 255 characters."))]
    pub guard_name: Option<String>,
}

impl From<PermissionRequest> for PermissionInput {
    fn from(req: PermissionRequest) -> Self {
        PermissionInput {
            name: req.name,
            guard_name: req.guard_name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub permissions: Vec<Permission>,
}

// ---- Roles ----

#[utoipa::path(get, path = "/admin/roles", tag = "Admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Roles page"), (status = 403, description = "Admins only")))]
pub async fn roles_index(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Page<Vec<Role>>> {
    let roles = state.services.rbac.list_roles().await?;
    Page::render(&state, &current_user, "Admin/Roles/Index", roles).await
}

#[utoipa::path(post, path = "/admin/roles/json", tag = "Admin",
    security(("bearer_auth" = [])), request_body = DataTableRequest,
    responses((status = 200, description = "One draw of the roles table")))]
pub async fn roles_datatable(
    State(state): State<AppState>,
    Json(req): Json<DataTableRequest>,
) -> AppResult<Json<DataTableResponse<Role>>> {
    Ok(Json(state.services.rbac.roles_datatable(&req).await?))
}

#[utoipa::path(get, path = "/admin/roles/create", tag = "Admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Create form", body = RoleForm)))]
pub async fn roles_create(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Page<RoleForm>> {
    let form = RoleForm {
        role: None,
        permissions: state.services.rbac.list_permissions().await?,
    };
    Page::render(&state, &current_user, "Admin/Roles/Create", form).await
}

#[utoipa::path(post, path = "/admin/roles", tag = "Admin",
    security(("bearer_auth" = [])), request_body = RoleRequest,
    responses((status = 201, description = "Role created", body = Role),
        (status = 422, description = "Duplicate name or unknown permission")))]
pub async fn roles_store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<RoleRequest>,
) -> AppResult<Created<Role>> {
    let role = state
        .services
        .rbac
        .create_role(payload.into(), current_user.id())
        .await?;
    Ok(Created(role))
}

#[utoipa::path(get, path = "/admin/roles/{id}/edit", tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Role ID")),
    responses((status = 200, description = "Edit form", body = RoleForm), (status = 404, description = "Role not found")))]
pub async fn roles_edit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Page<RoleForm>> {
    let form = RoleForm {
        role: Some(state.services.rbac.get_role(id).await?),
        permissions: state.services.rbac.list_permissions().await?,
    };
    Page::render(&state, &current_user, "Admin/Roles/Edit", form).await
}

#[utoipa::path(put, path = "/admin/roles/{id}", tag = "Admin",
    security(("bearer_auth" = [])), request_body = RoleRequest,
    params(("id" = Uuid, Path, description = "Role ID")),
    responses((status = 200, description = "Role updated and permissions synced", body = Role)))]
pub async fn roles_update(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<RoleRequest>,
) -> AppResult<Json<ApiResponse<Role>>> {
    let role = state
        .services
        .rbac
        .update_role(id, payload.into(), current_user.id())
        .await?;
    Ok(Json(ApiResponse::with_message(role, "Role updated.")))
}

#[utoipa::path(delete, path = "/admin/roles/{id}", tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Role ID")),
    responses((status = 204, description = "Role deleted"),
        (status = 422, description = "The admin role cannot be deleted")))]
pub async fn roles_destroy(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.rbac.delete_role(id, current_user.id()).await?;
    Ok(NoContent)
}

// ---- Permissions ----

#[utoipa::path(get, path = "/admin/permissions", tag = "Admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Permissions page")))]
pub async fn permissions_index(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Page<()>> {
    Page::render(&state, &current_user, "Admin/Permissions/Index", ()).await
}

#[utoipa::path(post, path = "/admin/permissions/json", tag = "Admin",
    security(("bearer_auth" = [])), request_body = DataTableRequest,
    responses((status = 200, description = "One draw of the permissions table")))]
pub async fn permissions_datatable(
    State(state): State<AppState>,
    Json(req): Json<DataTableRequest>,
) -> AppResult<Json<DataTableResponse<Permission>>> {
    Ok(Json(state.services.rbac.permissions_datatable(&req).await?))
}

#[utoipa::path(get, path = "/admin/permissions/create", tag = "Admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Create form")))]
pub async fn permissions_create(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Page<Option<Permission>>> {
    Page::render(&state, &current_user, "Admin/Permissions/Create", None).await
}

#[utoipa::path(post, path = "/admin/permissions", tag = "Admin",
    security(("bearer_auth" = [])), request_body = PermissionRequest,
    responses((status = 201, description = "Permission created", body = Permission),
        (status = 422, description = "Duplicate name")))]
pub async fn permissions_store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<PermissionRequest>,
) -> AppResult<Created<Permission>> {
    let permission = state
        .services
        .rbac
        .create_permission(payload.into(), current_user.id())
        .await?;
    Ok(Created(permission))
}

#[utoipa::path(get, path = "/admin/permissions/{id}/edit", tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Permission ID")),
    responses((status = 200, description = "Edit form", body = Permission), (status = 404, description = "Permission not found")))]
pub async fn permissions_edit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Page<Option<Permission>>> {
    let permission = state.services.rbac.get_permission(id).await?;
    Page::render(&state, &current_user, "Admin/Permissions/Edit", Some(permission)).await
}

#[utoipa::path(put, path = "/admin/permissions/{id}", tag = "Admin",
    security(("bearer_auth" = [])), request_body = PermissionRequest,
    params(("id" = Uuid, Path, description = "Permission ID")),
    responses((status = 200, description = "Permission updated", body = Permission)))]
pub async fn permissions_update(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<PermissionRequest>,
) -> AppResult<Json<ApiResponse<Permission>>> {
    let permission = state
        .services
        .rbac
        .update_permission(id, payload.into(), current_user.id())
        .await?;
    Ok(Json(ApiResponse::with_message(permission, "Permission updated.")))
}

#[utoipa::path(delete, path = "/admin/permissions/{id}", tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Permission ID")),
    responses((status = 204, description = "Permission deleted")))]
pub async fn permissions_destroy(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state
        .services
        .rbac
        .delete_permission(id, current_user.id())
        .await?;
    Ok(NoContent)
}
