//! User management handlers.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{permission, Authorized};
use crate::api::pages::Page;
use crate::api::AppState;
use crate::errors::AppResult;
use crate::services::{CreateUserInput, UpdateUserInput};
use crate::types::{
    ApiResponse, Created, DataTableRequest, DataTableResponse, NoContent, Paginated,
    PaginationParams,
};
use domain::{Role, UserResponse};

/// New user
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StoreUserRequest {
    #[validate(length(min = 1, max = 255, message = "The name must be between 1 and 255 characters."))]
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[validate(
        email(message = "The email field must be a valid email address."),
        length(max = 255, message = "The email may not be greater than 255 characters.")
    )]
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[validate(
        length(min = 8, message = "The password must be at least 8 characters."),
        must_match(
            other = "password_confirmation",
            message = "The password confirmation does not match."
        )
    )]
    pub password: String,
    pub password_confirmation: String,
    pub role_id: Uuid,
}

/// An omitted or blank password keeps the current one, whatever the
/// confirmation says; a new password must match it.
pub(crate) fn confirm_new_password(
    password: Option<&str>,
    confirmation: Option<&str>,
) -> Result<(), ValidationError> {
    match password.filter(|p| !p.is_empty()) {
        Some(password) if Some(password) != confirmation => {
            let message = "The password confirmation does not match.";
            Err(ValidationError::new("password").with_message(message.into()))
        }
        _ => Ok(()),
    }
}

fn update_password_confirmed(req: &UpdateUserRequest) -> Result<(), ValidationError> {
    confirm_new_password(req.password.as_deref(), req.password_confirmation.as_deref())
}

/// User changes; a blank password keeps the current one
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "update_password_confirmed", skip_on_field_errors = false))]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "The name must be between 1 and 255 characters."))]
    pub name: String,
    #[validate(
        email(message = "The email field must be a valid email address."),
        length(max = 255, message = "The email may not be greater than 255 characters.")
    )]
    pub email: String,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub role_id: Uuid,
}

/// Form data for create and edit pages
#[derive(Debug, Serialize, ToSchema)]
pub struct UserForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
    pub roles: Vec<Role>,
}

/// Users list page
#[utoipa::path(
    get,
    path = "/dashboard/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Users page"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn index(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ViewUsers>,
) -> AppResult<Page<Vec<Role>>> {
    let roles = state.services.rbac.list_roles().await?;
    Page::render(&state, &current_user, "Users/Index", roles).await
}

/// Users data table
#[utoipa::path(
    post,
    path = "/dashboard/users/json",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = DataTableRequest,
    responses((status = 200, description = "One draw of the users table"))
)]
pub async fn datatable(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ViewUsers>,
    Json(req): Json<DataTableRequest>,
) -> AppResult<Json<DataTableResponse<UserResponse>>> {
    let page = state.services.users.datatable(&req).await?;
    Ok(Json(page.map(UserResponse::from)))
}

/// Create form
#[utoipa::path(
    get,
    path = "/dashboard/users/create",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Create form", body = UserForm))
)]
pub async fn create(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::CreateUsers>,
) -> AppResult<Page<UserForm>> {
    let roles = state.services.rbac.list_roles().await?;
    Page::render(&state, &current_user, "Users/Create", UserForm { user: None, roles }).await
}

/// Create a user
#[utoipa::path(
    post,
    path = "/dashboard/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = StoreUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 422, description = "Validation error")
    )
)]
pub async fn store(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::CreateUsers>,
    ValidatedJson(payload): ValidatedJson<StoreUserRequest>,
) -> AppResult<Created<UserResponse>> {
    let user = state
        .services
        .users
        .create_user(
            CreateUserInput {
                name: payload.name,
                email: payload.email,
                password: payload.password,
                role_id: payload.role_id,
            },
            current_user.id(),
        )
        .await?;
    Ok(Created(UserResponse::from(user)))
}

/// Edit form
#[utoipa::path(
    get,
    path = "/dashboard/users/{id}/edit",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Edit form", body = UserForm),
        (status = 404, description = "User not found")
    )
)]
pub async fn edit(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::EditUsers>,
    Path(id): Path<Uuid>,
) -> AppResult<Page<UserForm>> {
    let user = state.services.users.get_user(id).await?;
    let roles = state.services.rbac.list_roles().await?;
    let form = UserForm {
        user: Some(UserResponse::from(user)),
        roles,
    };
    Page::render(&state, &current_user, "Users/Edit", form).await
}

/// Update a user
#[utoipa::path(
    put,
    path = "/dashboard/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::EditUsers>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let user = state
        .services
        .users
        .update_user(
            id,
            UpdateUserInput {
                name: payload.name,
                email: payload.email,
                password: payload.password.filter(|p| !p.is_empty()),
                role_id: payload.role_id,
            },
            current_user.id(),
        )
        .await?;
    Ok(Json(ApiResponse::with_message(
        UserResponse::from(user),
        "User updated.",
    )))
}

/// Move a user to the trash
#[utoipa::path(
    delete,
    path = "/dashboard/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User trashed"),
        (status = 403, description = "Forbidden, including deleting yourself")
    )
)]
pub async fn destroy(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::DeleteUsers>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.users.delete_user(id, current_user.id()).await?;
    Ok(NoContent)
}

/// Trashed users
#[utoipa::path(
    get,
    path = "/dashboard/users/trashed",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses((status = 200, description = "Trashed users page"))
)]
pub async fn trashed(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::RestoreUsers>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Page<Paginated<UserResponse>>> {
    let (users, total) = state.services.users.list_trashed(&params).await?;
    let page = Paginated::new(
        users.into_iter().map(UserResponse::from).collect(),
        params.page,
        params.limit(),
        total,
    );
    Page::render(&state, &current_user, "Users/Trashed", page).await
}

/// Restore a trashed user
#[utoipa::path(
    post,
    path = "/dashboard/users/{id}/restore",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User restored", body = UserResponse),
        (status = 404, description = "No trashed user with this id")
    )
)]
pub async fn restore(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::RestoreUsers>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let user = state.services.users.restore_user(id, current_user.id()).await?;
    Ok(Json(ApiResponse::with_message(
        UserResponse::from(user),
        "User restored.",
    )))
}

/// Permanently delete a trashed user
#[utoipa::path(
    delete,
    path = "/dashboard/users/{id}/force",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted for good"),
        (status = 404, description = "No trashed user with this id")
    )
)]
pub async fn force_destroy(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ForceDeleteUsers>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state
        .services
        .users
        .force_delete_user(id, current_user.id())
        .await?;
    Ok(NoContent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::extractors::validation_fields;
    use serde_json::json;

    fn update_request(password: &str, confirmation: &str) -> UpdateUserRequest {
        serde_json::from_value(json!({
            "name": "Grace",
            "email": "grace@example.com",
            "password": password,
            "password_confirmation": confirmation,
            "role_id": Uuid::new_v4(),
        }))
        .unwrap()
    }

    #[test]
    fn test_blank_password_ignores_confirmation() {
        assert!(update_request("", "leftover-text").validate().is_ok());
        assert!(confirm_new_password(None, Some("anything")).is_ok());
    }

    #[test]
    fn test_new_password_must_match_confirmation() {
        assert!(update_request("new-password", "new-password").validate().is_ok());

        let fields = validation_fields(
            &update_request("new-password", "other-password")
                .validate()
                .unwrap_err(),
        );
        assert_eq!(
            fields.get("password").map(|m| m[0].as_str()),
            Some("The password confirmation does not match.")
        );
        assert!(confirm_new_password(Some("new-password"), None).is_err());
    }
}
