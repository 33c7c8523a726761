//! Own-profile handlers.

use axum::{
    extract::{Multipart, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::user_handler::confirm_new_password;
use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::pages::Page;
use crate::api::AppState;
use crate::errors::{AppError, AppResult};
use crate::services::ProfileInput;
use crate::types::ApiResponse;
use domain::UserResponse;

fn profile_password_confirmed(req: &ProfileRequest) -> Result<(), ValidationError> {
    confirm_new_password(req.password.as_deref(), req.password_confirmation.as_deref())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "profile_password_confirmed", skip_on_field_errors = false))]
pub struct ProfileRequest {
    #[validate(length(min = 1, max = 255, message = "The name must be between 1 and 255 characters."))]
    pub name: String,
    #[validate(
        email(message = "The email field must be a valid email address."),
        length(max = 255, message = "The email may not be greater than 255 characters.")
    )]
    pub email: String,
    /// New password; omit or leave blank to keep the current one
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    /// Required when changing the password of an account that has one
    pub current_password: Option<String>,
}

#[utoipa::path(get, path = "/dashboard/profile", tag = "Profile",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Profile page", body = UserResponse)))]
pub async fn show(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Page<UserResponse>> {
    let user = UserResponse::from(&current_user.user);
    Page::render(&state, &current_user, "Profile/Edit", user).await
}

#[utoipa::path(put, path = "/dashboard/profile", tag = "Profile",
    security(("bearer_auth" = [])), request_body = ProfileRequest,
    responses((status = 200, description = "Profile updated", body = UserResponse),
        (status = 422, description = "Validation error or wrong current password")))]
pub async fn update(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<ProfileRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let user = state
        .services
        .profile
        .update_profile(
            current_user.id(),
            ProfileInput {
                name: payload.name,
                email: payload.email,
                password: payload.password.filter(|p| !p.is_empty()),
                current_password: payload.current_password,
            },
        )
        .await?;
    Ok(Json(ApiResponse::with_message(
        UserResponse::from(user),
        "Profile updated.",
    )))
}

/// Multipart upload with an `avatar` image
#[utoipa::path(post, path = "/dashboard/profile/avatar", tag = "Profile",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Avatar replaced", body = UserResponse),
        (status = 422, description = "Not an image or too large"),
        (status = 429, description = "Upload rate limit reached")))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let mut avatar = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?
    {
        if field.name() == Some("avatar") {
            let name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::bad_request(e.body_text()))?;
            avatar = Some((name, bytes.to_vec()));
        }
    }
    let (file_name, bytes) =
        avatar.ok_or_else(|| AppError::field("avatar", "The avatar field is required."))?;

    let user = state
        .services
        .profile
        .upload_avatar(current_user.id(), file_name, bytes)
        .await?;
    Ok(Json(ApiResponse::with_message(
        UserResponse::from(user),
        "Avatar updated.",
    )))
}

#[utoipa::path(delete, path = "/dashboard/profile/avatar", tag = "Profile",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Avatar removed", body = UserResponse)))]
pub async fn remove_avatar(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let user = state.services.profile.remove_avatar(current_user.id()).await?;
    Ok(Json(ApiResponse::with_message(
        UserResponse::from(user),
        "Avatar removed.",
    )))
}
