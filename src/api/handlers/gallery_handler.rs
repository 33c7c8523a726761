//! Gallery handlers: folders, uploads and protected file access.

use axum::{
    extract::{Multipart, Path, Query, State},
    response::{Json, Response},
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::public_handler::file_response;
use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{permission, Authorized};
use crate::api::pages::Page;
use crate::api::AppState;
use crate::errors::{AppError, AppResult};
use crate::services::{GalleryListing, UploadInput};
use crate::types::{ApiResponse, Created, DataTableRequest, DataTableResponse, NoContent};
use domain::{Folder, GalleryFile, Visibility};

#[derive(Debug, Deserialize, IntoParams)]
pub struct FolderQuery {
    /// Folder to browse; root when absent
    pub folder_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFolderRequest {
    pub parent_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255, message = "The name must be between 1 and 255 characters."))]
    #[schema(example = "reports")]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameFolderRequest {
    #[validate(length(min = 1, max = 255, message = "The name must be between 1 and 255 characters."))]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VisibilityRequest {
    pub visibility: Visibility,
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::bad_request(e.body_text())
}

/// Gallery browser
#[utoipa::path(get, path = "/dashboard/gallery", tag = "Gallery",
    security(("bearer_auth" = [])), params(FolderQuery),
    responses((status = 200, description = "Folder listing", body = GalleryListing),
        (status = 404, description = "Folder not found")))]
pub async fn index(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ViewGallery>,
    Query(query): Query<FolderQuery>,
) -> AppResult<Page<GalleryListing>> {
    let listing = state.services.gallery.listing(query.folder_id).await?;
    Page::render(&state, &current_user, "Gallery/Index", listing).await
}

/// Files of one folder as a data table
#[utoipa::path(post, path = "/dashboard/gallery/json", tag = "Gallery",
    security(("bearer_auth" = [])), params(FolderQuery), request_body = DataTableRequest,
    responses((status = 200, description = "One draw of the files table")))]
pub async fn datatable(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ViewGallery>,
    Query(query): Query<FolderQuery>,
    Json(req): Json<DataTableRequest>,
) -> AppResult<Json<DataTableResponse<GalleryFile>>> {
    let page = state
        .services
        .gallery
        .files_datatable(&req, query.folder_id)
        .await?;
    Ok(Json(page))
}

#[utoipa::path(post, path = "/dashboard/gallery/folders", tag = "Gallery",
    security(("bearer_auth" = [])), request_body = CreateFolderRequest,
    responses((status = 201, description = "Folder created", body = Folder),
        (status = 422, description = "Invalid name or duplicate path")))]
pub async fn create_folder(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageGallery>,
    ValidatedJson(payload): ValidatedJson<CreateFolderRequest>,
) -> AppResult<Created<Folder>> {
    let folder = state
        .services
        .gallery
        .create_folder(payload.parent_id, payload.name, current_user.id())
        .await?;
    Ok(Created(folder))
}

#[utoipa::path(put, path = "/dashboard/gallery/folders/{id}", tag = "Gallery",
    security(("bearer_auth" = [])), request_body = RenameFolderRequest,
    params(("id" = Uuid, Path, description = "Folder ID")),
    responses((status = 200, description = "Folder renamed", body = Folder)))]
pub async fn rename_folder(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageGallery>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<RenameFolderRequest>,
) -> AppResult<Json<ApiResponse<Folder>>> {
    let folder = state
        .services
        .gallery
        .rename_folder(id, payload.name, current_user.id())
        .await?;
    Ok(Json(ApiResponse::with_message(folder, "Folder renamed.")))
}

#[utoipa::path(delete, path = "/dashboard/gallery/folders/{id}", tag = "Gallery",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Folder ID")),
    responses((status = 204, description = "Folder deleted"),
        (status = 422, description = "Folder is not empty")))]
pub async fn delete_folder(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageGallery>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.gallery.delete_folder(id, current_user.id()).await?;
    Ok(NoContent)
}

/// Multipart upload with `file`, optional `folder_id` and `visibility`
#[utoipa::path(post, path = "/dashboard/gallery/files", tag = "Gallery",
    security(("bearer_auth" = [])),
    responses((status = 201, description = "File stored", body = GalleryFile),
        (status = 422, description = "Disallowed extension or oversize file"),
        (status = 429, description = "Upload rate limit reached")))]
pub async fn upload(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageGallery>,
    mut multipart: Multipart,
) -> AppResult<Created<GalleryFile>> {

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut folder_id = None;
    let mut visibility = Visibility::Private;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((name, bytes.to_vec()));
            }
            Some("folder_id") => {
                let text = field.text().await.map_err(multipart_error)?;
                if !text.trim().is_empty() {
                    let id = text
                        .trim()
                        .parse::<Uuid>()
                        .map_err(|_| AppError::invalid_reference("folder_id"))?;
                    folder_id = Some(id);
                }
            }
            Some("visibility") => {
                let text = field.text().await.map_err(multipart_error)?;
                visibility = text.trim().parse()?;
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| AppError::field("file", "The file field is required."))?;

    let stored = state
        .services
        .gallery
        .upload(
            UploadInput {
                folder_id,
                file_name,
                bytes,
                visibility,
            },
            current_user.id(),
        )
        .await?;
    Ok(Created(stored))
}

#[utoipa::path(put, path = "/dashboard/gallery/files/{id}/visibility", tag = "Gallery",
    security(("bearer_auth" = [])), request_body = VisibilityRequest,
    params(("id" = Uuid, Path, description = "File ID")),
    responses((status = 200, description = "Visibility changed", body = GalleryFile)))]
pub async fn set_visibility(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageGallery>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VisibilityRequest>,
) -> AppResult<Json<ApiResponse<GalleryFile>>> {
    let file = state
        .services
        .gallery
        .set_visibility(id, payload.visibility, current_user.id())
        .await?;
    Ok(Json(ApiResponse::with_message(file, "Visibility updated.")))
}

#[utoipa::path(delete, path = "/dashboard/gallery/files/{id}", tag = "Gallery",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "File ID")),
    responses((status = 204, description = "File deleted")))]
pub async fn delete_file(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageGallery>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.gallery.delete_file(id, current_user.id()).await?;
    Ok(NoContent)
}

/// Any stored file, public or private
#[utoipa::path(get, path = "/dashboard/storage/{path}", tag = "Gallery",
    security(("bearer_auth" = [])),
    params(("path" = String, Path, description = "Storage-relative file path")),
    responses((status = 200, description = "File contents"), (status = 404, description = "Missing file")))]
pub async fn private_file(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ViewGallery>,
    Path(path): Path<String>,
) -> AppResult<Response> {
    let file = state.services.gallery.open_any(&path).await?;
    Ok(file_response(file))
}
