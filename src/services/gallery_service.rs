//! Gallery service - folders, uploads and file delivery.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::ActivityService;
use crate::config::{AVATAR_DIRECTORY, GALLERY_DIRECTORY};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::repositories::{GalleryRepository, NewGalleryFile};
use crate::infra::FileStorage;
use crate::types::{DataTableRequest, DataTableResponse};
use domain::gallery::{check_upload, extension_of, folder_path, mime_for, validate_folder_name};
use domain::{
    Folder, GalleryFile, NewActivity, Visibility, ACTION_CREATED, ACTION_DELETED, ACTION_UPDATED,
    ACTION_UPLOADED, ALLOWED_UPLOAD_EXTENSIONS,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Folder view: the open folder, its ancestors and its sub-folders
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GalleryListing {
    pub current: Option<Folder>,
    pub breadcrumbs: Vec<Folder>,
    pub folders: Vec<Folder>,
}

/// Upload received from the multipart form
#[derive(Debug, Clone, PartialEq)]
pub struct UploadInput {
    pub folder_id: Option<Uuid>,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub visibility: Visibility,
}

/// File contents ready to be served
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait GalleryService: Send + Sync {
    async fn listing(&self, folder_id: Option<Uuid>) -> AppResult<GalleryListing>;

    async fn files_datatable(
        &self,
        req: &DataTableRequest,
        folder_id: Option<Uuid>,
    ) -> AppResult<DataTableResponse<GalleryFile>>;

    async fn create_folder(&self, parent_id: Option<Uuid>, name: String, actor: Uuid)
        -> AppResult<Folder>;

    /// Rename in place; descendants follow the new path
    async fn rename_folder(&self, id: Uuid, name: String, actor: Uuid) -> AppResult<Folder>;

    /// Only empty folders can be removed
    async fn delete_folder(&self, id: Uuid, actor: Uuid) -> AppResult<()>;

    async fn upload(&self, input: UploadInput, actor: Uuid) -> AppResult<GalleryFile>;

    async fn set_visibility(&self, id: Uuid, visibility: Visibility, actor: Uuid)
        -> AppResult<GalleryFile>;

    async fn delete_file(&self, id: Uuid, actor: Uuid) -> AppResult<()>;

    /// Serve a path to anonymous visitors: public gallery files and avatars
    async fn open_public(&self, path: &str) -> AppResult<StoredFile>;

    /// Serve any stored path to an authorized user
    async fn open_any(&self, path: &str) -> AppResult<StoredFile>;

    async fn count_files(&self) -> AppResult<u64>;
}

pub struct GalleryManager {
    repo: Arc<dyn GalleryRepository>,
    storage: Arc<dyn FileStorage>,
    activity: Arc<dyn ActivityService>,
}

impl GalleryManager {
    pub fn new(
        repo: Arc<dyn GalleryRepository>,
        storage: Arc<dyn FileStorage>,
        activity: Arc<dyn ActivityService>,
    ) -> Self {
        Self {
            repo,
            storage,
            activity,
        }
    }

    async fn find_folder(&self, id: Uuid) -> AppResult<Folder> {
        self.repo.find_folder(id).await?.ok_or_not_found()
    }

    async fn find_file(&self, id: Uuid) -> AppResult<GalleryFile> {
        self.repo.find_file(id).await?.ok_or_not_found()
    }

    async fn read(&self, path: &str, mime_type: String) -> AppResult<StoredFile> {
        let bytes = self.storage.get(path).await?.ok_or_not_found()?;
        Ok(StoredFile { bytes, mime_type })
    }

    async fn ensure_path_free(&self, path: &str, except: Option<Uuid>) -> AppResult<()> {
        if self.repo.folder_path_taken(path, except).await? {
            return Err(AppError::field(
                "name",
                "A folder with this name already exists here.",
            ));
        }
        Ok(())
    }

    async fn log(&self, subject: &str, action: &str, id: Uuid, actor: Uuid, description: String) {
        self.activity
            .record(
                NewActivity::new(subject, action)
                    .by(Some(actor))
                    .on(id)
                    .describe(description),
            )
            .await;
    }
}

/// Ancestors of `folder` from the root down, `folder` included.
fn breadcrumbs(all: &[Folder], folder: &Folder) -> Vec<Folder> {
    let mut chain = vec![folder.clone()];
    let mut parent = folder.parent_id;
    while let Some(id) = parent {
        match all.iter().find(|f| f.id == id) {
            // Guard against a corrupted cycle
            Some(f) if !chain.iter().any(|c| c.id == f.id) => {
                chain.push(f.clone());
                parent = f.parent_id;
            }
            _ => break,
        }
    }
    chain.reverse();
    chain
}

#[async_trait]
impl GalleryService for GalleryManager {
    async fn listing(&self, folder_id: Option<Uuid>) -> AppResult<GalleryListing> {
        let current = match folder_id {
            Some(id) => Some(self.find_folder(id).await?),
            None => None,
        };
        let all = self.repo.list_folders().await?;

        let folders = all
            .iter()
            .filter(|f| f.parent_id == folder_id)
            .cloned()
            .collect();
        let breadcrumbs = current
            .as_ref()
            .map(|c| breadcrumbs(&all, c))
            .unwrap_or_default();

        Ok(GalleryListing {
            current,
            breadcrumbs,
            folders,
        })
    }

    async fn files_datatable(
        &self,
        req: &DataTableRequest,
        folder_id: Option<Uuid>,
    ) -> AppResult<DataTableResponse<GalleryFile>> {
        self.repo.files_datatable(req, folder_id).await
    }

    async fn create_folder(
        &self,
        parent_id: Option<Uuid>,
        name: String,
        actor: Uuid,
    ) -> AppResult<Folder> {
        let name = validate_folder_name(&name)?;
        let parent_path = match parent_id {
            Some(id) => Some(
                self.repo
                    .find_folder(id)
                    .await?
                    .ok_or_else(|| AppError::invalid_reference("parent_id"))?
                    .path,
            ),
            None => None,
        };

        let path = folder_path(parent_path.as_deref(), &name);
        self.ensure_path_free(&path, None).await?;

        let folder = self.repo.create_folder(parent_id, name, path).await?;
        self.log("folder", ACTION_CREATED, folder.id, actor, format!("Created folder {}", folder.path))
            .await;
        Ok(folder)
    }

    async fn rename_folder(&self, id: Uuid, name: String, actor: Uuid) -> AppResult<Folder> {
        let folder = self.find_folder(id).await?;
        let name = validate_folder_name(&name)?;

        let parent_path = match folder.parent_id {
            Some(parent) => Some(self.find_folder(parent).await?.path),
            None => None,
        };
        let path = folder_path(parent_path.as_deref(), &name);
        self.ensure_path_free(&path, Some(id)).await?;

        let renamed = self.repo.rename_folder(id, name, path).await?;
        self.activity
            .record(
                NewActivity::new("folder", ACTION_UPDATED)
                    .by(Some(actor))
                    .on(id)
                    .describe(format!("Renamed folder {} to {}", folder.path, renamed.path))
                    .with_properties(json!({ "from": folder.path, "to": renamed.path })),
            )
            .await;
        Ok(renamed)
    }

    async fn delete_folder(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        let folder = self.find_folder(id).await?;
        if self.repo.folder_has_children(id).await? {
            return Err(AppError::field("id", "The folder is not empty."));
        }
        self.repo.delete_folder(id).await?;
        self.log("folder", ACTION_DELETED, id, actor, format!("Deleted folder {}", folder.path))
            .await;
        Ok(())
    }

    async fn upload(&self, input: UploadInput, actor: Uuid) -> AppResult<GalleryFile> {
        // Reject before anything reaches storage
        let ext = check_upload(
            "file",
            &input.file_name,
            input.bytes.len(),
            ALLOWED_UPLOAD_EXTENSIONS,
        )?;
        if let Some(folder_id) = input.folder_id {
            if self.repo.find_folder(folder_id).await?.is_none() {
                return Err(AppError::invalid_reference("folder_id"));
            }
        }

        let path = format!("{}/{}.{}", GALLERY_DIRECTORY, Uuid::new_v4(), ext);
        let size = input.bytes.len() as i64;
        self.storage.put(&path, input.bytes).await?;

        let created = self
            .repo
            .create_file(NewGalleryFile {
                folder_id: input.folder_id,
                original_name: input.file_name,
                path: path.clone(),
                mime_type: mime_for(&ext).to_string(),
                size,
                visibility: input.visibility,
                uploaded_by: Some(actor),
            })
            .await;

        let file = match created {
            Ok(file) => file,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&path).await {
                    tracing::warn!(error = %cleanup, path = %path, "Failed to remove orphaned upload");
                }
                return Err(e);
            }
        };

        tracing::info!(file_id = %file.id, size = file.size, "File uploaded");
        self.activity
            .record(
                NewActivity::new("gallery_file", ACTION_UPLOADED)
                    .by(Some(actor))
                    .on(file.id)
                    .describe(format!("Uploaded {}", file.original_name))
                    .with_properties(json!({ "size": file.size, "mime_type": file.mime_type })),
            )
            .await;
        Ok(file)
    }

    async fn set_visibility(
        &self,
        id: Uuid,
        visibility: Visibility,
        actor: Uuid,
    ) -> AppResult<GalleryFile> {
        self.find_file(id).await?;
        let file = self.repo.set_visibility(id, visibility).await?;
        self.log(
            "gallery_file",
            ACTION_UPDATED,
            id,
            actor,
            format!("Made {} {}", file.original_name, visibility),
        )
        .await;
        Ok(file)
    }

    async fn delete_file(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        let file = self.find_file(id).await?;
        self.repo.delete_file(id).await?;

        if let Err(e) = self.storage.delete(&file.path).await {
            tracing::warn!(error = %e, path = %file.path, "Failed to remove stored file");
        }

        self.log(
            "gallery_file",
            ACTION_DELETED,
            id,
            actor,
            format!("Deleted {}", file.original_name),
        )
        .await;
        Ok(())
    }

    async fn open_public(&self, path: &str) -> AppResult<StoredFile> {
        if path.starts_with(&format!("{}/", AVATAR_DIRECTORY)) {
            let mime = extension_of(path).map(|ext| mime_for(&ext)).unwrap_or("application/octet-stream");
            return self.read(path, mime.to_string()).await;
        }

        // Private files look the same as missing ones
        let file = self
            .repo
            .find_file_by_path(path)
            .await?
            .filter(|f| f.visibility == Visibility::Public)
            .ok_or_not_found()?;
        self.read(&file.path, file.mime_type).await
    }

    async fn open_any(&self, path: &str) -> AppResult<StoredFile> {
        let mime = match self.repo.find_file_by_path(path).await? {
            Some(file) => file.mime_type,
            None => extension_of(path)
                .map(|ext| mime_for(&ext))
                .unwrap_or("application/octet-stream")
                .to_string(),
        };
        self.read(path, mime).await
    }

    async fn count_files(&self) -> AppResult<u64> {
        self.repo.count_files().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::MockGalleryRepository;
    use crate::infra::MockFileStorage;
    use crate::services::MockActivityService;
    use chrono::Utc;

    fn folder(id: Uuid, parent_id: Option<Uuid>, path: &str) -> Folder {
        Folder {
            id,
            parent_id,
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            path: path.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn stored_file(file: &NewGalleryFile) -> GalleryFile {
        GalleryFile {
            id: Uuid::new_v4(),
            folder_id: file.folder_id,
            original_name: file.original_name.clone(),
            path: file.path.clone(),
            mime_type: file.mime_type.clone(),
            size: file.size,
            visibility: file.visibility,
            uploaded_by: file.uploaded_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn quiet_activity() -> Arc<MockActivityService> {
        let mut activity = MockActivityService::new();
        activity.expect_record().returning(|_| ());
        Arc::new(activity)
    }

    fn upload(name: &str, bytes: Vec<u8>) -> UploadInput {
        UploadInput {
            folder_id: None,
            file_name: name.into(),
            bytes,
            visibility: Visibility::Private,
        }
    }

    #[tokio::test]
    async fn test_disallowed_extension_never_reaches_storage() {
        let mut storage = MockFileStorage::new();
        storage.expect_put().never();

        let manager = GalleryManager::new(
            Arc::new(MockGalleryRepository::new()),
            Arc::new(storage),
            quiet_activity(),
        );

        let err = manager
            .upload(upload("payload.exe", vec![1, 2, 3]), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref f) if f.contains("file")));
    }

    #[tokio::test]
    async fn test_upload_stores_under_gallery_with_mime() {
        let mut storage = MockFileStorage::new();
        storage
            .expect_put()
            .withf(|path, bytes| path.starts_with("gallery/") && path.ends_with(".png") && bytes.len() == 4)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut repo = MockGalleryRepository::new();
        repo.expect_create_file()
            .withf(|f| f.mime_type == "image/png" && f.original_name == "Logo.PNG")
            .returning(|f| Ok(stored_file(&f)));

        let manager = GalleryManager::new(Arc::new(repo), Arc::new(storage), quiet_activity());
        let file = manager
            .upload(upload("Logo.PNG", vec![0, 1, 2, 3]), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(file.size, 4);
    }

    #[tokio::test]
    async fn test_failed_metadata_write_removes_stored_bytes() {
        let mut storage = MockFileStorage::new();
        storage.expect_put().returning(|_, _| Ok(()));
        storage.expect_delete().times(1).returning(|_| Ok(()));

        let mut repo = MockGalleryRepository::new();
        repo.expect_create_file()
            .returning(|_| Err(AppError::internal("insert failed")));

        let manager = GalleryManager::new(Arc::new(repo), Arc::new(storage), quiet_activity());
        assert!(manager
            .upload(upload("notes.txt", b"hi".to_vec()), Uuid::new_v4())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_nested_folder_path_and_duplicate_name() {
        let parent = Uuid::new_v4();
        let mut repo = MockGalleryRepository::new();
        repo.expect_find_folder()
            .returning(move |id| Ok(Some(folder(id, None, "/reports"))));
        repo.expect_folder_path_taken()
            .withf(|path, _| path == "/reports/2024")
            .returning(|_, _| Ok(true));
        repo.expect_create_folder().never();

        let manager = GalleryManager::new(
            Arc::new(repo),
            Arc::new(MockFileStorage::new()),
            quiet_activity(),
        );

        let err = manager
            .create_folder(Some(parent), " 2024 ".into(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref f) if f.contains("name")));
    }

    #[tokio::test]
    async fn test_non_empty_folder_is_kept() {
        let mut repo = MockGalleryRepository::new();
        repo.expect_find_folder()
            .returning(|id| Ok(Some(folder(id, None, "/docs"))));
        repo.expect_folder_has_children().returning(|_| Ok(true));
        repo.expect_delete_folder().never();

        let manager = GalleryManager::new(
            Arc::new(repo),
            Arc::new(MockFileStorage::new()),
            quiet_activity(),
        );
        assert!(manager
            .delete_folder(Uuid::new_v4(), Uuid::new_v4())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_private_file_is_hidden_from_public_route() {
        let mut repo = MockGalleryRepository::new();
        repo.expect_find_file_by_path().returning(|path| {
            let mut file = stored_file(&NewGalleryFile {
                folder_id: None,
                original_name: "secret.pdf".into(),
                path: path.to_string(),
                mime_type: "application/pdf".into(),
                size: 10,
                visibility: Visibility::Private,
                uploaded_by: None,
            });
            file.visibility = Visibility::Private;
            Ok(Some(file))
        });
        let mut storage = MockFileStorage::new();
        storage.expect_get().never();

        let manager = GalleryManager::new(Arc::new(repo), Arc::new(storage), quiet_activity());
        let err = manager.open_public("gallery/x.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[test]
    fn test_breadcrumbs_walk_to_root() {
        let root = folder(Uuid::new_v4(), None, "/a");
        let mid = folder(Uuid::new_v4(), Some(root.id), "/a/b");
        let leaf = folder(Uuid::new_v4(), Some(mid.id), "/a/b/c");
        let all = vec![root.clone(), mid.clone(), leaf.clone()];

        let chain = breadcrumbs(&all, &leaf);
        assert_eq!(
            chain.iter().map(|f| f.path.as_str()).collect::<Vec<_>>(),
            vec!["/a", "/a/b", "/a/b/c"]
        );
    }
}
