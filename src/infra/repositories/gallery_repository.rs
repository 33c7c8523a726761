//! Gallery folders and file records.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use super::base::{fetch_datatable, TableColumns};
use super::entities::{
    filemanager_folder::{self as folder, Entity as FolderEntity},
    gallery_file::{self as file, Entity as FileEntity},
};
use crate::errors::{AppError, AppResult};
use crate::types::{DataTableRequest, DataTableResponse};
use domain::gallery::rebase_path;
use domain::{Folder, GalleryFile, Visibility};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// File record about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGalleryFile {
    pub folder_id: Option<Uuid>,
    pub original_name: String,
    pub path: String,
    pub mime_type: String,
    pub size: i64,
    pub visibility: Visibility,
    pub uploaded_by: Option<Uuid>,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait GalleryRepository: Send + Sync {
    // Folders

    async fn find_folder(&self, id: Uuid) -> AppResult<Option<Folder>>;

    /// Every folder ordered by path
    async fn list_folders(&self) -> AppResult<Vec<Folder>>;

    /// Whether a folder other than `except` already lives at `path`
    async fn folder_path_taken(&self, path: &str, except: Option<Uuid>) -> AppResult<bool>;

    async fn create_folder(
        &self,
        parent_id: Option<Uuid>,
        name: String,
        path: String,
    ) -> AppResult<Folder>;

    /// Rename a folder and rewrite the paths of all its descendants
    async fn rename_folder(&self, id: Uuid, name: String, path: String) -> AppResult<Folder>;

    /// Whether the folder holds sub-folders or files
    async fn folder_has_children(&self, id: Uuid) -> AppResult<bool>;

    async fn delete_folder(&self, id: Uuid) -> AppResult<()>;

    // Files

    async fn find_file(&self, id: Uuid) -> AppResult<Option<GalleryFile>>;

    async fn find_file_by_path(&self, path: &str) -> AppResult<Option<GalleryFile>>;

    async fn create_file(&self, file: NewGalleryFile) -> AppResult<GalleryFile>;

    async fn set_visibility(&self, id: Uuid, visibility: Visibility) -> AppResult<GalleryFile>;

    async fn delete_file(&self, id: Uuid) -> AppResult<()>;

    /// Data-table draw over the files of one folder (`None` = root)
    async fn files_datatable(
        &self,
        req: &DataTableRequest,
        folder_id: Option<Uuid>,
    ) -> AppResult<DataTableResponse<GalleryFile>>;

    async fn count_files(&self) -> AppResult<u64>;
}

pub struct GalleryStore {
    db: DatabaseConnection,
}

impl GalleryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn folder_scope(folder_id: Option<Uuid>) -> Condition {
    match folder_id {
        Some(id) => Condition::all().add(file::Column::FolderId.eq(id)),
        None => Condition::all().add(file::Column::FolderId.is_null()),
    }
}

#[async_trait]
impl GalleryRepository for GalleryStore {
    async fn find_folder(&self, id: Uuid) -> AppResult<Option<Folder>> {
        Ok(FolderEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Folder::from))
    }

    async fn list_folders(&self) -> AppResult<Vec<Folder>> {
        Ok(FolderEntity::find()
            .order_by_asc(folder::Column::Path)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Folder::from)
            .collect())
    }

    async fn folder_path_taken(&self, path: &str, except: Option<Uuid>) -> AppResult<bool> {
        let mut query = FolderEntity::find().filter(folder::Column::Path.eq(path));
        if let Some(id) = except {
            query = query.filter(folder::Column::Id.ne(id));
        }
        Ok(query.count(&self.db).await? > 0)
    }

    async fn create_folder(
        &self,
        parent_id: Option<Uuid>,
        name: String,
        path: String,
    ) -> AppResult<Folder> {
        let now = Utc::now();
        let model = folder::ActiveModel {
            id: Set(Uuid::new_v4()),
            parent_id: Set(parent_id),
            name: Set(name),
            path: Set(path),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(Folder::from(model))
    }

    async fn rename_folder(&self, id: Uuid, name: String, path: String) -> AppResult<Folder> {
        let model = FolderEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        let old_path = model.path.clone();
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let descendants = FolderEntity::find()
            .filter(folder::Column::Path.starts_with(format!("{}/", old_path)))
            .all(&txn)
            .await?;
        for descendant in descendants {
            let Some(rebased) = rebase_path(&descendant.path, &old_path, &path) else {
                continue;
            };
            let mut active: folder::ActiveModel = descendant.into();
            active.path = Set(rebased);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        let mut active: folder::ActiveModel = model.into();
        active.name = Set(name);
        active.path = Set(path);
        active.updated_at = Set(now);
        let model = active.update(&txn).await?;

        txn.commit().await?;
        Ok(Folder::from(model))
    }

    async fn folder_has_children(&self, id: Uuid) -> AppResult<bool> {
        let folders = FolderEntity::find()
            .filter(folder::Column::ParentId.eq(id))
            .count(&self.db)
            .await?;
        if folders > 0 {
            return Ok(true);
        }
        let files = FileEntity::find()
            .filter(file::Column::FolderId.eq(id))
            .count(&self.db)
            .await?;
        Ok(files > 0)
    }

    async fn delete_folder(&self, id: Uuid) -> AppResult<()> {
        let result = FolderEntity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn find_file(&self, id: Uuid) -> AppResult<Option<GalleryFile>> {
        FileEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(GalleryFile::try_from)
            .transpose()
    }

    async fn find_file_by_path(&self, path: &str) -> AppResult<Option<GalleryFile>> {
        FileEntity::find()
            .filter(file::Column::Path.eq(path))
            .one(&self.db)
            .await?
            .map(GalleryFile::try_from)
            .transpose()
    }

    async fn create_file(&self, new_file: NewGalleryFile) -> AppResult<GalleryFile> {
        let now = Utc::now();
        let model = file::ActiveModel {
            id: Set(Uuid::new_v4()),
            folder_id: Set(new_file.folder_id),
            original_name: Set(new_file.original_name),
            path: Set(new_file.path),
            mime_type: Set(new_file.mime_type),
            size: Set(new_file.size),
            visibility: Set(new_file.visibility.as_str().to_string()),
            uploaded_by: Set(new_file.uploaded_by),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        GalleryFile::try_from(model)
    }

    async fn set_visibility(&self, id: Uuid, visibility: Visibility) -> AppResult<GalleryFile> {
        let model = FileEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: file::ActiveModel = model.into();
        active.visibility = Set(visibility.as_str().to_string());
        active.updated_at = Set(Utc::now());
        GalleryFile::try_from(active.update(&self.db).await?)
    }

    async fn delete_file(&self, id: Uuid) -> AppResult<()> {
        let result = FileEntity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn files_datatable(
        &self,
        req: &DataTableRequest,
        folder_id: Option<Uuid>,
    ) -> AppResult<DataTableResponse<GalleryFile>> {
        let columns = TableColumns::<FileEntity> {
            searchable: &[file::Column::OriginalName, file::Column::MimeType],
            sortable: &[
                ("original_name", file::Column::OriginalName),
                ("size", file::Column::Size),
                ("mime_type", file::Column::MimeType),
                ("visibility", file::Column::Visibility),
                ("created_at", file::Column::CreatedAt),
            ],
            default_sort: (file::Column::CreatedAt, Order::Desc),
        };
        let base = FileEntity::find().filter(folder_scope(folder_id));
        let page = fetch_datatable(&self.db, base, req, &columns).await?;
        let files = page
            .data
            .into_iter()
            .map(GalleryFile::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(DataTableResponse::new(
            page.draw,
            page.records_total,
            page.records_filtered,
            files,
        ))
    }

    async fn count_files(&self) -> AppResult<u64> {
        Ok(FileEntity::find().count(&self.db).await?)
    }
}
