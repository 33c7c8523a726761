use sea_orm::entity::prelude::*;

use domain::{GalleryFile, Visibility};

use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "gallery_files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub folder_id: Option<Uuid>,
    pub original_name: String,
    /// Location relative to the storage root
    #[sea_orm(unique)]
    pub path: String,
    pub mime_type: String,
    pub size: i64,
    pub visibility: String,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for GalleryFile {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let visibility: Visibility = model
            .visibility
            .parse()
            .map_err(|_| AppError::internal(format!("file {}: bad visibility", model.id)))?;

        Ok(GalleryFile {
            id: model.id,
            folder_id: model.folder_id,
            original_name: model.original_name,
            path: model.path,
            mime_type: model.mime_type,
            size: model.size,
            visibility,
            uploaded_by: model.uploaded_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
