use sea_orm::entity::prelude::*;

use domain::Folder;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "filemanager_folders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    #[sea_orm(unique)]
    pub path: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Folder {
    fn from(model: Model) -> Self {
        Folder {
            id: model.id,
            parent_id: model.parent_id,
            name: model.name,
            path: model.path,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
