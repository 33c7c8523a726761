//! Append-only activity entries.

use sea_orm::entity::prelude::*;

use domain::ActivityLog;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "activity_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub causer_id: Option<Uuid>,
    pub subject_type: String,
    pub subject_id: Option<Uuid>,
    pub action: String,
    pub description: String,
    pub properties: Json,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ActivityLog {
    fn from(model: Model) -> Self {
        ActivityLog {
            id: model.id,
            causer_id: model.causer_id,
            subject_type: model.subject_type,
            subject_id: model.subject_id,
            action: model.action,
            description: model.description,
            properties: model.properties,
            created_at: model.created_at,
        }
    }
}
