use sea_orm::entity::prelude::*;

use domain::{Schedule, ScheduleStatus};

use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "schedules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub line_id: Uuid,
    pub start_date: Date,
    pub finish_date: Date,
    pub target_quantity: i32,
    pub status: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Schedule {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let status: ScheduleStatus = model
            .status
            .parse()
            .map_err(|e| AppError::internal(format!("schedule {}: {}", model.id, e)))?;

        Ok(Schedule {
            id: model.id,
            order_id: model.order_id,
            line_id: model.line_id,
            start_date: model.start_date,
            finish_date: model.finish_date,
            target_quantity: model.target_quantity,
            status,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
