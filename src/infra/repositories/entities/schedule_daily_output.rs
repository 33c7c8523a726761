//! One row per production day of a schedule.

use sea_orm::entity::prelude::*;

use domain::ScheduleDay;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "schedule_daily_outputs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub production_date: Date,
    /// NULL until an output is recorded
    pub actual_output: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ScheduleDay {
    fn from(model: Model) -> Self {
        ScheduleDay {
            id: model.id,
            schedule_id: model.schedule_id,
            production_date: model.production_date,
            actual_output: model.actual_output,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
