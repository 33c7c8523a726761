//! Schedules and their per-day output records.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use super::base::{fetch_datatable, TableColumns};
use super::entities::{
    schedule::{self, ActiveModel, Entity as ScheduleEntity},
    schedule_daily_output::{self as day, Entity as DayEntity},
};
use crate::errors::{AppError, AppResult};
use crate::types::{DataTableRequest, DataTableResponse};
use domain::production::DayAlignment;
use domain::{Schedule, ScheduleDay, ScheduleStatus};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Day rows per statement; a year-long span fits in one, and every
/// statement stays far below Postgres' 65535 bind parameters.
const DAY_BATCH: usize = 1000;

/// Writable fields of a schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleInput {
    pub order_id: Uuid,
    pub line_id: Uuid,
    pub start_date: NaiveDate,
    pub finish_date: NaiveDate,
    pub target_quantity: i32,
    pub status: ScheduleStatus,
    pub notes: Option<String>,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Schedule>>;

    /// Day records of a schedule in date order
    async fn days(&self, schedule_id: Uuid) -> AppResult<Vec<ScheduleDay>>;

    /// Insert a schedule and one empty day record per date
    async fn create(&self, input: ScheduleInput, days: Vec<NaiveDate>) -> AppResult<Schedule>;

    /// Update a schedule and apply the day alignment in one transaction
    async fn update(
        &self,
        id: Uuid,
        input: ScheduleInput,
        alignment: DayAlignment,
    ) -> AppResult<Schedule>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Store outputs for the given day ids, all or nothing
    async fn record_outputs(
        &self,
        schedule_id: Uuid,
        outputs: Vec<(Uuid, i32)>,
    ) -> AppResult<Vec<ScheduleDay>>;

    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<Schedule>>;

    async fn count_by_status(&self, status: ScheduleStatus) -> AppResult<u64>;

    /// Whether any schedule runs on this line
    async fn references_line(&self, line_id: Uuid) -> AppResult<bool>;

    /// Whether any schedule produces this order
    async fn references_order(&self, order_id: Uuid) -> AppResult<bool>;
}

pub struct ScheduleStore {
    db: DatabaseConnection,
}

impl ScheduleStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn insert_days<C: ConnectionTrait>(
        db: &C,
        schedule_id: Uuid,
        dates: Vec<NaiveDate>,
    ) -> AppResult<()> {
        let now = Utc::now();
        for batch in dates.chunks(DAY_BATCH) {
            let rows = batch.iter().map(|&date| day::ActiveModel {
                id: Set(Uuid::new_v4()),
                schedule_id: Set(schedule_id),
                production_date: Set(date),
                actual_output: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            });
            DayEntity::insert_many(rows).exec(db).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ScheduleRepository for ScheduleStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Schedule>> {
        ScheduleEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Schedule::try_from)
            .transpose()
    }

    async fn days(&self, schedule_id: Uuid) -> AppResult<Vec<ScheduleDay>> {
        Ok(DayEntity::find()
            .filter(day::Column::ScheduleId.eq(schedule_id))
            .order_by_asc(day::Column::ProductionDate)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ScheduleDay::from)
            .collect())
    }

    async fn create(&self, input: ScheduleInput, days: Vec<NaiveDate>) -> AppResult<Schedule> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        let model = ActiveModel {
            id: Set(id),
            order_id: Set(input.order_id),
            line_id: Set(input.line_id),
            start_date: Set(input.start_date),
            finish_date: Set(input.finish_date),
            target_quantity: Set(input.target_quantity),
            status: Set(input.status.as_str().to_string()),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        Self::insert_days(&txn, id, days).await?;

        txn.commit().await?;
        Schedule::try_from(model)
    }

    async fn update(
        &self,
        id: Uuid,
        input: ScheduleInput,
        alignment: DayAlignment,
    ) -> AppResult<Schedule> {
        let model = ScheduleEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        let txn = self.db.begin().await?;

        let mut active: ActiveModel = model.into();
        active.order_id = Set(input.order_id);
        active.line_id = Set(input.line_id);
        active.start_date = Set(input.start_date);
        active.finish_date = Set(input.finish_date);
        active.target_quantity = Set(input.target_quantity);
        active.status = Set(input.status.as_str().to_string());
        active.notes = Set(input.notes);
        active.updated_at = Set(Utc::now());
        let model = active.update(&txn).await?;

        for ids in alignment.remove.chunks(DAY_BATCH) {
            DayEntity::delete_many()
                .filter(day::Column::ScheduleId.eq(id))
                .filter(day::Column::Id.is_in(ids.iter().copied()))
                .exec(&txn)
                .await?;
        }
        Self::insert_days(&txn, id, alignment.add).await?;

        txn.commit().await?;
        Schedule::try_from(model)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = ScheduleEntity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn record_outputs(
        &self,
        schedule_id: Uuid,
        outputs: Vec<(Uuid, i32)>,
    ) -> AppResult<Vec<ScheduleDay>> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        for (day_id, actual_output) in outputs {
            let model = DayEntity::find_by_id(day_id)
                .filter(day::Column::ScheduleId.eq(schedule_id))
                .one(&txn)
                .await?
                .ok_or(AppError::NotFound)?;

            let mut active: day::ActiveModel = model.into();
            active.actual_output = Set(Some(actual_output));
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        txn.commit().await?;
        self.days(schedule_id).await
    }

    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<Schedule>> {
        let columns = TableColumns::<ScheduleEntity> {
            searchable: &[schedule::Column::Status, schedule::Column::Notes],
            sortable: &[
                ("start_date", schedule::Column::StartDate),
                ("finish_date", schedule::Column::FinishDate),
                ("target_quantity", schedule::Column::TargetQuantity),
                ("status", schedule::Column::Status),
                ("created_at", schedule::Column::CreatedAt),
            ],
            default_sort: (schedule::Column::StartDate, Order::Desc),
        };
        let page = fetch_datatable(&self.db, ScheduleEntity::find(), req, &columns).await?;
        let schedules = page
            .data
            .into_iter()
            .map(Schedule::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(DataTableResponse::new(
            page.draw,
            page.records_total,
            page.records_filtered,
            schedules,
        ))
    }

    async fn count_by_status(&self, status: ScheduleStatus) -> AppResult<u64> {
        Ok(ScheduleEntity::find()
            .filter(schedule::Column::Status.eq(status.as_str()))
            .count(&self.db)
            .await?)
    }

    async fn references_line(&self, line_id: Uuid) -> AppResult<bool> {
        Ok(ScheduleEntity::find()
            .filter(schedule::Column::LineId.eq(line_id))
            .count(&self.db)
            .await?
            > 0)
    }

    async fn references_order(&self, order_id: Uuid) -> AppResult<bool> {
        Ok(ScheduleEntity::find()
            .filter(schedule::Column::OrderId.eq(order_id))
            .count(&self.db)
            .await?
            > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::production::date_span;
    use sea_orm::Iterable;

    #[test]
    fn test_day_batches_stay_under_bind_limit() {
        let columns = day::Column::iter().count();
        assert!(DAY_BATCH * columns < u16::MAX as usize);

        // Thirty years of days, well past what one statement can bind
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let finish = NaiveDate::from_ymd_opt(2029, 12, 31).unwrap();
        let days = date_span(start, finish);
        assert!(days.len() * columns > u16::MAX as usize);

        let batches: Vec<_> = days.chunks(DAY_BATCH).collect();
        assert_eq!(batches.len(), days.len().div_ceil(DAY_BATCH));
        assert!(batches.iter().all(|batch| batch.len() * columns < u16::MAX as usize));
    }
}
