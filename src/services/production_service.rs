//! Production scheduling: lines, orders, schedules and daily outputs.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::ActivityService;
use crate::errors::{AppError, AppResult, CollectFieldErrors, OptionExt};
use crate::infra::repositories::{
    LineInput, LineRepository, OrderInput, OrderRepository, ScheduleInput, ScheduleRepository,
};
use crate::types::{DataTableRequest, DataTableResponse};
use domain::production::{align_days, check_outputs, date_span, ensure_date_order, OutputEntry};
use domain::{
    FieldErrors, MasterLine, MasterOrder, NewActivity, OrderStatus, Schedule, ScheduleDay,
    ScheduleStatus, ACTION_CREATED, ACTION_DELETED, ACTION_RECORDED, ACTION_UPDATED,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// A schedule with its order, line and day records
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduleDetail {
    pub schedule: Schedule,
    pub order: Option<MasterOrder>,
    pub line: Option<MasterLine>,
    pub days: Vec<ScheduleDay>,
}

/// Select options shared by the schedule forms
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduleFormOptions {
    pub orders: Vec<MasterOrder>,
    pub lines: Vec<MasterLine>,
    pub statuses: Vec<ScheduleStatus>,
}

/// Counters shown on the dashboard
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ProductionCounts {
    pub lines: u64,
    pub orders_by_status: Vec<StatusCount>,
    pub schedules_by_status: Vec<StatusCount>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProductionService: Send + Sync {
    // Lines
    async fn get_line(&self, id: Uuid) -> AppResult<MasterLine>;
    async fn lines_datatable(
        &self,
        req: &DataTableRequest,
    ) -> AppResult<DataTableResponse<MasterLine>>;
    async fn create_line(&self, input: LineInput, actor: Uuid) -> AppResult<MasterLine>;
    async fn update_line(&self, id: Uuid, input: LineInput, actor: Uuid) -> AppResult<MasterLine>;
    async fn delete_line(&self, id: Uuid, actor: Uuid) -> AppResult<()>;

    // Orders
    async fn get_order(&self, id: Uuid) -> AppResult<MasterOrder>;
    async fn orders_datatable(&self, req: &DataTableRequest)
        -> AppResult<DataTableResponse<MasterOrder>>;
    async fn create_order(&self, input: OrderInput, actor: Uuid) -> AppResult<MasterOrder>;
    async fn update_order(
        &self,
        id: Uuid,
        input: OrderInput,
        actor: Uuid,
    ) -> AppResult<MasterOrder>;
    async fn delete_order(&self, id: Uuid, actor: Uuid) -> AppResult<()>;

    // Schedules
    async fn schedule_detail(&self, id: Uuid) -> AppResult<ScheduleDetail>;
    async fn schedule_form_options(&self) -> AppResult<ScheduleFormOptions>;
    async fn schedules_datatable(&self, req: &DataTableRequest)
        -> AppResult<DataTableResponse<Schedule>>;
    async fn create_schedule(&self, input: ScheduleInput, actor: Uuid) -> AppResult<Schedule>;
    async fn update_schedule(&self, id: Uuid, input: ScheduleInput, actor: Uuid)
        -> AppResult<Schedule>;
    async fn delete_schedule(&self, id: Uuid, actor: Uuid) -> AppResult<()>;

    /// Store actual outputs for days of one schedule, all or nothing
    async fn record_outputs(
        &self,
        schedule_id: Uuid,
        entries: Vec<OutputEntry>,
        actor: Uuid,
    ) -> AppResult<Vec<ScheduleDay>>;

    async fn counts(&self) -> AppResult<ProductionCounts>;
}

pub struct ProductionManager {
    lines: Arc<dyn LineRepository>,
    orders: Arc<dyn OrderRepository>,
    schedules: Arc<dyn ScheduleRepository>,
    activity: Arc<dyn ActivityService>,
}

impl ProductionManager {
    pub fn new(
        lines: Arc<dyn LineRepository>,
        orders: Arc<dyn OrderRepository>,
        schedules: Arc<dyn ScheduleRepository>,
        activity: Arc<dyn ActivityService>,
    ) -> Self {
        Self {
            lines,
            orders,
            schedules,
            activity,
        }
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

    /// References and date ordering shared by create and update.
    async fn check_schedule(&self, input: &ScheduleInput) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        let (order, line) = tokio::try_join!(
            self.orders.find_by_id(input.order_id),
            self.lines.find_by_id(input.line_id),
        )?;
        if order.is_none() {
            errors.add_invalid_reference("order_id");
        }
        if line.is_none() {
            errors.add_invalid_reference("line_id");
        }
        ensure_date_order("start_date", input.start_date, "finish_date", input.finish_date)
            .collect_into(&mut errors)?;
        AppError::check_fields(errors)
    }

    async fn check_order(&self, input: &OrderInput, except: Option<Uuid>) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        ensure_date_order("order_date", input.order_date, "due_date", input.due_date)
            .collect_into(&mut errors)?;
        if self
            .orders
            .order_number_taken(&input.order_number, except)
            .await?
        {
            errors.add_taken("order_number");
        }
        AppError::check_fields(errors)
    }

    async fn find_schedule(&self, id: Uuid) -> AppResult<Schedule> {
        self.schedules.find_by_id(id).await?.ok_or_not_found()
    }
}

#[async_trait]
impl ProductionService for ProductionManager {
    async fn get_line(&self, id: Uuid) -> AppResult<MasterLine> {
        self.lines.find_by_id(id).await?.ok_or_not_found()
    }

    async fn lines_datatable(
        &self,
        req: &DataTableRequest,
    ) -> AppResult<DataTableResponse<MasterLine>> {
        self.lines.datatable(req).await
    }

    async fn create_line(&self, input: LineInput, actor: Uuid) -> AppResult<MasterLine> {
        if self.lines.code_taken(&input.code, None).await? {
            return Err(AppError::taken("code"));
        }
        let line = self.lines.create(input).await?;
        let description = format!("Created line {}", line.code);
        self.log("master_line", ACTION_CREATED, line.id, actor, description).await;
        Ok(line)
    }

    async fn update_line(&self, id: Uuid, input: LineInput, actor: Uuid) -> AppResult<MasterLine> {
        self.get_line(id).await?;
        if self.lines.code_taken(&input.code, Some(id)).await? {
            return Err(AppError::taken("code"));
        }
        let line = self.lines.update(id, input).await?;
        let description = format!("Updated line {}", line.code);
        self.log("master_line", ACTION_UPDATED, line.id, actor, description).await;
        Ok(line)
    }

    async fn delete_line(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        let line = self.get_line(id).await?;
        if self.schedules.references_line(id).await? {
            return Err(AppError::field("id", "The line is used by existing schedules."));
        }
        self.lines.delete(id).await?;
        self.log("master_line", ACTION_DELETED, id, actor, format!("Deleted line {}", line.code))
            .await;
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> AppResult<MasterOrder> {
        self.orders.find_by_id(id).await?.ok_or_not_found()
    }

    async fn orders_datatable(
        &self,
        req: &DataTableRequest,
    ) -> AppResult<DataTableResponse<MasterOrder>> {
        self.orders.datatable(req).await
    }

    async fn create_order(&self, input: OrderInput, actor: Uuid) -> AppResult<MasterOrder> {
        self.check_order(&input, None).await?;
        let order = self.orders.create(input).await?;
        self.log(
            "master_order",
            ACTION_CREATED,
            order.id,
            actor,
            format!("Created order {}", order.order_number),
        )
        .await;
        Ok(order)
    }

    async fn update_order(
        &self,
        id: Uuid,
        input: OrderInput,
        actor: Uuid,
    ) -> AppResult<MasterOrder> {
        self.get_order(id).await?;
        self.check_order(&input, Some(id)).await?;
        let order = self.orders.update(id, input).await?;
        self.log(
            "master_order",
            ACTION_UPDATED,
            order.id,
            actor,
            format!("Updated order {}", order.order_number),
        )
        .await;
        Ok(order)
    }

    async fn delete_order(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        let order = self.get_order(id).await?;
        if self.schedules.references_order(id).await? {
            return Err(AppError::field("id", "The order is used by existing schedules."));
        }
        self.orders.delete(id).await?;
        self.log(
            "master_order",
            ACTION_DELETED,
            id,
            actor,
            format!("Deleted order {}", order.order_number),
        )
        .await;
        Ok(())
    }

    async fn schedule_detail(&self, id: Uuid) -> AppResult<ScheduleDetail> {
        let schedule = self.find_schedule(id).await?;
        let (order, line, days) = tokio::try_join!(
            self.orders.find_by_id(schedule.order_id),
            self.lines.find_by_id(schedule.line_id),
            self.schedules.days(id),
        )?;

        Ok(ScheduleDetail {
            schedule,
            order,
            line,
            days,
        })
    }

    async fn schedule_form_options(&self) -> AppResult<ScheduleFormOptions> {
        let (orders, lines) = tokio::try_join!(self.orders.list(), self.lines.list())?;
        Ok(ScheduleFormOptions {
            orders,
            lines,
            statuses: ScheduleStatus::ALL.to_vec(),
        })
    }

    async fn schedules_datatable(
        &self,
        req: &DataTableRequest,
    ) -> AppResult<DataTableResponse<Schedule>> {
        self.schedules.datatable(req).await
    }

    async fn create_schedule(&self, input: ScheduleInput, actor: Uuid) -> AppResult<Schedule> {
        self.check_schedule(&input).await?;

        let days = date_span(input.start_date, input.finish_date);
        let schedule = self.schedules.create(input, days).await?;

        tracing::info!(schedule_id = %schedule.id, "Schedule created");
        self.log(
            "schedule",
            ACTION_CREATED,
            schedule.id,
            actor,
            format!(
                "Scheduled {} to {}",
                schedule.start_date, schedule.finish_date
            ),
        )
        .await;
        Ok(schedule)
    }

    async fn update_schedule(
        &self,
        id: Uuid,
        input: ScheduleInput,
        actor: Uuid,
    ) -> AppResult<Schedule> {
        self.find_schedule(id).await?;
        self.check_schedule(&input).await?;

        let existing = self.schedules.days(id).await?;
        let alignment = align_days(&existing, input.start_date, input.finish_date);
        let schedule = self.schedules.update(id, input, alignment).await?;

        self.log(
            "schedule",
            ACTION_UPDATED,
            schedule.id,
            actor,
            format!(
                "Rescheduled {} to {}",
                schedule.start_date, schedule.finish_date
            ),
        )
        .await;
        Ok(schedule)
    }

    async fn delete_schedule(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        self.find_schedule(id).await?;
        self.schedules.delete(id).await?;
        self.log("schedule", ACTION_DELETED, id, actor, "Deleted schedule".to_string())
            .await;
        Ok(())
    }

    async fn record_outputs(
        &self,
        schedule_id: Uuid,
        entries: Vec<OutputEntry>,
        actor: Uuid,
    ) -> AppResult<Vec<ScheduleDay>> {
        self.find_schedule(schedule_id).await?;
        let days = self.schedules.days(schedule_id).await?;
        check_outputs(&days, &entries)?;

        let outputs = entries
            .iter()
            .map(|entry| {
                i32::try_from(entry.actual_output)
                    .map(|value| (entry.day_id, value))
                    .map_err(|_| AppError::internal("output exceeded column range after check"))
            })
            .collect::<AppResult<Vec<_>>>()?;

        let recorded = self.schedules.record_outputs(schedule_id, outputs).await?;

        self.activity
            .record(
                NewActivity::new("schedule", ACTION_RECORDED)
                    .by(Some(actor))
                    .on(schedule_id)
                    .describe(format!("Recorded output for {} day(s)", entries.len()))
                    .with_properties(json!({
                        "outputs": entries
                            .iter()
                            .map(|e| {
                                json!({ "day_id": e.day_id, "actual_output": e.actual_output })
                            })
                            .collect::<Vec<_>>(),
                    })),
            )
            .await;

        Ok(recorded)
    }

    async fn counts(&self) -> AppResult<ProductionCounts> {
        let mut counts = ProductionCounts {
            lines: self.lines.count().await?,
            ..Default::default()
        };

        for status in OrderStatus::ALL {
            counts.orders_by_status.push(StatusCount {
                status: status.as_str().to_string(),
                count: self.orders.count_by_status(status).await?,
            });
        }
        for status in ScheduleStatus::ALL {
            counts.schedules_by_status.push(StatusCount {
                status: status.as_str().to_string(),
                count: self.schedules.count_by_status(status).await?,
            });
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::{
        MockLineRepository, MockOrderRepository, MockScheduleRepository,
    };
    use crate::services::MockActivityService;
    use chrono::{NaiveDate, Utc};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn line(id: Uuid, code: &str) -> MasterLine {
        MasterLine {
            id,
            name: "Assembly".into(),
            code: code.into(),
            capacity: Some(100),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn order(id: Uuid) -> MasterOrder {
        MasterOrder {
            id,
            order_number: "PO-001".into(),
            product_name: "Widget".into(),
            product_code: None,
            quantity: 500,
            order_date: date("2024-01-01"),
            due_date: date("2024-02-01"),
            status: OrderStatus::Pending,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn schedule_from(id: Uuid, input: &ScheduleInput) -> Schedule {
        Schedule {
            id,
            order_id: input.order_id,
            line_id: input.line_id,
            start_date: input.start_date,
            finish_date: input.finish_date,
            target_quantity: input.target_quantity,
            status: input.status,
            notes: input.notes.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn day(schedule_id: Uuid, on: &str) -> ScheduleDay {
        ScheduleDay {
            id: Uuid::new_v4(),
            schedule_id,
            production_date: date(on),
            actual_output: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn schedule_input(start: &str, finish: &str) -> ScheduleInput {
        ScheduleInput {
            order_id: Uuid::new_v4(),
            line_id: Uuid::new_v4(),
            start_date: date(start),
            finish_date: date(finish),
            target_quantity: 100,
            status: ScheduleStatus::Pending,
            notes: None,
        }
    }

    fn line_input(code: &str) -> LineInput {
        LineInput {
            name: "Assembly".into(),
            code: code.into(),
            capacity: None,
            is_active: true,
        }
    }

    fn quiet_activity() -> Arc<MockActivityService> {
        let mut activity = MockActivityService::new();
        activity.expect_record().returning(|_| ());
        Arc::new(activity)
    }

    struct Mocks {
        lines: MockLineRepository,
        orders: MockOrderRepository,
        schedules: MockScheduleRepository,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                lines: MockLineRepository::new(),
                orders: MockOrderRepository::new(),
                schedules: MockScheduleRepository::new(),
            }
        }

        fn with_references(mut self) -> Self {
            self.orders
                .expect_find_by_id()
                .returning(|id| Ok(Some(order(id))));
            self.lines
                .expect_find_by_id()
                .returning(|id| Ok(Some(line(id, "L1"))));
            self
        }

        fn build(self) -> ProductionManager {
            ProductionManager::new(
                Arc::new(self.lines),
                Arc::new(self.orders),
                Arc::new(self.schedules),
                quiet_activity(),
            )
        }
    }

    #[tokio::test]
    async fn test_schedule_finish_before_start_fails_on_finish_date() {
        let mut mocks = Mocks::new().with_references();
        mocks.schedules.expect_create().never();

        let err = mocks
            .build()
            .create_schedule(schedule_input("2024-01-10", "2024-01-05"), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref f) if f.contains("finish_date")));
    }

    #[tokio::test]
    async fn test_schedule_same_day_creates_one_day_record() {
        let mut mocks = Mocks::new().with_references();
        mocks
            .schedules
            .expect_create()
            .withf(|_, days| days == &vec![NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()])
            .times(1)
            .returning(|input, _| Ok(schedule_from(Uuid::new_v4(), &input)));

        let schedule = mocks
            .build()
            .create_schedule(schedule_input("2024-01-10", "2024-01-10"), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(schedule.start_date, schedule.finish_date);
    }

    #[tokio::test]
    async fn test_schedule_with_unknown_order_cites_order_id() {
        let mut mocks = Mocks::new();
        mocks.orders.expect_find_by_id().returning(|_| Ok(None));
        mocks
            .lines
            .expect_find_by_id()
            .returning(|id| Ok(Some(line(id, "L1"))));
        mocks.schedules.expect_create().never();

        let err = mocks
            .build()
            .create_schedule(schedule_input("2024-01-01", "2024-01-02"), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref f) if f.contains("order_id")));
    }

    #[tokio::test]
    async fn test_schedule_reports_every_failing_field_at_once() {
        let mut mocks = Mocks::new();
        mocks.orders.expect_find_by_id().returning(|_| Ok(None));
        mocks.lines.expect_find_by_id().returning(|_| Ok(None));
        mocks.schedules.expect_create().never();

        let err = mocks
            .build()
            .create_schedule(schedule_input("2024-01-10", "2024-01-05"), Uuid::new_v4())
            .await
            .unwrap_err();

        match err {
            AppError::Validation(fields) => {
                assert!(fields.contains("order_id"));
                assert!(fields.contains("line_id"));
                let message = "The finish date must be a date after or equal to start date.";
                assert_eq!(fields.get("finish_date"), Some(&[message.to_string()][..]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_schedule_realigns_days() {
        let id = Uuid::new_v4();
        let mut mocks = Mocks::new().with_references();
        mocks
            .schedules
            .expect_find_by_id()
            .returning(move |_| {
                let input = schedule_input("2024-01-01", "2024-01-03");
                Ok(Some(schedule_from(id, &input)))
            });
        mocks.schedules.expect_days().returning(move |_| {
            Ok(vec![
                day(id, "2024-01-01"),
                day(id, "2024-01-02"),
                day(id, "2024-01-03"),
            ])
        });
        mocks
            .schedules
            .expect_update()
            .withf(|_, _, alignment| alignment.remove.len() == 1 && alignment.add.len() == 1)
            .returning(|id, input, _| Ok(schedule_from(id, &input)));

        mocks
            .build()
            .update_schedule(id, schedule_input("2024-01-02", "2024-01-04"), Uuid::new_v4())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_outputs_reject_negative_values_and_foreign_days() {
        let id = Uuid::new_v4();
        let own_day = day(id, "2024-01-01");
        let own_day_id = own_day.id;

        let mut mocks = Mocks::new();
        mocks
            .schedules
            .expect_find_by_id()
            .returning(move |_| {
                let input = schedule_input("2024-01-01", "2024-01-01");
                Ok(Some(schedule_from(id, &input)))
            });
        mocks
            .schedules
            .expect_days()
            .returning(move |_| Ok(vec![own_day.clone()]));
        mocks.schedules.expect_record_outputs().never();

        let err = mocks
            .build()
            .record_outputs(
                id,
                vec![
                    OutputEntry {
                        day_id: own_day_id,
                        actual_output: -5,
                    },
                    OutputEntry {
                        day_id: Uuid::new_v4(),
                        actual_output: 10,
                    },
                ],
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        match err {
            AppError::Validation(fields) => {
                assert!(fields.contains("outputs.0.actual_output"));
                assert!(fields.contains("outputs.1.day_id"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_line_code_update_self_exclusion() {
        let id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        mocks
            .lines
            .expect_find_by_id()
            .returning(|id| Ok(Some(line(id, "L1"))));
        // Own code: the store excludes this row and reports free
        mocks
            .lines
            .expect_code_taken()
            .withf(move |code, except| code == "L1" && *except == Some(id))
            .returning(|_, _| Ok(false));
        mocks
            .lines
            .expect_code_taken()
            .withf(|code, _| code == "L2")
            .returning(|_, _| Ok(true));
        mocks
            .lines
            .expect_update()
            .times(1)
            .returning(|id, input| Ok(line(id, &input.code)));

        let manager = mocks.build();
        assert!(manager
            .update_line(id, line_input("L1"), Uuid::new_v4())
            .await
            .is_ok());

        let err = manager
            .update_line(id, line_input("L2"), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref f) if f.contains("code")));
    }

    #[tokio::test]
    async fn test_order_due_before_order_date_and_taken_number() {
        let mut mocks = Mocks::new();
        mocks
            .orders
            .expect_order_number_taken()
            .returning(|_, _| Ok(true));
        mocks.orders.expect_create().never();

        let err = mocks
            .build()
            .create_order(
                OrderInput {
                    order_number: "PO-9".into(),
                    product_name: "Widget".into(),
                    product_code: None,
                    quantity: 1,
                    order_date: date("2024-03-02"),
                    due_date: date("2024-03-01"),
                    status: OrderStatus::Pending,
                    notes: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ref f) if f.contains("due_date") && f.contains("order_number")
        ));
    }

    #[tokio::test]
    async fn test_referenced_line_cannot_be_deleted() {
        let mut mocks = Mocks::new();
        mocks
            .lines
            .expect_find_by_id()
            .returning(|id| Ok(Some(line(id, "L1"))));
        mocks
            .schedules
            .expect_references_line()
            .returning(|_| Ok(true));
        mocks.lines.expect_delete().never();

        let err = mocks
            .build()
            .delete_line(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref f) if f.contains("id")));
    }
}
