//! Production scheduling handlers: lines, orders, schedules and daily outputs.

use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{permission, Authorized};
use crate::api::pages::Page;
use crate::api::AppState;
use crate::errors::{AppError, AppResult};
use crate::infra::repositories::{LineInput, OrderInput, ScheduleInput};
use crate::services::{ScheduleDetail, ScheduleFormOptions};
use crate::types::{ApiResponse, Created, DataTableRequest, DataTableResponse, NoContent};
use domain::production::{date_order_message, OutputEntry};
use domain::{MasterLine, MasterOrder, OrderStatus, Schedule, ScheduleDay, ScheduleStatus};

fn order_status(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<OrderStatus>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("status").with_message("The selected status is invalid.".into()))
}

fn schedule_status(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<ScheduleStatus>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("status").with_message("The selected status is invalid.".into()))
}

/// Later date on or after the earlier one, reported on the later field.
fn dates_in_order(
    start_field: &str,
    start: NaiveDate,
    end_field: &'static str,
    end: NaiveDate,
) -> Result<(), ValidationError> {
    if end < start {
        let message = date_order_message(start_field, end_field);
        return Err(ValidationError::new(end_field).with_message(message.into()));
    }
    Ok(())
}

fn order_dates(req: &OrderRequest) -> Result<(), ValidationError> {
    dates_in_order("order_date", req.order_date, "due_date", req.due_date)
}

fn schedule_dates(req: &ScheduleRequest) -> Result<(), ValidationError> {
    dates_in_order("start_date", req.start_date, "finish_date", req.finish_date)
}

/// Parse a status the validator already accepted.
fn parse_status<T: std::str::FromStr>(value: &str) -> AppResult<T> {
    value
        .parse()
        .map_err(|_| AppError::field("status", "The selected status is invalid."))
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LineRequest {
    #[validate(length(min = 1, max = 255, message = "The name must be between 1 and 255 characters."))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "The code must be between 1 and 50 characters."))]
    #[schema(example = "LINE-A")]
    pub code: String,
    #[validate(range(min = 0, message = "The capacity must be at least 0."))]
    pub capacity: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<LineRequest> for LineInput {
    fn from(req: LineRequest) -> Self {
        LineInput {
            name: req.name,
            code: req.code,
            capacity: req.capacity,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "order_dates", skip_on_field_errors = false))]
pub struct OrderRequest {
    #[validate(length(min = 1, max = 50, message = "The order number must be between 1 and 50 characters."))]
    #[schema(example = "PO-2024-001")]
    pub order_number: String,
    #[validate(length(min = 1, max = 255, message = "The product name must be between 1 and 255 characters."))]
    pub product_name: String,
    #[validate(length(max = 100, message = "The product code may not be greater than 100 characters."))]
    pub product_code: Option<String>,
    #[validate(range(min = 1, message = "The quantity must be at least 1."))]
    pub quantity: i32,
    pub order_date: NaiveDate,
    pub due_date: NaiveDate,
    #[validate(custom(function = "order_status"))]
    #[schema(example = "pending")]
    pub status: String,
    pub notes: Option<String>,
}

impl OrderRequest {
    fn into_input(self) -> AppResult<OrderInput> {
        Ok(OrderInput {
            status: parse_status(&self.status)?,
            order_number: self.order_number,
            product_name: self.product_name,
            product_code: self.product_code,
            quantity: self.quantity,
            order_date: self.order_date,
            due_date: self.due_date,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "schedule_dates", skip_on_field_errors = false))]
pub struct ScheduleRequest {
    pub order_id: Uuid,
    pub line_id: Uuid,
    #[schema(example = "2024-01-05")]
    pub start_date: NaiveDate,
    #[schema(example = "2024-01-10")]
    pub finish_date: NaiveDate,
    #[validate(range(min = 1, message = "The target quantity must be at least 1."))]
    pub target_quantity: i32,
    #[validate(custom(function = "schedule_status"))]
    #[schema(example = "pending")]
    pub status: String,
    pub notes: Option<String>,
}

impl ScheduleRequest {
    fn into_input(self) -> AppResult<ScheduleInput> {
        Ok(ScheduleInput {
            status: parse_status(&self.status)?,
            order_id: self.order_id,
            line_id: self.line_id,
            start_date: self.start_date,
            finish_date: self.finish_date,
            target_quantity: self.target_quantity,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OutputItem {
    pub day_id: Uuid,
    #[validate(range(min = 0, message = "The actual output must be at least 0."))]
    pub actual_output: i64,
}

/// Bulk daily output recording
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OutputsRequest {
    #[validate(nested)]
    pub outputs: Vec<OutputItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<MasterOrder>,
    pub statuses: Vec<OrderStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduleForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    pub options: ScheduleFormOptions,
}

// ---- Lines ----

#[utoipa::path(get, path = "/dashboard/production/lines", tag = "Production",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Lines page")))]
pub async fn lines_index(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ViewProduction>,
) -> AppResult<Page<()>> {
    Page::render(&state, &current_user, "Production/Lines/Index", ()).await
}

#[utoipa::path(post, path = "/dashboard/production/lines/json", tag = "Production",
    security(("bearer_auth" = [])), request_body = DataTableRequest,
    responses((status = 200, description = "One draw of the lines table")))]
pub async fn lines_datatable(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ViewProduction>,
    Json(req): Json<DataTableRequest>,
) -> AppResult<Json<DataTableResponse<MasterLine>>> {
    Ok(Json(state.services.production.lines_datatable(&req).await?))
}

#[utoipa::path(get, path = "/dashboard/production/lines/create", tag = "Production",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Create form")))]
pub async fn lines_create(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
) -> AppResult<Page<Option<MasterLine>>> {
    Page::render(&state, &current_user, "Production/Lines/Create", None).await
}

#[utoipa::path(post, path = "/dashboard/production/lines", tag = "Production",
    security(("bearer_auth" = [])), request_body = LineRequest,
    responses(
        (status = 201, description = "Line created", body = MasterLine),
        (status = 422, description = "Validation error")
    ))]
pub async fn lines_store(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
    ValidatedJson(payload): ValidatedJson<LineRequest>,
) -> AppResult<Created<MasterLine>> {
    let line = state
        .services
        .production
        .create_line(payload.into(), current_user.id())
        .await?;
    Ok(Created(line))
}

#[utoipa::path(get, path = "/dashboard/production/lines/{id}/edit", tag = "Production",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Line ID")),
    responses((status = 200, description = "Edit form"), (status = 404, description = "Line not found")))]
pub async fn lines_edit(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
    Path(id): Path<Uuid>,
) -> AppResult<Page<Option<MasterLine>>> {
    let line = state.services.production.get_line(id).await?;
    Page::render(&state, &current_user, "Production/Lines/Edit", Some(line)).await
}

#[utoipa::path(put, path = "/dashboard/production/lines/{id}", tag = "Production",
    security(("bearer_auth" = [])), request_body = LineRequest,
    params(("id" = Uuid, Path, description = "Line ID")),
    responses(
        (status = 200, description = "Line updated", body = MasterLine),
        (status = 422, description = "Validation error")
    ))]
pub async fn lines_update(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<LineRequest>,
) -> AppResult<Json<ApiResponse<MasterLine>>> {
    let line = state
        .services
        .production
        .update_line(id, payload.into(), current_user.id())
        .await?;
    Ok(Json(ApiResponse::with_message(line, "Line updated.")))
}

#[utoipa::path(delete, path = "/dashboard/production/lines/{id}", tag = "Production",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Line ID")),
    responses(
        (status = 204, description = "Line deleted"),
        (status = 422, description = "Line is used by schedules")
    ))]
pub async fn lines_destroy(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.production.delete_line(id, current_user.id()).await?;
    Ok(NoContent)
}

// ---- Orders ----

#[utoipa::path(get, path = "/dashboard/production/orders", tag = "Production",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Orders page")))]
pub async fn orders_index(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ViewProduction>,
) -> AppResult<Page<Vec<OrderStatus>>> {
    Page::render(
        &state,
        &current_user,
        "Production/Orders/Index",
        OrderStatus::ALL.to_vec(),
    )
    .await
}

#[utoipa::path(post, path = "/dashboard/production/orders/json", tag = "Production",
    security(("bearer_auth" = [])), request_body = DataTableRequest,
    responses((status = 200, description = "One draw of the orders table")))]
pub async fn orders_datatable(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ViewProduction>,
    Json(req): Json<DataTableRequest>,
) -> AppResult<Json<DataTableResponse<MasterOrder>>> {
    Ok(Json(state.services.production.orders_datatable(&req).await?))
}

#[utoipa::path(get, path = "/dashboard/production/orders/create", tag = "Production",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Create form", body = OrderForm)))]
pub async fn orders_create(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
) -> AppResult<Page<OrderForm>> {
    let form = OrderForm {
        order: None,
        statuses: OrderStatus::ALL.to_vec(),
    };
    Page::render(&state, &current_user, "Production/Orders/Create", form).await
}

#[utoipa::path(post, path = "/dashboard/production/orders", tag = "Production",
    security(("bearer_auth" = [])), request_body = OrderRequest,
    responses(
        (status = 201, description = "Order created", body = MasterOrder),
        (status = 422, description = "Validation error")
    ))]
pub async fn orders_store(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
    ValidatedJson(payload): ValidatedJson<OrderRequest>,
) -> AppResult<Created<MasterOrder>> {
    let order = state
        .services
        .production
        .create_order(payload.into_input()?, current_user.id())
        .await?;
    Ok(Created(order))
}

#[utoipa::path(get, path = "/dashboard/production/orders/{id}/edit", tag = "Production",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Order ID")),
    responses((status = 200, description = "Edit form", body = OrderForm), (status = 404, description = "Order not found")))]
pub async fn orders_edit(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
    Path(id): Path<Uuid>,
) -> AppResult<Page<OrderForm>> {
    let form = OrderForm {
        order: Some(state.services.production.get_order(id).await?),
        statuses: OrderStatus::ALL.to_vec(),
    };
    Page::render(&state, &current_user, "Production/Orders/Edit", form).await
}

#[utoipa::path(put, path = "/dashboard/production/orders/{id}", tag = "Production",
    security(("bearer_auth" = [])), request_body = OrderRequest,
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order updated", body = MasterOrder),
        (status = 422, description = "Validation error")
    ))]
pub async fn orders_update(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<OrderRequest>,
) -> AppResult<Json<ApiResponse<MasterOrder>>> {
    let order = state
        .services
        .production
        .update_order(id, payload.into_input()?, current_user.id())
        .await?;
    Ok(Json(ApiResponse::with_message(order, "Order updated.")))
}

#[utoipa::path(delete, path = "/dashboard/production/orders/{id}", tag = "Production",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 422, description = "Order is used by schedules")
    ))]
pub async fn orders_destroy(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.production.delete_order(id, current_user.id()).await?;
    Ok(NoContent)
}

// ---- Schedules ----

#[utoipa::path(get, path = "/dashboard/production/schedules", tag = "Production",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Schedules page")))]
pub async fn schedules_index(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ViewProduction>,
) -> AppResult<Page<Vec<ScheduleStatus>>> {
    Page::render(
        &state,
        &current_user,
        "Production/Schedules/Index",
        ScheduleStatus::ALL.to_vec(),
    )
    .await
}

#[utoipa::path(post, path = "/dashboard/production/schedules/json", tag = "Production",
    security(("bearer_auth" = [])), request_body = DataTableRequest,
    responses((status = 200, description = "One draw of the schedules table")))]
pub async fn schedules_datatable(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ViewProduction>,
    Json(req): Json<DataTableRequest>,
) -> AppResult<Json<DataTableResponse<Schedule>>> {
    Ok(Json(state.services.production.schedules_datatable(&req).await?))
}

#[utoipa::path(get, path = "/dashboard/production/schedules/create", tag = "Production",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Create form", body = ScheduleForm)))]
pub async fn schedules_create(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
) -> AppResult<Page<ScheduleForm>> {
    let form = ScheduleForm {
        schedule: None,
        options: state.services.production.schedule_form_options().await?,
    };
    Page::render(&state, &current_user, "Production/Schedules/Create", form).await
}

#[utoipa::path(post, path = "/dashboard/production/schedules", tag = "Production",
    security(("bearer_auth" = [])), request_body = ScheduleRequest,
    responses(
        (status = 201, description = "Schedule created with one day record per date", body = Schedule),
        (status = 422, description = "Validation error")
    ))]
pub async fn schedules_store(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
    ValidatedJson(payload): ValidatedJson<ScheduleRequest>,
) -> AppResult<Created<Schedule>> {
    let schedule = state
        .services
        .production
        .create_schedule(payload.into_input()?, current_user.id())
        .await?;
    Ok(Created(schedule))
}

#[utoipa::path(get, path = "/dashboard/production/schedules/{id}", tag = "Production",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Schedule ID")),
    responses((status = 200, description = "Schedule with its days", body = ScheduleDetail), (status = 404, description = "Schedule not found")))]
pub async fn schedules_show(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ViewProduction>,
    Path(id): Path<Uuid>,
) -> AppResult<Page<ScheduleDetail>> {
    let detail = state.services.production.schedule_detail(id).await?;
    Page::render(&state, &current_user, "Production/Schedules/Show", detail).await
}

#[utoipa::path(get, path = "/dashboard/production/schedules/{id}/edit", tag = "Production",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Schedule ID")),
    responses((status = 200, description = "Edit form", body = ScheduleForm), (status = 404, description = "Schedule not found")))]
pub async fn schedules_edit(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
    Path(id): Path<Uuid>,
) -> AppResult<Page<ScheduleForm>> {
    let detail = state.services.production.schedule_detail(id).await?;
    let form = ScheduleForm {
        schedule: Some(detail.schedule),
        options: state.services.production.schedule_form_options().await?,
    };
    Page::render(&state, &current_user, "Production/Schedules/Edit", form).await
}

#[utoipa::path(put, path = "/dashboard/production/schedules/{id}", tag = "Production",
    security(("bearer_auth" = [])), request_body = ScheduleRequest,
    params(("id" = Uuid, Path, description = "Schedule ID")),
    responses(
        (status = 200, description = "Schedule updated and days re-aligned", body = Schedule),
        (status = 422, description = "Validation error")
    ))]
pub async fn schedules_update(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ScheduleRequest>,
) -> AppResult<Json<ApiResponse<Schedule>>> {
    let schedule = state
        .services
        .production
        .update_schedule(id, payload.into_input()?, current_user.id())
        .await?;
    Ok(Json(ApiResponse::with_message(schedule, "Schedule updated.")))
}

#[utoipa::path(delete, path = "/dashboard/production/schedules/{id}", tag = "Production",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Schedule ID")),
    responses((status = 204, description = "Schedule deleted")))]
pub async fn schedules_destroy(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageProduction>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state
        .services
        .production
        .delete_schedule(id, current_user.id())
        .await?;
    Ok(NoContent)
}

#[utoipa::path(post, path = "/dashboard/production/schedules/{id}/outputs", tag = "Production",
    security(("bearer_auth" = [])), request_body = OutputsRequest,
    params(("id" = Uuid, Path, description = "Schedule ID")),
    responses(
        (status = 200, description = "Outputs recorded", body = Vec<ScheduleDay>),
        (status = 422, description = "Negative output or unknown day")
    ))]
pub async fn schedules_outputs(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::RecordOutput>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<OutputsRequest>,
) -> AppResult<Json<ApiResponse<Vec<ScheduleDay>>>> {
    let entries = payload
        .outputs
        .into_iter()
        .map(|item| OutputEntry {
            day_id: item.day_id,
            actual_output: item.actual_output,
        })
        .collect();
    let days = state
        .services
        .production
        .record_outputs(id, entries, current_user.id())
        .await?;
    Ok(Json(ApiResponse::with_message(days, "Outputs recorded.")))
}
