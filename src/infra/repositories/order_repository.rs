//! Production order persistence.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::base::{fetch_datatable, TableColumns};
use super::entities::master_order::{self, ActiveModel, Entity as OrderEntity};
use crate::errors::{AppError, AppResult};
use crate::types::{DataTableRequest, DataTableResponse};
use domain::{MasterOrder, OrderStatus};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Writable fields of an order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderInput {
    pub order_number: String,
    pub product_name: String,
    pub product_code: Option<String>,
    pub quantity: i32,
    pub order_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: OrderStatus,
    pub notes: Option<String>,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MasterOrder>>;

    /// Every order, newest first, for form options
    async fn list(&self) -> AppResult<Vec<MasterOrder>>;

    /// Whether an order other than `except` already uses `order_number`
    async fn order_number_taken(&self, order_number: &str, except: Option<Uuid>)
        -> AppResult<bool>;

    async fn create(&self, input: OrderInput) -> AppResult<MasterOrder>;

    async fn update(&self, id: Uuid, input: OrderInput) -> AppResult<MasterOrder>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    async fn datatable(&self, req: &DataTableRequest)
        -> AppResult<DataTableResponse<MasterOrder>>;

    async fn count_by_status(&self, status: OrderStatus) -> AppResult<u64>;
}

pub struct OrderStore {
    db: DatabaseConnection,
}

impl OrderStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderRepository for OrderStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MasterOrder>> {
        OrderEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(MasterOrder::try_from)
            .transpose()
    }

    async fn list(&self) -> AppResult<Vec<MasterOrder>> {
        OrderEntity::find()
            .order_by_desc(master_order::Column::OrderDate)
            .all(&self.db)
            .await?
            .into_iter()
            .map(MasterOrder::try_from)
            .collect()
    }

    async fn order_number_taken(
        &self,
        order_number: &str,
        except: Option<Uuid>,
    ) -> AppResult<bool> {
        let mut query =
            OrderEntity::find().filter(master_order::Column::OrderNumber.eq(order_number));
        if let Some(id) = except {
            query = query.filter(master_order::Column::Id.ne(id));
        }
        Ok(query.count(&self.db).await? > 0)
    }

    async fn create(&self, input: OrderInput) -> AppResult<MasterOrder> {
        let now = Utc::now();
        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(input.order_number),
            product_name: Set(input.product_name),
            product_code: Set(input.product_code),
            quantity: Set(input.quantity),
            order_date: Set(input.order_date),
            due_date: Set(input.due_date),
            status: Set(input.status.as_str().to_string()),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        MasterOrder::try_from(model)
    }

    async fn update(&self, id: Uuid, input: OrderInput) -> AppResult<MasterOrder> {
        let model = OrderEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = model.into();
        active.order_number = Set(input.order_number);
        active.product_name = Set(input.product_name);
        active.product_code = Set(input.product_code);
        active.quantity = Set(input.quantity);
        active.order_date = Set(input.order_date);
        active.due_date = Set(input.due_date);
        active.status = Set(input.status.as_str().to_string());
        active.notes = Set(input.notes);
        active.updated_at = Set(Utc::now());

        MasterOrder::try_from(active.update(&self.db).await?)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = OrderEntity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn datatable(
        &self,
        req: &DataTableRequest,
    ) -> AppResult<DataTableResponse<MasterOrder>> {
        let columns = TableColumns::<OrderEntity> {
            searchable: &[
                master_order::Column::OrderNumber,
                master_order::Column::ProductName,
                master_order::Column::ProductCode,
                master_order::Column::Status,
            ],
            sortable: &[
                ("order_number", master_order::Column::OrderNumber),
                ("product_name", master_order::Column::ProductName),
                ("quantity", master_order::Column::Quantity),
                ("order_date", master_order::Column::OrderDate),
                ("due_date", master_order::Column::DueDate),
                ("status", master_order::Column::Status),
            ],
            default_sort: (master_order::Column::OrderDate, Order::Desc),
        };
        let page = fetch_datatable(&self.db, OrderEntity::find(), req, &columns).await?;
        let orders = page
            .data
            .into_iter()
            .map(MasterOrder::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(DataTableResponse::new(
            page.draw,
            page.records_total,
            page.records_filtered,
            orders,
        ))
    }

    async fn count_by_status(&self, status: OrderStatus) -> AppResult<u64> {
        Ok(OrderEntity::find()
            .filter(master_order::Column::Status.eq(status.as_str()))
            .count(&self.db)
            .await?)
    }
}
