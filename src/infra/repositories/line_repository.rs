//! Production line persistence.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::base::{fetch_datatable, TableColumns};
use super::entities::master_line::{self, ActiveModel, Entity as LineEntity};
use crate::errors::{AppError, AppResult};
use crate::types::{DataTableRequest, DataTableResponse};
use domain::MasterLine;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Writable fields of a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInput {
    pub name: String,
    pub code: String,
    pub capacity: Option<i32>,
    pub is_active: bool,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait LineRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MasterLine>>;

    /// Every line ordered by name, for form options
    async fn list(&self) -> AppResult<Vec<MasterLine>>;

    /// Whether a line other than `except` already uses `code`
    async fn code_taken(&self, code: &str, except: Option<Uuid>) -> AppResult<bool>;

    async fn create(&self, input: LineInput) -> AppResult<MasterLine>;

    async fn update(&self, id: Uuid, input: LineInput) -> AppResult<MasterLine>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<MasterLine>>;

    async fn count(&self) -> AppResult<u64>;
}

pub struct LineStore {
    db: DatabaseConnection,
}

impl LineStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LineRepository for LineStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MasterLine>> {
        Ok(LineEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(MasterLine::from))
    }

    async fn list(&self) -> AppResult<Vec<MasterLine>> {
        Ok(LineEntity::find()
            .order_by_asc(master_line::Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(MasterLine::from)
            .collect())
    }

    async fn code_taken(&self, code: &str, except: Option<Uuid>) -> AppResult<bool> {
        let mut query = LineEntity::find().filter(master_line::Column::Code.eq(code));
        if let Some(id) = except {
            query = query.filter(master_line::Column::Id.ne(id));
        }
        Ok(query.count(&self.db).await? > 0)
    }

    async fn create(&self, input: LineInput) -> AppResult<MasterLine> {
        let now = Utc::now();
        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            code: Set(input.code),
            capacity: Set(input.capacity),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(MasterLine::from(model))
    }

    async fn update(&self, id: Uuid, input: LineInput) -> AppResult<MasterLine> {
        let model = LineEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = model.into();
        active.name = Set(input.name);
        active.code = Set(input.code);
        active.capacity = Set(input.capacity);
        active.is_active = Set(input.is_active);
        active.updated_at = Set(Utc::now());

        Ok(MasterLine::from(active.update(&self.db).await?))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = LineEntity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<MasterLine>> {
        let columns = TableColumns::<LineEntity> {
            searchable: &[master_line::Column::Name, master_line::Column::Code],
            sortable: &[
                ("name", master_line::Column::Name),
                ("code", master_line::Column::Code),
                ("capacity", master_line::Column::Capacity),
                ("is_active", master_line::Column::IsActive),
                ("created_at", master_line::Column::CreatedAt),
            ],
            default_sort: (master_line::Column::Code, Order::Asc),
        };
        let page = fetch_datatable(&self.db, LineEntity::find(), req, &columns).await?;
        Ok(page.map(MasterLine::from))
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(LineEntity::find().count(&self.db).await?)
    }
}
