//! Navigation menu persistence.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, Order, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use super::base::{fetch_datatable, TableColumns};
use super::entities::menu::{self, ActiveModel, Entity as MenuEntity};
use crate::errors::{AppError, AppResult};
use crate::types::{DataTableRequest, DataTableResponse};
use domain::{Menu, MenuPosition};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Writable fields of a menu entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuInput {
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub route: Option<String>,
    pub icon: Option<String>,
    pub permission: Option<String>,
    pub position: i32,
    pub is_active: bool,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait MenuRepository: Send + Sync {
    /// Every stored menu, parents and children alike
    async fn list(&self) -> AppResult<Vec<Menu>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Menu>>;

    async fn create(&self, input: MenuInput) -> AppResult<Menu>;

    async fn update(&self, id: Uuid, input: MenuInput) -> AppResult<Menu>;

    /// Delete a menu; its children go with it
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Apply a validated bulk reorder in one transaction
    async fn reorder(&self, items: Vec<MenuPosition>) -> AppResult<()>;

    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<Menu>>;
}

pub struct MenuStore {
    db: DatabaseConnection,
}

impl MenuStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MenuRepository for MenuStore {
    async fn list(&self) -> AppResult<Vec<Menu>> {
        Ok(MenuEntity::find()
            .order_by_asc(menu::Column::Position)
            .order_by_asc(menu::Column::Title)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Menu::from)
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Menu>> {
        Ok(MenuEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Menu::from))
    }

    async fn create(&self, input: MenuInput) -> AppResult<Menu> {
        let now = Utc::now();
        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            parent_id: Set(input.parent_id),
            title: Set(input.title),
            route: Set(input.route),
            icon: Set(input.icon),
            permission: Set(input.permission),
            position: Set(input.position),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(Menu::from(model))
    }

    async fn update(&self, id: Uuid, input: MenuInput) -> AppResult<Menu> {
        let model = MenuEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = model.into();
        active.parent_id = Set(input.parent_id);
        active.title = Set(input.title);
        active.route = Set(input.route);
        active.icon = Set(input.icon);
        active.permission = Set(input.permission);
        active.position = Set(input.position);
        active.is_active = Set(input.is_active);
        active.updated_at = Set(Utc::now());

        Ok(Menu::from(active.update(&self.db).await?))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = MenuEntity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn reorder(&self, items: Vec<MenuPosition>) -> AppResult<()> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        for item in items {
            let model = MenuEntity::find_by_id(item.id)
                .one(&txn)
                .await?
                .ok_or(AppError::NotFound)?;

            let mut active: ActiveModel = model.into();
            active.parent_id = Set(item.parent_id);
            active.position = Set(item.position);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<Menu>> {
        let columns = TableColumns::<MenuEntity> {
            searchable: &[
                menu::Column::Title,
                menu::Column::Route,
                menu::Column::Permission,
            ],
            sortable: &[
                ("title", menu::Column::Title),
                ("route", menu::Column::Route),
                ("position", menu::Column::Position),
                ("is_active", menu::Column::IsActive),
            ],
            default_sort: (menu::Column::Position, Order::Asc),
        };
        let page = fetch_datatable(&self.db, MenuEntity::find(), req, &columns).await?;
        Ok(page.map(Menu::from))
    }
}
