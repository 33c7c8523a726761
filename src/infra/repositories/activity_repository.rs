//! Activity log persistence. Rows are only ever inserted.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Order, QueryOrder, QuerySelect, Set};
use uuid::Uuid;

use super::base::{fetch_datatable, TableColumns};
use super::entities::activity_log::{self, ActiveModel, Entity as ActivityEntity};
use crate::errors::AppResult;
use crate::types::{DataTableRequest, DataTableResponse};
use domain::{ActivityLog, NewActivity};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn insert(&self, activity: NewActivity) -> AppResult<ActivityLog>;

    /// Most recent entries, newest first
    async fn recent(&self, limit: u64) -> AppResult<Vec<ActivityLog>>;

    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<ActivityLog>>;
}

pub struct ActivityStore {
    db: DatabaseConnection,
}

impl ActivityStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActivityRepository for ActivityStore {
    async fn insert(&self, activity: NewActivity) -> AppResult<ActivityLog> {
        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            causer_id: Set(activity.causer_id),
            subject_type: Set(activity.subject_type),
            subject_id: Set(activity.subject_id),
            action: Set(activity.action),
            description: Set(activity.description),
            properties: Set(activity.properties),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        Ok(ActivityLog::from(model))
    }

    async fn recent(&self, limit: u64) -> AppResult<Vec<ActivityLog>> {
        Ok(ActivityEntity::find()
            .order_by_desc(activity_log::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ActivityLog::from)
            .collect())
    }

    async fn datatable(
        &self,
        req: &DataTableRequest,
    ) -> AppResult<DataTableResponse<ActivityLog>> {
        let columns = TableColumns::<ActivityEntity> {
            searchable: &[
                activity_log::Column::SubjectType,
                activity_log::Column::Action,
                activity_log::Column::Description,
            ],
            sortable: &[
                ("subject_type", activity_log::Column::SubjectType),
                ("action", activity_log::Column::Action),
                ("created_at", activity_log::Column::CreatedAt),
            ],
            default_sort: (activity_log::Column::CreatedAt, Order::Desc),
        };
        let page = fetch_datatable(&self.db, ActivityEntity::find(), req, &columns).await?;
        Ok(page.map(ActivityLog::from))
    }
}
