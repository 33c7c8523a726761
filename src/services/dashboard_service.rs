//! Dashboard counters.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use super::{ActivityService, GalleryService, ProductionCounts, ProductionService, UserService};
use crate::errors::AppResult;
use domain::ActivityLog;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

const RECENT_ACTIVITY_LIMIT: u64 = 10;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub users: u64,
    pub files: u64,
    pub production: ProductionCounts,
    pub recent_activity: Vec<ActivityLog>,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DashboardService: Send + Sync {
    async fn stats(&self) -> AppResult<DashboardStats>;
}

pub struct DashboardManager {
    users: Arc<dyn UserService>,
    production: Arc<dyn ProductionService>,
    gallery: Arc<dyn GalleryService>,
    activity: Arc<dyn ActivityService>,
}

impl DashboardManager {
    pub fn new(
        users: Arc<dyn UserService>,
        production: Arc<dyn ProductionService>,
        gallery: Arc<dyn GalleryService>,
        activity: Arc<dyn ActivityService>,
    ) -> Self {
        Self {
            users,
            production,
            gallery,
            activity,
        }
    }
}

#[async_trait]
impl DashboardService for DashboardManager {
    async fn stats(&self) -> AppResult<DashboardStats> {
        // Independent reads, run concurrently
        let (users, files, production, recent_activity) = futures::try_join!(
            self.users.count_users(),
            self.gallery.count_files(),
            self.production.counts(),
            self.activity.recent(RECENT_ACTIVITY_LIMIT),
        )?;

        Ok(DashboardStats {
            users,
            files,
            production,
            recent_activity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::services::{
        MockActivityService, MockGalleryService, MockProductionService, MockUserService,
        StatusCount,
    };

    fn manager(users: MockUserService) -> DashboardManager {
        let mut production = MockProductionService::new();
        production.expect_counts().returning(|| {
            Ok(ProductionCounts {
                lines: 3,
                orders_by_status: vec![StatusCount {
                    status: "pending".into(),
                    count: 2,
                }],
                schedules_by_status: vec![],
            })
        });
        let mut gallery = MockGalleryService::new();
        gallery.expect_count_files().returning(|| Ok(7));
        let mut activity = MockActivityService::new();
        activity
            .expect_recent()
            .withf(|limit| *limit == RECENT_ACTIVITY_LIMIT)
            .returning(|_| Ok(vec![]));

        DashboardManager::new(
            Arc::new(users),
            Arc::new(production),
            Arc::new(gallery),
            Arc::new(activity),
        )
    }

    #[tokio::test]
    async fn test_stats_combines_counters() {
        let mut users = MockUserService::new();
        users.expect_count_users().returning(|| Ok(12));

        let stats = manager(users).stats().await.unwrap();
        assert_eq!(stats.users, 12);
        assert_eq!(stats.files, 7);
        assert_eq!(stats.production.lines, 3);
        assert_eq!(stats.production.orders_by_status[0].count, 2);
    }

    #[tokio::test]
    async fn test_stats_fails_when_a_counter_fails() {
        let mut users = MockUserService::new();
        users
            .expect_count_users()
            .returning(|| Err(AppError::internal("boom")));

        assert!(manager(users).stats().await.is_err());
    }
}
