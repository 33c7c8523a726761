//! Activity log service - records mutations and fans them out to subscribers.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::errors::AppResult;
use crate::infra::repositories::ActivityRepository;
use crate::infra::ActivityBroadcaster;
use crate::types::{DataTableRequest, DataTableResponse};
use domain::{ActivityLog, NewActivity};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ActivityService: Send + Sync {
    /// Persist and broadcast an entry. Failures are logged, never returned.
    async fn record(&self, activity: NewActivity);

    async fn recent(&self, limit: u64) -> AppResult<Vec<ActivityLog>>;

    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<ActivityLog>>;

    /// Live feed of entries recorded after the call
    fn subscribe(&self) -> broadcast::Receiver<ActivityLog>;
}

pub struct ActivityRecorder {
    repo: Arc<dyn ActivityRepository>,
    broadcaster: ActivityBroadcaster,
}

impl ActivityRecorder {
    pub fn new(repo: Arc<dyn ActivityRepository>, broadcaster: ActivityBroadcaster) -> Self {
        Self { repo, broadcaster }
    }
}

#[async_trait]
impl ActivityService for ActivityRecorder {
    async fn record(&self, activity: NewActivity) {
        let subject = activity.subject_type.clone();
        let action = activity.action.clone();

        match self.repo.insert(activity).await {
            Ok(entry) => self.broadcaster.publish(entry),
            Err(e) => tracing::warn!(
                error = %e,
                subject = %subject,
                action = %action,
                "Failed to record activity"
            ),
        }
    }

    async fn recent(&self, limit: u64) -> AppResult<Vec<ActivityLog>> {
        self.repo.recent(limit).await
    }

    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<ActivityLog>> {
        self.repo.datatable(req).await
    }

    fn subscribe(&self) -> broadcast::Receiver<ActivityLog> {
        self.broadcaster.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::infra::repositories::MockActivityRepository;
    use chrono::Utc;
    use uuid::Uuid;

    fn stored(activity: &NewActivity) -> ActivityLog {
        ActivityLog {
            id: Uuid::new_v4(),
            causer_id: activity.causer_id,
            subject_type: activity.subject_type.clone(),
            subject_id: activity.subject_id,
            action: activity.action.clone(),
            description: activity.description.clone(),
            properties: activity.properties.clone(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_recorded_entry_is_broadcast() {
        let mut repo = MockActivityRepository::new();
        repo.expect_insert().times(1).returning(|a| Ok(stored(&a)));

        let recorder = ActivityRecorder::new(Arc::new(repo), ActivityBroadcaster::new(8));
        let mut rx = recorder.subscribe();

        recorder.record(NewActivity::new("master_line", "created")).await;

        let entry = rx.recv().await.unwrap();
        assert_eq!(entry.subject_type, "master_line");
        assert_eq!(entry.action, "created");
    }

    #[tokio::test]
    async fn test_failed_insert_is_swallowed_and_not_broadcast() {
        let mut repo = MockActivityRepository::new();
        repo.expect_insert()
            .returning(|_| Err(AppError::internal("disk full")));

        let recorder = ActivityRecorder::new(Arc::new(repo), ActivityBroadcaster::new(8));
        let mut rx = recorder.subscribe();

        recorder.record(NewActivity::new("user", "deleted")).await;

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
