//! In-process fan-out of freshly recorded activity entries.

use tokio::sync::broadcast;

use domain::ActivityLog;

/// Best-effort publisher; slow subscribers miss entries rather than block writers.
#[derive(Debug, Clone)]
pub struct ActivityBroadcaster {
    sender: broadcast::Sender<ActivityLog>,
}

impl ActivityBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an entry. Having nobody listening is not an error.
    pub fn publish(&self, entry: ActivityLog) {
        match self.sender.send(entry) {
            Ok(receivers) => tracing::trace!(receivers, "Activity broadcast"),
            Err(_) => tracing::trace!("Activity broadcast with no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActivityLog> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn entry() -> ActivityLog {
        ActivityLog {
            id: Uuid::new_v4(),
            causer_id: None,
            subject_type: "user".into(),
            subject_id: None,
            action: "created".into(),
            description: "user created".into(),
            properties: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_entries() {
        let broadcaster = ActivityBroadcaster::new(4);
        let mut rx = broadcaster.subscribe();
        let sent = entry();

        broadcaster.publish(sent.clone());
        assert_eq!(rx.recv().await.unwrap(), sent);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        ActivityBroadcaster::new(4).publish(entry());
    }
}
