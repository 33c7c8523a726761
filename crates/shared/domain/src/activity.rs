//! Append-only activity log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stored activity entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActivityLog {
    pub id: Uuid,
    pub causer_id: Option<Uuid>,
    pub subject_type: String,
    pub subject_id: Option<Uuid>,
    pub action: String,
    pub description: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub properties: Value,
    pub created_at: DateTime<Utc>,
}

/// Activity to be recorded
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub causer_id: Option<Uuid>,
    pub subject_type: String,
    pub subject_id: Option<Uuid>,
    pub action: String,
    pub description: String,
    pub properties: Value,
}

impl NewActivity {
    pub fn new(subject_type: impl Into<String>, action: impl Into<String>) -> Self {
        let subject_type = subject_type.into();
        let action = action.into();
        Self {
            causer_id: None,
            description: format!("{} {}", subject_type, action.replace('_', " ")),
            subject_type,
            subject_id: None,
            action,
            properties: Value::Object(Default::default()),
        }
    }

    pub fn by(mut self, causer_id: Option<Uuid>) -> Self {
        self.causer_id = causer_id;
        self
    }

    pub fn on(mut self, subject_id: Uuid) -> Self {
        self.subject_id = Some(subject_id);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_description() {
        let causer = Uuid::new_v4();
        let subject = Uuid::new_v4();
        let activity = NewActivity::new("user", "force_deleted").by(Some(causer)).on(subject);

        assert_eq!(activity.description, "user force deleted");
        assert_eq!(activity.causer_id, Some(causer));
        assert_eq!(activity.subject_id, Some(subject));
        assert!(activity.properties.as_object().unwrap().is_empty());
    }
}
