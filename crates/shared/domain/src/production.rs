//! Production scheduling: lines, orders, schedules and their day records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult, FieldErrors};

/// Order lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Scheduled,
        OrderStatus::InProgress,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Scheduled => "scheduled",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Schedule lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Pending,
    InProgress,
    Completed,
    Delayed,
}

impl ScheduleStatus {
    pub const ALL: [ScheduleStatus; 4] = [
        ScheduleStatus::Pending,
        ScheduleStatus::InProgress,
        ScheduleStatus::Completed,
        ScheduleStatus::Delayed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Pending => "pending",
            ScheduleStatus::InProgress => "in_progress",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Delayed => "delayed",
        }
    }
}

/// Error returned when a status string is outside the enumeration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl FromStr for ScheduleStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScheduleStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Production line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MasterLine {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub capacity: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer/production order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MasterOrder {
    pub id: Uuid,
    pub order_number: String,
    pub product_name: String,
    pub product_code: Option<String>,
    pub quantity: i32,
    pub order_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Assignment of an order to a line over a date window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Schedule {
    pub id: Uuid,
    pub order_id: Uuid,
    pub line_id: Uuid,
    pub start_date: NaiveDate,
    pub finish_date: NaiveDate,
    pub target_quantity: i32,
    pub status: ScheduleStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One calendar day of a schedule; `actual_output` is filled by recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ScheduleDay {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub production_date: NaiveDate,
    pub actual_output: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reject a window whose end precedes its start. Equal dates are valid.
pub fn ensure_date_order(
    start_field: &str,
    start: NaiveDate,
    end_field: &str,
    end: NaiveDate,
) -> DomainResult<()> {
    if end < start {
        return Err(DomainError::field(end_field, date_order_message(start_field, end_field)));
    }
    Ok(())
}

/// `The {end} must be a date after or equal to {start}.`
pub fn date_order_message(start_field: &str, end_field: &str) -> String {
    format!(
        "The {} must be a date after or equal to {}.",
        end_field.replace('_', " "),
        start_field.replace('_', " ")
    )
}

/// Every calendar day in `[start, finish]`, empty when the window is inverted.
pub fn date_span(start: NaiveDate, finish: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|day| *day <= finish)
        .collect()
}

/// Changes needed to align stored day records with a schedule window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayAlignment {
    /// Day records outside the new window
    pub remove: Vec<Uuid>,
    /// Dates inside the window with no record yet
    pub add: Vec<NaiveDate>,
}

impl DayAlignment {
    pub fn is_noop(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

/// Compare existing day records with `[start, finish]`.
///
/// Days that stay inside the window keep their id and recorded output.
pub fn align_days(existing: &[ScheduleDay], start: NaiveDate, finish: NaiveDate) -> DayAlignment {
    let remove = existing
        .iter()
        .filter(|day| day.production_date < start || day.production_date > finish)
        .map(|day| day.id)
        .collect();

    let add = date_span(start, finish)
        .into_iter()
        .filter(|date| !existing.iter().any(|day| day.production_date == *date))
        .collect();

    DayAlignment { remove, add }
}

/// One entry of a bulk output recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEntry {
    pub day_id: Uuid,
    pub actual_output: i64,
}

/// Check recorded outputs against the schedule's day records.
///
/// Each day must exist and belong to the schedule; outputs must be
/// non-negative and fit the storage column.
pub fn check_outputs(days: &[ScheduleDay], entries: &[OutputEntry]) -> DomainResult<()> {
    let mut errors = FieldErrors::new();

    if entries.is_empty() {
        errors.add("outputs", "The outputs field is required.");
    }

    for (index, entry) in entries.iter().enumerate() {
        if !days.iter().any(|day| day.id == entry.day_id) {
            errors.add(
                format!("outputs.{}.day_id", index),
                "The selected day is invalid.",
            );
        }
        if entry.actual_output < 0 {
            errors.add(
                format!("outputs.{}.actual_output", index),
                "The actual output must be at least 0.",
            );
        } else if entry.actual_output > i64::from(i32::MAX) {
            errors.add(
                format!("outputs.{}.actual_output", index),
                "The actual output is too large.",
            );
        }
    }

    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn day(schedule_id: Uuid, on: &str, output: Option<i32>) -> ScheduleDay {
        ScheduleDay {
            id: Uuid::new_v4(),
            schedule_id,
            production_date: date(on),
            actual_output: output,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_finish_before_start_is_rejected_on_finish_field() {
        let err = ensure_date_order(
            "start_date",
            date("2024-01-10"),
            "finish_date",
            date("2024-01-05"),
        )
        .unwrap_err();

        match err {
            DomainError::Validation(fields) => assert!(fields.contains("finish_date")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_equal_dates_are_accepted() {
        assert!(ensure_date_order(
            "start_date",
            date("2024-01-10"),
            "finish_date",
            date("2024-01-10"),
        )
        .is_ok());
        assert!(ensure_date_order(
            "order_date",
            date("2024-02-01"),
            "due_date",
            date("2024-03-01"),
        )
        .is_ok());
    }

    #[test]
    fn test_date_span_is_inclusive() {
        let span = date_span(date("2024-01-30"), date("2024-02-02"));
        assert_eq!(span.len(), 4);
        assert_eq!(span[0], date("2024-01-30"));
        assert_eq!(span[3], date("2024-02-02"));

        assert_eq!(date_span(date("2024-01-10"), date("2024-01-10")).len(), 1);
        assert!(date_span(date("2024-01-10"), date("2024-01-09")).is_empty());
    }

    #[test]
    fn test_align_days_keeps_overlap() {
        let schedule_id = Uuid::new_v4();
        let existing = vec![
            day(schedule_id, "2024-01-01", Some(10)),
            day(schedule_id, "2024-01-02", Some(12)),
            day(schedule_id, "2024-01-03", None),
        ];

        let plan = align_days(&existing, date("2024-01-02"), date("2024-01-04"));

        assert_eq!(plan.remove, vec![existing[0].id]);
        assert_eq!(plan.add, vec![date("2024-01-04")]);
        assert!(align_days(&existing, date("2024-01-01"), date("2024-01-03")).is_noop());
    }

    #[test]
    fn test_check_outputs_rejects_negative_and_foreign_days() {
        let schedule_id = Uuid::new_v4();
        let days = vec![day(schedule_id, "2024-01-01", None)];

        let ok = [OutputEntry {
            day_id: days[0].id,
            actual_output: 0,
        }];
        assert!(check_outputs(&days, &ok).is_ok());

        let bad = [
            OutputEntry {
                day_id: days[0].id,
                actual_output: -1,
            },
            OutputEntry {
                day_id: Uuid::new_v4(),
                actual_output: 5,
            },
        ];
        match check_outputs(&days, &bad).unwrap_err() {
            DomainError::Validation(fields) => {
                assert!(fields.contains("outputs.0.actual_output"));
                assert!(fields.contains("outputs.1.day_id"));
                assert!(!fields.contains("outputs.0.day_id"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("in_progress".parse::<OrderStatus>(), Ok(OrderStatus::InProgress));
        assert_eq!("delayed".parse::<ScheduleStatus>(), Ok(ScheduleStatus::Delayed));
        assert!("delayed".parse::<OrderStatus>().is_err());
        assert!("cancelled".parse::<ScheduleStatus>().is_err());

        let err = "cancelled".parse::<ScheduleStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown status 'cancelled'");
    }
}
