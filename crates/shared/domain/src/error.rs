//! Domain-level errors.
//!
//! These errors represent business rule violations and domain logic failures.
//! They are independent of infrastructure concerns (HTTP, database).

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Validation messages keyed by the input field they refer to.
///
/// Nested fields use dotted keys (`outputs.2.actual_output`,
/// `social_links.facebook`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single failing field.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// `The {field} has already been taken.`
    pub fn add_taken(&mut self, field: &str) {
        self.add(field, format!("The {} has already been taken.", field.replace('_', " ")));
    }

    /// `The selected {field} is invalid.`
    pub fn add_invalid_reference(&mut self, field: &str) {
        self.add(field, format!("The selected {} is invalid.", field.replace('_', " ")));
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// First message in field order, used as the summary line.
    pub fn first_message(&self) -> Option<&str> {
        self.0
            .values()
            .flat_map(|messages| messages.iter())
            .map(String::as_str)
            .next()
    }

    /// `Ok(())` when nothing was collected, the validation error otherwise.
    pub fn into_result(self) -> DomainResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .values()
            .flat_map(|messages| messages.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&joined)
    }
}

/// Domain-specific errors for business rule violations.
#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// Validation failed for one or more fields
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    /// Password-related errors
    #[error("Password error: {0}")]
    Password(String),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity already exists (conflict)
    #[error("{0} already exists")]
    Conflict(String),

    /// Unauthorized access attempt
    #[error("Unauthorized")]
    Unauthorized,

    /// Forbidden action
    #[error("Forbidden")]
    Forbidden,

    /// Invalid credentials provided
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Internal domain error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Create a validation error for a single field
    pub fn field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        DomainError::Validation(FieldErrors::single(field, msg))
    }

    /// Create a password error
    pub fn password(msg: impl Into<String>) -> Self {
        DomainError::Password(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>) -> Self {
        DomainError::NotFound(entity.into())
    }

    /// Create a conflict error
    pub fn conflict(entity: impl Into<String>) -> Self {
        DomainError::Conflict(entity.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        DomainError::Internal(msg.into())
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_collects_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("email", "The email has already been taken.");
        errors.add("email", "The email must be a valid email address.");
        errors.add("name", "The name field is required.");

        assert_eq!(errors.get("email").map(|m| m.len()), Some(2));
        assert!(errors.contains("name"));
        assert_eq!(errors.first_message(), Some("The email has already been taken."));
    }

    #[test]
    fn test_reference_and_uniqueness_messages() {
        let mut errors = FieldErrors::new();
        errors.add_taken("order_number");
        errors.add_invalid_reference("line_id");
        assert_eq!(
            errors.get("order_number"),
            Some(&["The order number has already been taken.".to_string()][..])
        );
        assert_eq!(
            errors.get("line_id"),
            Some(&["The selected line id is invalid.".to_string()][..])
        );
    }

    #[test]
    fn test_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());

        let err = FieldErrors::single("code", "taken").into_result().unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref f) if f.contains("code")));
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let errors = FieldErrors::single("finish_date", "too early");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({"finish_date": ["too early"]}));
    }
}
