//! Validated JSON extractor - Combines deserialization with validation.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_path_to_error::Segment;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::errors::AppError;
use domain::FieldErrors;

/// Key under which validator reports struct-level (`schema`) failures.
const STRUCT_LEVEL_KEY: &str = "__all__";

/// Validated JSON extractor that rejects with field-keyed 422 errors.
///
/// # Example
///
/// ```rust,ignore
/// use serde::Deserialize;
/// use validator::Validate;
/// use backoffice::api::extractors::ValidatedJson;
///
/// #[derive(Deserialize, Validate)]
/// struct LineRequest {
///     #[validate(length(min = 1, max = 50))]
///     code: String,
/// }
///
/// async fn store(ValidatedJson(payload): ValidatedJson<LineRequest>) {
///     // payload is already validated
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // Syntax errors and a wrong content type are not field problems
        let Json(body) = Json::<serde_json::Value>::from_request(req, state)
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;

        // Well-formed JSON with the wrong shape is a validation failure
        let value: T = serde_path_to_error::deserialize(body)
            .map_err(|e| AppError::Validation(deserialize_fields(&e)))?;

        value
            .validate()
            .map_err(|e| AppError::Validation(validation_fields(&e)))?;

        Ok(ValidatedJson(value))
    }
}

/// Key a deserialization failure by the field it happened on.
///
/// A missing field is reported on that field, a value of the wrong type on
/// the path where it was found. Failures at the document root fall back to
/// `body`.
pub fn deserialize_fields(err: &serde_path_to_error::Error<serde_json::Error>) -> FieldErrors {
    let mut path: Vec<String> = err
        .path()
        .iter()
        .filter_map(|segment| match segment {
            Segment::Seq { index } => Some(index.to_string()),
            Segment::Map { key } => Some(key.clone()),
            Segment::Enum { variant } => Some(variant.clone()),
            Segment::Unknown => None,
        })
        .collect();

    let inner = err.inner().to_string();
    let missing = missing_field(&inner);
    if let Some(field) = missing {
        path.push(field.to_string());
    }

    // Label with the innermost named segment, skipping list indexes
    let Some(label) = path
        .iter()
        .rev()
        .find(|segment| segment.parse::<usize>().is_err())
        .map(|segment| segment.replace('_', " "))
    else {
        return FieldErrors::single("body", inner);
    };

    let message = if missing.is_some() {
        format!("The {} field is required.", label)
    } else {
        format!("The {} field is invalid.", label)
    };
    FieldErrors::single(path.join("."), message)
}

/// The field name out of serde's "missing field `name`" message.
fn missing_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
}

/// Flatten validator errors into dotted field keys such as `outputs.0.day_id`.
///
/// Struct-level failures are keyed by their error code, which names the
/// field the rule reports on.
pub fn validation_fields(errors: &ValidationErrors) -> FieldErrors {
    let mut fields = FieldErrors::new();
    collect(errors, None, &mut fields);
    fields
}

fn collect(errors: &ValidationErrors, prefix: Option<&str>, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let field = field.to_string();
        let key = |name: &str| match prefix {
            Some(prefix) => format!("{}.{}", prefix, name),
            None => name.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                for err in errs {
                    let name = if field == STRUCT_LEVEL_KEY {
                        err.code.to_string()
                    } else {
                        field.clone()
                    };
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| {
                            format!("The {} field is invalid.", name.replace('_', " "))
                        });
                    out.add(key(&name), message);
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(nested, Some(&key(&field)), out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(nested, Some(&format!("{}.{}", key(&field), index)), out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde::Deserialize;
    use serde_json::json;
    use uuid::Uuid;
    use validator::ValidationError;

    #[derive(Debug, Deserialize, Validate)]
    struct Item {
        #[validate(range(min = 0, message = "The actual output must be at least 0."))]
        actual_output: i64,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "The name field is required."))]
        name: String,
        #[validate(nested)]
        outputs: Vec<Item>,
    }

    fn window_order(window: &Window) -> Result<(), ValidationError> {
        if window.finish_date < window.start_date {
            let message = "The finish date must be a date after or equal to start date.";
            return Err(ValidationError::new("finish_date").with_message(message.into()));
        }
        Ok(())
    }

    #[derive(Debug, Deserialize, Validate)]
    #[validate(schema(function = "window_order"))]
    struct Window {
        line_id: Uuid,
        start_date: NaiveDate,
        finish_date: NaiveDate,
    }

    fn deserialize<T: DeserializeOwned + std::fmt::Debug>(body: serde_json::Value) -> FieldErrors {
        let err = serde_path_to_error::deserialize::<_, T>(body).unwrap_err();
        deserialize_fields(&err)
    }

    #[test]
    fn test_nested_errors_use_dotted_keys() {
        let payload = Payload {
            name: String::new(),
            outputs: vec![Item { actual_output: 3 }, Item { actual_output: -1 }],
        };
        let fields = validation_fields(&payload.validate().unwrap_err());

        assert!(fields.contains("name"));
        assert!(fields.contains("outputs.1.actual_output"));
        assert!(!fields.contains("outputs.0.actual_output"));
    }

    #[test]
    fn test_struct_level_errors_land_on_named_field() {
        let window = Window {
            line_id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            finish_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        };
        let fields = validation_fields(&window.validate().unwrap_err());

        assert!(fields.contains("finish_date"));
        assert!(!fields.contains(STRUCT_LEVEL_KEY));
    }

    #[test]
    fn test_missing_field_is_keyed_by_name() {
        let fields = deserialize::<Window>(json!({
            "line_id": Uuid::new_v4(),
            "start_date": "2024-01-05",
        }));

        assert_eq!(
            fields.get("finish_date"),
            Some(&["The finish date field is required.".to_string()][..])
        );
        assert!(!fields.contains("body"));
    }

    #[test]
    fn test_wrong_type_is_keyed_by_path() {
        let fields = deserialize::<Window>(json!({
            "line_id": "not-a-uuid",
            "start_date": "2024-01-05",
            "finish_date": "2024-01-06",
        }));
        assert_eq!(
            fields.get("line_id"),
            Some(&["The line id field is invalid.".to_string()][..])
        );

        let fields = deserialize::<Payload>(json!({
            "name": "x",
            "outputs": [{"actual_output": 1}, {"actual_output": "many"}],
        }));
        assert!(fields.contains("outputs.1.actual_output"));
    }

    #[test]
    fn test_root_shape_error_falls_back_to_body() {
        let fields = deserialize::<Window>(json!(["not", "an", "object"]));
        assert!(fields.contains("body"));
    }
}
