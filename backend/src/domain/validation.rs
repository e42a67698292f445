//! Validation failures shared by every entity and service.
//!
//! Each entity reports problems through [`ValidationError`]; the variants
//! carry the offending field so adapters can point clients at it.

use chrono::NaiveDate;
use serde_json::json;

use super::Error;

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Value must be strictly positive.
    #[error("{field} must be greater than 0")]
    NotPositive { field: &'static str },
    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    Negative { field: &'static str },
    /// Value falls outside an inclusive range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    /// Text is empty once trimmed.
    #[error("{field} must not be blank")]
    Blank { field: &'static str },
    /// Text does not follow the expected shape.
    #[error("{field} must be {expected}")]
    InvalidFormat {
        field: &'static str,
        expected: &'static str,
    },
    /// A start date does not precede its end date.
    #[error("{start} must be before {end}")]
    DateOrder {
        start: &'static str,
        end: &'static str,
    },
    /// Another live document already uses the value within its scope.
    #[error("{field} `{value}` is already in use")]
    Duplicate { field: &'static str, value: String },
    /// A reference points at a missing or deleted document.
    #[error("{field} does not refer to an existing {collection} document")]
    MissingReference {
        field: &'static str,
        collection: &'static str,
    },
    /// The field is derived or managed by the server.
    #[error("{field} is read-only")]
    ReadOnlyField { field: String },
    /// The payload could not be decoded into the entity schema.
    #[error("invalid payload: {message}")]
    InvalidPayload { message: String },
}

impl ValidationError {
    /// Stable snake_case identifier for the violated rule.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotPositive { .. } => "not_positive",
            Self::Negative { .. } => "negative",
            Self::OutOfRange { .. } => "out_of_range",
            Self::Blank { .. } => "blank",
            Self::InvalidFormat { .. } => "invalid_format",
            Self::DateOrder { .. } => "date_order",
            Self::Duplicate { .. } => "duplicate",
            Self::MissingReference { .. } => "missing_reference",
            Self::ReadOnlyField { .. } => "read_only",
            Self::InvalidPayload { .. } => "invalid_payload",
        }
    }

    /// Name of the offending field, when the rule concerns one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::NotPositive { field }
            | Self::Negative { field }
            | Self::OutOfRange { field, .. }
            | Self::Blank { field }
            | Self::InvalidFormat { field, .. }
            | Self::Duplicate { field, .. }
            | Self::MissingReference { field, .. } => Some(field),
            Self::DateOrder { start, .. } => Some(start),
            Self::ReadOnlyField { field } => Some(field.as_str()),
            Self::InvalidPayload { .. } => None,
        }
    }
}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        let details = json!({ "field": value.field(), "code": value.code() });
        let error = match value {
            ValidationError::Duplicate { .. } => Self::conflict(value.to_string()),
            _ => Self::invalid_request(value.to_string()),
        };
        error.with_details(details)
    }
}

/// Require `value > 0`.
///
/// # Errors
/// [`ValidationError::NotPositive`] otherwise, including for NaN.
pub fn ensure_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NotPositive { field })
    }
}

/// Require `value >= 0`.
///
/// # Errors
/// [`ValidationError::Negative`] otherwise, including for NaN.
pub fn ensure_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::Negative { field })
    }
}

/// Require `min <= value <= max`.
///
/// # Errors
/// [`ValidationError::OutOfRange`] otherwise.
pub fn ensure_in_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field, min, max })
    }
}

/// Require non-blank text.
///
/// # Errors
/// [`ValidationError::Blank`] when the trimmed value is empty.
pub fn ensure_not_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Blank { field })
    } else {
        Ok(())
    }
}

/// Require a plausible email address.
///
/// # Errors
/// [`ValidationError::Blank`] or [`ValidationError::InvalidFormat`].
pub fn ensure_email(field: &'static str, value: &str) -> Result<(), ValidationError> {
    ensure_not_blank(field, value)?;
    match value.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field,
            expected: "an email address",
        }),
    }
}

/// Require `start < end`.
///
/// # Errors
/// [`ValidationError::DateOrder`] otherwise.
pub fn ensure_date_order(
    (start_field, start): (&'static str, NaiveDate),
    (end_field, end): (&'static str, NaiveDate),
) -> Result<(), ValidationError> {
    if start < end {
        Ok(())
    } else {
        Err(ValidationError::DateOrder {
            start: start_field,
            end: end_field,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, false)]
    #[case(-1.0, false)]
    #[case(f64::NAN, false)]
    #[case(0.5, true)]
    fn positive_values(#[case] value: f64, #[case] accepted: bool) {
        assert_eq!(ensure_positive("hours", value).is_ok(), accepted);
    }

    #[rstest]
    fn not_positive_message_names_the_field() {
        let err = ensure_positive("hours", 0.0).expect_err("zero rejected");
        assert_eq!(err.to_string(), "hours must be greater than 0");
    }

    #[rstest]
    #[case(-0.1, false)]
    #[case(0.0, true)]
    #[case(100.0, true)]
    #[case(100.5, false)]
    fn range_is_inclusive(#[case] value: f64, #[case] accepted: bool) {
        assert_eq!(ensure_in_range("weighting", value, 0.0, 100.0).is_ok(), accepted);
    }

    #[rstest]
    #[case("ada@example.ac.uk", true)]
    #[case("ada", false)]
    #[case("@example.com", false)]
    #[case("ada@localhost", false)]
    #[case("  ", false)]
    fn email_shapes(#[case] value: &str, #[case] accepted: bool) {
        assert_eq!(ensure_email("email", value).is_ok(), accepted);
    }

    #[rstest]
    fn equal_dates_are_out_of_order() {
        let day = NaiveDate::from_ymd_opt(2024, 9, 1).expect("valid date");
        assert!(ensure_date_order(("startDate", day), ("endDate", day)).is_err());
    }

    #[rstest]
    fn duplicates_map_to_conflict() {
        let err: Error = ValidationError::Duplicate {
            field: "code",
            value: "COMP".to_owned(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(
            err.details(),
            Some(&json!({ "field": "code", "code": "duplicate" }))
        );
    }

    #[rstest]
    fn other_failures_map_to_invalid_request() {
        let err: Error = ValidationError::NotPositive { field: "hours" }.into();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.message(), "hours must be greater than 0");
    }
}
