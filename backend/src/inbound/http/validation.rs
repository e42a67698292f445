//! Parsing helpers for path and query parameters.
//!
//! Every failure becomes `400 invalid_request` with `details.field`,
//! `details.value` and `details.code`, matching what domain validation
//! reports for bodies.

use std::str::FromStr;

use serde_json::json;

use crate::domain::Error;
use crate::domain::document::DocumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamErrorCode {
    MissingField,
    InvalidUuid,
    InvalidFlag,
    InvalidNumber,
}

impl ParamErrorCode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidUuid => "invalid_uuid",
            Self::InvalidFlag => "invalid_flag",
            Self::InvalidNumber => "invalid_number",
        }
    }
}

/// Name of the parameter being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub(crate) const fn as_str(self) -> &'static str {
        self.0
    }
}

fn invalid(field: FieldName, value: &str, code: ParamErrorCode, message: String) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "value": value,
        "code": code.as_str(),
    }))
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    Error::invalid_request(format!("missing required field: {name}")).with_details(json!({
        "field": name,
        "code": ParamErrorCode::MissingField.as_str(),
    }))
}

pub(crate) fn parse_id(value: &str, field: FieldName) -> Result<DocumentId, Error> {
    value.parse().map_err(|_| {
        invalid(
            field,
            value,
            ParamErrorCode::InvalidUuid,
            format!("{} must be a valid UUID", field.as_str()),
        )
    })
}

pub(crate) fn parse_flag(value: &str, field: FieldName) -> Result<bool, Error> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(
            field,
            value,
            ParamErrorCode::InvalidFlag,
            format!("{} must be true or false", field.as_str()),
        )),
    }
}

pub(crate) fn parse_count<N: FromStr>(value: &str, field: FieldName) -> Result<N, Error> {
    value.parse().map_err(|_| {
        invalid(
            field,
            value,
            ParamErrorCode::InvalidNumber,
            format!("{} must be a non-negative integer", field.as_str()),
        )
    })
}

/// Query string pairs with lookup by name.
#[derive(Debug, Clone, Default)]
pub(crate) struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    pub(crate) fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn require(&self, field: FieldName) -> Result<&str, Error> {
        self.get(field.as_str())
            .ok_or_else(|| missing_field_error(field))
    }
}
