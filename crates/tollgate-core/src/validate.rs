//! Field-level constraints for request schemas
//!
//! Request types implement [`Validate`] by chaining the helpers below.
//! Checks run in declaration order and stop at the first failure, so the
//! reported field is deterministic for a given input.

use std::{fmt::Display, sync::OnceLock};

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{Result, ServiceError};

/// Request schemas that can check their own field constraints
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Check that a string has between `min` and `max` characters
pub fn length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();

    if len < min || len > max {
        return Err(ServiceError::validation(
            field,
            format!("length must be between {min} and {max} characters, got {len}"),
        ));
    }

    if min > 0 && value.trim().is_empty() {
        return Err(ServiceError::validation(field, "must not be blank"));
    }

    Ok(())
}

/// Check that a value lies in the inclusive range `min..=max`
pub fn range<T>(field: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + Display + Copy,
{
    if value < min || value > max {
        return Err(ServiceError::validation(
            field,
            format!("must be between {min} and {max}, got {value}"),
        ));
    }
    Ok(())
}

/// Check that a collection has between `min` and `max` items
pub fn items(field: &str, len: usize, min: usize, max: usize) -> Result<()> {
    if len < min || len > max {
        return Err(ServiceError::validation(
            field,
            format!("must contain between {min} and {max} items, got {len}"),
        ));
    }
    Ok(())
}

/// Check that a string matches a regular expression
pub fn pattern(field: &str, value: &str, regex: &Regex) -> Result<()> {
    if !regex.is_match(value) {
        return Err(ServiceError::validation(
            field,
            format!("must match pattern {}", regex.as_str()),
        ));
    }
    Ok(())
}

/// Check that a string is an absolute `http` or `https` URL
pub fn http_url(field: &str, value: &str) -> Result<()> {
    fn re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("must be valid regex"))
    }

    if !re().is_match(value) {
        return Err(ServiceError::validation(field, "must be an absolute http(s) URL"));
    }
    Ok(())
}

/// Deserialize JSON arguments into a request type and validate it
///
/// Shape errors (missing fields, wrong types) are reported as validation
/// failures so REST and MCP callers see the same error kind.
pub fn parse_arguments<T>(arguments: serde_json::Value) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let arguments = match arguments {
        serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
        other => other,
    };

    let request: T = serde_json::from_value(arguments).map_err(|e| deserialize_error(&e))?;
    request.validate()?;
    Ok(request)
}

/// Convert a serde shape error into a validation error naming the field
pub fn deserialize_error(error: &serde_json::Error) -> ServiceError {
    fn re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"field `([^`]+)`").expect("must be valid regex"))
    }

    let message = error.to_string();
    let field = re()
        .captures(&message)
        .and_then(|c| c.get(1))
        .map_or_else(|| "body".to_string(), |m| m.as_str().to_string());

    ServiceError::validation(field, message)
}
