//! Field validation for loosely-typed request bodies.
//!
//! Each helper returns `None` when the value is missing or malformed; callers
//! turn that into an `AppError::Validation` with their own message.

use serde_json::Value;

use crate::errors::AppError;
use crate::models::PollStatus;

pub const MIN_OPTIONS: usize = 2;
pub const MIN_TIME_LIMIT: u32 = 1;
pub const MAX_TIME_LIMIT: u32 = 60;

/// Run `check` on a required field, failing with `message`.
pub fn require<T>(
    value: &Option<Value>,
    check: impl Fn(Option<&Value>) -> Option<T>,
    message: &str,
) -> Result<T, AppError> {
    check(value.as_ref()).ok_or_else(|| AppError::Validation(message.to_string()))
}

/// Like [`require`], but an absent field is fine.
pub fn optional<T>(
    value: &Option<Value>,
    check: impl Fn(Option<&Value>) -> Option<T>,
    message: &str,
) -> Result<Option<T>, AppError> {
    match value {
        None => Ok(None),
        Some(_) => require(value, check, message).map(Some),
    }
}

/// A string with at least one non-whitespace character, kept as given.
pub fn non_blank_text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Any non-empty string. Used for opaque identifiers.
pub fn identifier(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// At least two option labels, every one non-blank.
pub fn option_texts(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    if items.len() < MIN_OPTIONS {
        return None;
    }
    items.iter().map(|item| non_blank_text(Some(item))).collect()
}

/// A whole number of seconds within the allowed range. `30.0` counts as whole.
pub fn time_limit(value: Option<&Value>) -> Option<u32> {
    let seconds = value?.as_f64()?;
    if seconds.fract() != 0.0
        || seconds < f64::from(MIN_TIME_LIMIT)
        || seconds > f64::from(MAX_TIME_LIMIT)
    {
        return None;
    }
    Some(seconds as u32)
}

/// One of `draft`, `active`, `completed`.
pub fn status(value: Option<&Value>) -> Option<PollStatus> {
    value?.as_str().and_then(PollStatus::parse)
}
