//! Input shape checks applied on the publish path.
//!
//! Both functions are pure. Authorization is not checked here; that happens
//! downstream in the event consumer.

use std::borrow::Cow;

use crate::error::CoreError;

/// A value is blank when it is empty or contains only whitespace.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Fail with `CoreError::Validation(message)` on the first blank value.
pub fn require_non_blank(values: &[&str], message: &str) -> Result<(), CoreError> {
    if values.iter().any(|v| is_blank(v)) {
        return Err(CoreError::Validation(message.to_string()));
    }
    Ok(())
}

/// Cut `value` down to at most `max_length` characters.
///
/// Lengths are counted in `char`s, so the result is always valid UTF-8 and
/// never ends in a partial character. Over-long input is shortened silently.
pub fn truncate(value: &str, max_length: usize) -> Cow<'_, str> {
    match value.char_indices().nth(max_length) {
        Some((byte_idx, _)) => Cow::Owned(value[..byte_idx].to_string()),
        None => Cow::Borrowed(value),
    }
}
