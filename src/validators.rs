/// Request field validation
///
/// Registration and login only require fields to be present and non-empty;
/// email format and password strength are deliberately not checked.

use crate::error::ValidationError;

/// Return the field's value, or `MissingField` if it is absent or empty
pub fn required_field(name: &str, value: Option<&str>) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::MissingField(name.to_string())),
    }
}

/// Parse an optional positive integer query parameter, falling back to
/// `default` when absent or not a number
pub fn int_param(value: Option<&str>, default: u32) -> u32 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|v| v.clamp(0, i64::from(u32::MAX)) as u32)
        .unwrap_or(default)
}
