//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Validates a channel handle.
///
/// Requirements:
/// - Only ASCII alphanumeric characters, underscores, dots and hyphens
/// - 3-30 characters in length
pub fn validate_user_name(user_name: &str) -> Result<(), ValidationError> {
    let len = user_name.chars().count();
    if !(3..=30).contains(&len) {
        return Err(ValidationError::new("user_name_invalid_length"));
    }

    if !user_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(ValidationError::new("user_name_invalid_characters"));
    }

    Ok(())
}

/// Rejects values that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
