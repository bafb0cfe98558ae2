//! Input validation utilities.
//!
//! Centralized validation helpers used by the gateway's client-facing payloads.

use validator::Validate;

use crate::error::AtriumError;

/// Validate a request body, returning an AtriumError::Validation on failure.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), AtriumError> {
    body.validate().map_err(|e| AtriumError::Validation {
        message: format_validation_errors(e),
    })
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{field}'"))
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a display name shown to other room occupants.
pub fn validate_display_name(name: &str) -> Result<(), AtriumError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AtriumError::Validation {
            message: "Display name cannot be empty or whitespace only".into(),
        });
    }
    if trimmed.chars().count() > 32 {
        return Err(AtriumError::Validation {
            message: "Display name must be at most 32 characters".into(),
        });
    }
    Ok(())
}
