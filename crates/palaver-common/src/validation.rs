//! Input validation utilities.
//!
//! Centralized validation helpers used before anything is sent to the relay
//! or the REST API.

use validator::Validate;

use crate::error::PalaverError;

/// Validate an outbound payload, returning a PalaverError::Validation on failure.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), PalaverError> {
    body.validate().map_err(|e| PalaverError::Validation {
        message: format_validation_errors(e),
    })
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    let mut messages = errors
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
        .collect::<Vec<_>>();
    messages.sort();
    messages.join("; ")
}

/// Case-insensitive substring match used by roster search.
///
/// An empty (or whitespace-only) filter matches everything.
pub fn matches_filter(username: &str, filter: &str) -> bool {
    let filter = filter.trim();
    filter.is_empty() || username.to_lowercase().contains(&filter.to_lowercase())
}
