//! Request body validation.

use kublade_core::error::CoreError;
use validator::Validate;

use crate::error::AppError;

/// Validate a request body, mapping failures to [`CoreError::Validation`].
pub fn validate_request<T: Validate>(body: &T) -> Result<(), AppError> {
    body.validate()
        .map_err(|e| AppError::Core(CoreError::Validation(format_validation_errors(&e))))
}

/// Flatten validator errors into one `; `-separated message, sorted by field.
fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
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
