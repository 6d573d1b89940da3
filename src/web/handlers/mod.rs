pub mod admin;
pub mod auth;
pub mod errors;
pub mod shop;

use validator::ValidationErrors;

/// First validation message, checking fields in form order
pub(crate) fn validation_message(errors: &ValidationErrors, field_order: &[&str]) -> String {
    let field_errors = errors.field_errors();
    field_order
        .iter()
        .filter_map(|field| field_errors.iter().find(|(name, _)| name.to_string() == *field))
        .flat_map(|(_, errors)| errors.iter())
        .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid input.".to_string())
}
