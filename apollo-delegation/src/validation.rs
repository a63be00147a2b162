//! Validation of delegated documents against their target schema.

use apollo_compiler::ast;

use crate::error::CombinedError;
use crate::error::DelegationError;
use crate::error::ValidationError;
use crate::error::ValidationErrors;
use crate::schema::Schema;

/// Validates `document` against `schema`, returning every error found.
pub fn validate(schema: &Schema, document: &ast::Document) -> Vec<ValidationError> {
    match document.to_executable_validate(schema.definitions()) {
        Ok(_) => Vec::new(),
        Err(errors) => ValidationErrors::from(errors)
            .into_graphql_errors()
            .into_iter()
            .map(ValidationError::new)
            .collect(),
    }
}

/// Turns validation errors into the single error a delegation fails with.
///
/// A lone error surfaces the error that caused it when there is one, and itself
/// otherwise; several errors are combined into one.
pub fn surface_validation_errors(mut errors: Vec<ValidationError>) -> Result<(), DelegationError> {
    match errors.len() {
        0 => Ok(()),
        1 => {
            let error = errors.remove(0);
            tracing::debug!(error = %error, "delegated document failed validation");
            match error.original_error {
                Some(original_error) => Err(DelegationError::Caused(original_error)),
                None => Err(DelegationError::Validation(error)),
            }
        }
        count => {
            tracing::debug!(count, "delegated document failed validation");
            Err(DelegationError::CombinedValidation(CombinedError::new(
                errors.into_iter().map(|error| error.error).collect(),
            )))
        }
    }
}
