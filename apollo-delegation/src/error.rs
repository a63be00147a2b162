//! Delegation errors.
use std::sync::Arc;

use apollo_compiler::validation::DiagnosticList;
use apollo_compiler::validation::WithErrors;
use displaydoc::Display;
use serde_json_bytes::Value;
use thiserror::Error;
use tower::BoxError;

use crate::delegation_context::OperationKind;
use crate::graphql;
use crate::graphql::Location as ErrorLocation;

pub(crate) const GRAPHQL_VALIDATION_FAILED: &str = "GRAPHQL_VALIDATION_FAILED";
pub(crate) const DELEGATION_COMBINED_ERRORS: &str = "DELEGATION_COMBINED_ERRORS";

/// Error raised while a delegation is prepared or its request is rewritten.
///
/// Anything returned before the executor runs is fatal for the call: nothing is
/// partially delegated.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum DelegationError {
    /// request transform failed: {0}
    Transform(#[from] TransformError),

    /// {0}
    Validation(ValidationError),

    /// {0}
    Caused(Arc<dyn std::error::Error + Send + Sync>),

    /// {0}
    CombinedValidation(CombinedError),

    /// cannot determine the operation of the delegated request
    MissingOperation,

    /// cannot determine the root field of the delegated request
    MissingFieldName,

    /// resolver info is required to delegate a field to a schema
    MissingResolveInfo,

    /// the target schema has no {0} root type
    MissingRootType(OperationKind),

    /// field `{field_name}` does not exist on the {operation} root type of the target schema
    UnknownRootField {
        operation: OperationKind,
        field_name: String,
    },

    /// execution failed: {0}
    Execution(BoxError),
}

/// A transform could not produce a legal rewrite.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum TransformError {
    /// the target schema has no {0} root type
    MissingRootType(OperationKind),

    /// invalid name `{0}` generated while rewriting the request
    InvalidName(String),

    /// cannot rewrite the request: {0}
    Rewrite(String),

    /// schema transform failed: {0}
    Schema(#[from] SchemaError),
}

/// Error in a schema produced or consumed by a transform.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum SchemaError {
    /// GraphQL validation error: {0}
    Validate(ValidationErrors),

    /// {0}
    Invalid(String),
}

/// Collection of schema validation errors.
#[derive(Debug)]
pub struct ValidationErrors {
    pub errors: Vec<apollo_compiler::response::GraphQLError>,
}

impl ValidationErrors {
    pub(crate) fn into_graphql_errors(self) -> Vec<graphql::Error> {
        self.errors
            .into_iter()
            .map(|diagnostic| {
                graphql::Error::builder()
                    .message(diagnostic.message)
                    .locations(
                        diagnostic
                            .locations
                            .iter()
                            .map(|loc| ErrorLocation {
                                line: loc.line as u32,
                                column: loc.column as u32,
                            })
                            .collect(),
                    )
                    .extension_code(GRAPHQL_VALIDATION_FAILED)
                    .build()
            })
            .collect()
    }
}

impl From<DiagnosticList> for ValidationErrors {
    fn from(errors: DiagnosticList) -> Self {
        Self {
            errors: errors.iter().map(|e| e.to_json()).collect(),
        }
    }
}

impl<T> From<WithErrors<T>> for ValidationErrors {
    fn from(WithErrors { errors, .. }: WithErrors<T>) -> Self {
        errors.into()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            if let Some(location) = error.locations.first() {
                write!(
                    f,
                    "[{}:{}] {}",
                    location.line, location.column, error.message
                )?;
            } else {
                write!(f, "{}", error.message)?;
            }
        }
        Ok(())
    }
}

/// A document validation failure, optionally carrying the error that caused it.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct ValidationError {
    pub error: graphql::Error,
    pub original_error: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl ValidationError {
    pub fn new(error: graphql::Error) -> Self {
        Self {
            error,
            original_error: None,
        }
    }

    pub fn with_original_error(
        mut self,
        original_error: impl Into<Arc<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        self.original_error = Some(original_error.into());
        self
    }
}

/// Several errors reported as one.
#[derive(Debug, Clone, Error)]
pub struct CombinedError {
    pub errors: Vec<graphql::Error>,
}

impl CombinedError {
    pub fn new(errors: Vec<graphql::Error>) -> Self {
        Self { errors }
    }

    /// A single GraphQL error whose message joins every message and whose
    /// `extensions.errors` keeps every original error.
    pub fn to_graphql_error(&self) -> graphql::Error {
        graphql::Error::builder()
            .message(self.to_string())
            .extension_code(DELEGATION_COMBINED_ERRORS)
            .extension(
                "errors",
                Value::Array(
                    self.errors
                        .iter()
                        .filter_map(|error| serde_json_bytes::to_value(error).ok())
                        .collect(),
                ),
            )
            .build()
    }
}

impl std::fmt::Display for CombinedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", error.message)?;
        }
        Ok(())
    }
}
