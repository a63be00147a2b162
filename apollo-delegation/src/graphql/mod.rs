//! The GraphQL wire types exchanged with subschemas.

mod request;
mod response;

use std::fmt;
use std::pin::Pin;

use apollo_compiler::response::GraphQLError as CompilerExecutionError;
use apollo_compiler::response::ResponseDataPathSegment;
use futures::Stream;
pub use request::Request;
pub use response::Response;
use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::PathElement;

/// An asynchronous [`Stream`] of GraphQL [`Response`]s, as produced by a subscription.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Response> + Send>>;

/// A line and column in the document an error was reported against.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// A [GraphQL error](https://spec.graphql.org/October2021/#sec-Errors)
/// as may be found in the `errors` field of a GraphQL [`Response`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[non_exhaustive]
pub struct Error {
    /// The error message.
    pub message: String,

    /// The locations of the error in the GraphQL document of the originating request.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,

    /// If this is a field error, the JSON path to that field in [`Response::data`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Path>,

    /// The optional GraphQL extensions for this error.
    #[serde(skip_serializing_if = "Object::is_empty")]
    pub extensions: Object,
}

#[buildstructor::buildstructor]
impl Error {
    /// Builds an error from a `message`, plus any `locations`, `path` and `extensions`.
    /// `extension_code` fills in `extensions.code` unless it is already set.
    #[builder(visibility = "pub")]
    fn new(
        message: String,
        locations: Vec<Location>,
        path: Option<Path>,
        extension_code: Option<String>,
        // Skip the `Object` type alias in order to use buildstructor's map special-casing
        mut extensions: JsonMap<ByteString, Value>,
    ) -> Self {
        if let Some(code) = extension_code {
            extensions
                .entry("code")
                .or_insert(Value::String(ByteString::from(code)));
        }
        Self {
            message,
            locations,
            path,
            extensions,
        }
    }

    /// `extensions.code`, when it is a string or a number.
    pub fn extension_code(&self) -> Option<String> {
        self.extensions.get("code").and_then(|c| match c {
            Value::String(s) => Some(s.as_str().to_owned()),
            Value::Number(n) => Some(n.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Bool(_) => None,
        })
    }

    /// Returns a copy of this error with its path replaced.
    pub fn with_path(&self, path: Option<Path>) -> Self {
        Self {
            path,
            ..self.clone()
        }
    }
}

/// Displays (only) the error message.
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl From<CompilerExecutionError> for Error {
    fn from(error: CompilerExecutionError) -> Self {
        let CompilerExecutionError {
            message,
            locations,
            path,
            extensions,
        } = error;
        let locations = locations
            .into_iter()
            .map(|location| Location {
                line: location.line as u32,
                column: location.column as u32,
            })
            .collect::<Vec<_>>();
        let path = if !path.is_empty() {
            let elements = path
                .into_iter()
                .map(|element| match element {
                    ResponseDataPathSegment::Field(name) => {
                        PathElement::Key(name.as_str().to_owned())
                    }
                    ResponseDataPathSegment::ListIndex(i) => PathElement::Index(i),
                })
                .collect();
            Some(Path(elements))
        } else {
            None
        };
        Self {
            message,
            locations,
            path,
            extensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn builder_sets_extension_code_once() {
        let error = Error::builder()
            .message("boom")
            .extension("code", "ALREADY_SET")
            .extension_code("IGNORED")
            .build();
        assert_eq!(error.extension_code().as_deref(), Some("ALREADY_SET"));

        let error = Error::builder()
            .message("boom")
            .extension_code("GRAPHQL_VALIDATION_FAILED")
            .build();
        assert_eq!(
            serde_json_bytes::to_value(&error).unwrap(),
            json!({"message": "boom", "extensions": {"code": "GRAPHQL_VALIDATION_FAILED"}})
        );
    }

    #[test]
    fn deserializes_path() {
        let error: Error = serde_json::from_str(
            r#"{"message": "oops", "path": ["client", 0, "name"], "locations": [{"line": 1, "column": 3}]}"#,
        )
        .unwrap();
        assert_eq!(
            error.path,
            Some(Path(vec![
                PathElement::Key("client".to_string()),
                PathElement::Index(0),
                PathElement::Key("name".to_string()),
            ]))
        );
        assert_eq!(error.locations, vec![Location { line: 1, column: 3 }]);
    }
}
