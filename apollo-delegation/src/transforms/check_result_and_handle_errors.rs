use std::collections::HashMap;

use apollo_compiler::ast;

use crate::delegation_context::DelegationContext;
use crate::error::CombinedError;
use crate::graphql;
use crate::graphql::Response;
use crate::json_ext::Path;
use crate::json_ext::Value;
use crate::selection::Projection;
use crate::transform::Transform;
use crate::transform::TransformContext;

/// Extracts the delegated field from the subschema's result and locates its errors in
/// the caller's response.
///
/// This is the first stage of every chain, so on the way back it runs last and
/// decides the final shape of the result: `data` becomes the value of the delegated
/// field, projected onto what the caller selected.
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckResultAndHandleErrors;

impl Transform for CheckResultAndHandleErrors {
    fn name(&self) -> &str {
        "CheckResultAndHandleErrors"
    }

    fn transform_result(
        &self,
        result: Response,
        _transform_context: &TransformContext,
        delegation_context: &DelegationContext,
    ) -> Response {
        check_result_and_handle_errors(result, delegation_context)
    }
}

pub(crate) fn check_result_and_handle_errors(
    result: Response,
    delegation_context: &DelegationContext,
) -> Response {
    let Response {
        data,
        errors,
        mut extensions,
    } = result;
    let response_key = delegation_context.response_key();
    let value = data
        .as_ref()
        .and_then(|data| data.as_object())
        .and_then(|data| data.get(response_key.as_str()))
        .cloned()
        .unwrap_or(Value::Null);
    let base_path = delegation_context
        .info
        .as_ref()
        .map(|info| info.path.clone());
    let relocate = |error: &graphql::Error| relocated(error, base_path.as_ref());

    if value.is_null() {
        let errors = match errors.len() {
            0 => Vec::new(),
            1 => vec![relocate(&errors[0])],
            _ => {
                let combined =
                    CombinedError::new(errors.iter().map(relocate).collect()).to_graphql_error();
                vec![combined.with_path(base_path.clone())]
            }
        };
        return Response::builder()
            .data(Value::Null)
            .errors(errors)
            .extensions(extensions)
            .build();
    }

    // a pathed error stays located even when an ancestor came back null
    let (located, unpathed): (Vec<_>, Vec<_>) = errors
        .into_iter()
        .partition(|error| error.path.as_ref().is_some_and(|path| !path.is_empty()));
    let mut errors = located.iter().map(relocate).collect::<Vec<_>>();
    if !unpathed.is_empty() {
        if delegation_context.skip_type_merging {
            errors.extend(
                unpathed
                    .iter()
                    .map(|error| error.with_path(base_path.clone())),
            );
        } else {
            tracing::debug!(
                count = unpathed.len(),
                "keeping errors without a path for type merging"
            );
            let unpathed = unpathed
                .into_iter()
                .map(|mut error| {
                    if let Some(name) = delegation_context.subschema.name() {
                        error.extensions.insert("subschema", Value::from(name));
                    }
                    serde_json_bytes::to_value(error).unwrap_or(Value::Null)
                })
                .collect::<Vec<_>>();
            extensions.insert("unpathedErrors", Value::Array(unpathed));
        }
    }

    Response::builder()
        .data(project(value, delegation_context))
        .errors(errors)
        .extensions(extensions)
        .build()
}

/// Moves an error from the subschema's response to the caller's: the delegated root
/// field at the head of its path is replaced by the caller's path.
fn relocated(error: &graphql::Error, base_path: Option<&Path>) -> graphql::Error {
    match (base_path, &error.path) {
        (Some(base_path), Some(path)) => {
            error.with_path(Some(base_path.join(path.iter().skip(1).cloned())))
        }
        (Some(base_path), None) => error.with_path(Some(base_path.clone())),
        (None, _) => error.clone(),
    }
}

/// Hides what the chain added to the request, such as merge keys and `__typename`.
fn project(value: Value, delegation_context: &DelegationContext) -> Value {
    if !matches!(value, Value::Object(_) | Value::Array(_)) {
        return value;
    }
    let request = &delegation_context.original_request;
    let Some(root_field) = request.root_field() else {
        return value;
    };
    if root_field.selection_set.is_empty() {
        return value;
    }
    let schema = delegation_context
        .source_schema()
        .unwrap_or(&delegation_context.transformed_schema);
    let fragments = request
        .document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            ast::Definition::FragmentDefinition(fragment) => {
                Some((fragment.name.clone(), fragment.clone()))
            }
            _ => None,
        })
        .collect::<HashMap<_, _>>();
    let return_type = delegation_context.return_type.inner_named_type();
    Projection::new(schema, &fragments, &request.variables).project(
        &value,
        &root_field.selection_set,
        Some(return_type.as_str()),
    )
}
