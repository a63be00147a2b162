//! The executor and subscriber used for subschemas that do not bring their own.
//!
//! Both run in process against the subschema's schema. Field values are read from a
//! JSON root value: a missing key resolves to `null`, and an object's `__typename`
//! key selects its concrete type.

use std::collections::HashMap;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::ast;
use apollo_compiler::resolvers::Execution;
use apollo_compiler::resolvers::FieldError;
use apollo_compiler::resolvers::ObjectValue;
use apollo_compiler::resolvers::ResolveInfo;
use apollo_compiler::resolvers::ResolvedValue;
use apollo_compiler::validation::Valid;
use futures::FutureExt;
use futures::future::BoxFuture;
use tower::BoxError;

use crate::error::ValidationErrors;
use crate::graphql;
use crate::graphql::Response;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::schema::Schema;
use crate::selection::Projection;
use crate::subschema::ExecutionParams;
use crate::subschema::Executor;
use crate::subschema::ExecutorResult;
use crate::subschema::Subscriber;
use crate::subschema::SubscriptionResult;

/// Executes queries and mutations synchronously over a JSON root value.
#[derive(Clone, Debug)]
pub struct DefaultExecutor {
    schema: Schema,
    root_value: Object,
}

impl DefaultExecutor {
    pub fn new(schema: Schema, root_value: Object) -> Self {
        Self { schema, root_value }
    }
}

impl Executor for DefaultExecutor {
    fn execute(&self, params: ExecutionParams) -> Result<ExecutorResult, BoxError> {
        Ok(ExecutorResult::Sync(execute(
            &self.schema,
            &params.document,
            &params.variables,
            &self.root_value,
        )))
    }
}

/// Subscribes by reading the subscription field from a JSON root value: a list is
/// streamed one event per element, anything else is a single result.
#[derive(Clone, Debug)]
pub struct DefaultSubscriber {
    schema: Schema,
    root_value: Object,
}

impl DefaultSubscriber {
    pub fn new(schema: Schema, root_value: Object) -> Self {
        Self { schema, root_value }
    }
}

impl Subscriber for DefaultSubscriber {
    fn subscribe(
        &self,
        params: ExecutionParams,
    ) -> BoxFuture<'static, Result<SubscriptionResult, BoxError>> {
        let result = subscribe(&self.schema, &params.document, &params.variables, &self.root_value);
        futures::future::ready(Ok(result)).boxed()
    }
}

fn validate(
    schema: &Schema,
    document: &ast::Document,
) -> Result<Valid<ExecutableDocument>, Vec<graphql::Error>> {
    document
        .to_executable_validate(schema.definitions())
        .map_err(|errors| ValidationErrors::from(errors).into_graphql_errors())
}

fn errors_response(errors: Vec<graphql::Error>) -> Response {
    Response::builder().errors(errors).build()
}

pub(crate) fn execute(
    schema: &Schema,
    document: &ast::Document,
    variables: &Object,
    root_value: &Object,
) -> Response {
    let document = match validate(schema, document) {
        Ok(document) => document,
        Err(errors) => return errors_response(errors),
    };
    let operation = match document.operations.get(None) {
        Ok(operation) => operation,
        Err(error) => return errors_response(vec![error.to_graphql_error(&document.sources).into()]),
    };
    let root = JsonResolver {
        type_name: operation.selection_set.ty.as_str(),
        object: root_value,
    };
    let result = Execution::new(schema.definitions(), &document)
        .operation(operation)
        .raw_variable_values(variables)
        .execute_sync(&root);
    match result {
        Ok(response) => Response::builder()
            .and_data(response.data.map(Value::Object))
            .errors(response.errors.into_iter().map(Into::into).collect())
            .build(),
        Err(request_error) => {
            errors_response(vec![request_error.to_graphql_error(&document.sources).into()])
        }
    }
}

fn subscribe(
    schema: &Schema,
    document: &ast::Document,
    variables: &Object,
    root_value: &Object,
) -> SubscriptionResult {
    let executable = match validate(schema, document) {
        Ok(document) => document,
        Err(errors) => return SubscriptionResult::Response(errors_response(errors)),
    };
    let operation = match executable.operations.get(None) {
        Ok(operation) => operation,
        Err(error) => {
            return SubscriptionResult::Response(errors_response(vec![
                error.to_graphql_error(&executable.sources).into(),
            ]));
        }
    };
    let root_type = operation.selection_set.ty.clone();
    let Some(ast_operation) = document
        .definitions
        .iter()
        .find_map(|definition| match definition {
            ast::Definition::OperationDefinition(operation) => Some(operation),
            _ => None,
        })
    else {
        return SubscriptionResult::Response(Response::default());
    };
    let Some(field) = ast_operation
        .selection_set
        .iter()
        .find_map(|selection| match selection {
            ast::Selection::Field(field) => Some(field),
            _ => None,
        })
    else {
        return SubscriptionResult::Response(Response::default());
    };
    let fragments: HashMap<_, _> = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            ast::Definition::FragmentDefinition(fragment) => {
                Some((fragment.name.clone(), fragment.clone()))
            }
            _ => None,
        })
        .collect();

    let response_key = field.alias.as_ref().unwrap_or(&field.name).to_string();
    let field_type = schema
        .field_type(&root_type, &field.name)
        .map(|ty| ty.inner_named_type().clone());
    let projection = Projection::new(schema, &fragments, variables);
    let event = |value: &Value| {
        let mut data = Object::new();
        data.insert(
            response_key.clone(),
            projection.project(value, &field.selection_set, field_type.as_deref()),
        );
        Response::builder().data(Value::Object(data)).build()
    };

    match root_value.get(field.name.as_str()) {
        Some(Value::Array(events)) => {
            let events = events.iter().map(event).collect::<Vec<_>>();
            SubscriptionResult::Stream(Box::pin(futures::stream::iter(events)))
        }
        Some(value) => SubscriptionResult::Response(event(value)),
        None => SubscriptionResult::Response(event(&Value::Null)),
    }
}

struct JsonResolver<'a> {
    type_name: &'a str,
    object: &'a Object,
}

impl ObjectValue for JsonResolver<'_> {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn resolve_field<'a>(
        &'a self,
        info: &'a ResolveInfo<'a>,
    ) -> Result<ResolvedValue<'a>, FieldError> {
        match self.object.get(info.field_name()) {
            Some(value) => resolve_value(value, info),
            None => Ok(ResolvedValue::leaf(Value::Null)),
        }
    }
}

fn resolve_value<'a>(
    value: &'a Value,
    info: &'a ResolveInfo<'a>,
) -> Result<ResolvedValue<'a>, FieldError> {
    match value {
        Value::Object(object) => Ok(ResolvedValue::object(JsonResolver {
            type_name: object
                .get("__typename")
                .and_then(|typename| typename.as_str())
                .unwrap_or_else(|| info.field_definition().ty.inner_named_type()),
            object,
        })),
        Value::Array(values) => Ok(ResolvedValue::List(Box::new(
            values.iter().map(move |value| resolve_value(value, info)),
        ))),
        leaf => Ok(ResolvedValue::leaf(leaf.clone())),
    }
}
