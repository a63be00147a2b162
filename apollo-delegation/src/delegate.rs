//! The delegation engine.

use std::fmt;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::ast;
use futures::FutureExt;
use futures::StreamExt;
use futures::future::BoxFuture;
use tracing::Instrument;

use crate::context::Context;
use crate::delegation_context::DelegationContext;
use crate::delegation_context::OperationKind;
use crate::error::DelegationError;
use crate::error::TransformError;
use crate::executor::DefaultExecutor;
use crate::executor::DefaultSubscriber;
use crate::graphql::Request;
use crate::graphql::Response;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::request::create_request_from_info;
use crate::request::delegating_operation;
use crate::resolve_info::ResolveInfo;
use crate::schema::Schema;
use crate::subschema::ExecutionParams;
use crate::subschema::Executor;
use crate::subschema::ExecutorResult;
use crate::subschema::Subschema;
use crate::subschema::Subscriber;
use crate::subschema::SubscriptionResult;
use crate::transform::Transform;
use crate::transform::TransformContext;
use crate::transform::pair_with_schemas;
use crate::transform::transformed_schemas;
use crate::transformer::TransformChain;
use crate::transforms::AddArgumentsAsVariables;
use crate::transforms::AddFragmentsByField;
use crate::transforms::AddSelectionSetsByField;
use crate::transforms::AddSelectionSetsByType;
use crate::transforms::AddTypenameToAbstract;
use crate::transforms::CheckResultAndHandleErrors;
use crate::transforms::ExpandAbstractTypes;
use crate::transforms::FilterToSchema;
use crate::transforms::WrapConcreteTypes;
use crate::validation::surface_validation_errors;
use crate::validation::validate;

/// A request to delegate to a subschema.
pub struct DelegateRequest {
    pub request: Request,
    pub subschema: Subschema,
    pub operation: Option<OperationKind>,
    pub field_name: Option<String>,
    pub args: Option<Object>,
    pub context: Option<Context>,
    pub info: Option<Arc<ResolveInfo>>,
    pub return_type: Option<ast::Type>,
    pub root_value: Option<Object>,
    /// Applied after the subschema's own transforms.
    pub transforms: Vec<Arc<dyn Transform>>,
    pub transformed_schema: Option<Schema>,
    pub transformed_schemas: Vec<Schema>,
    pub skip_validation: bool,
    pub skip_type_merging: bool,
}

#[buildstructor::buildstructor]
impl DelegateRequest {
    #[builder(visibility = "pub")]
    #[allow(clippy::too_many_arguments)]
    fn new(
        request: Request,
        subschema: Subschema,
        operation: Option<OperationKind>,
        field_name: Option<String>,
        args: Option<Object>,
        context: Option<Context>,
        info: Option<Arc<ResolveInfo>>,
        return_type: Option<ast::Type>,
        root_value: Option<Object>,
        transforms: Vec<Arc<dyn Transform>>,
        transformed_schema: Option<Schema>,
        transformed_schemas: Option<Vec<Schema>>,
        skip_validation: Option<bool>,
        skip_type_merging: Option<bool>,
    ) -> Self {
        Self {
            request,
            subschema,
            operation,
            field_name,
            args,
            context,
            info,
            return_type,
            root_value,
            transforms,
            transformed_schema,
            transformed_schemas: transformed_schemas.unwrap_or_default(),
            skip_validation: skip_validation.unwrap_or_default(),
            skip_type_merging: skip_type_merging.unwrap_or_default(),
        }
    }
}

/// A delegation of the field being resolved, described by its resolver info.
///
/// The operation defaults to the one the field's parent type belongs to, and the
/// field name and return type to the field's own.
pub struct DelegateToSchema {
    pub subschema: Subschema,
    pub info: Option<Arc<ResolveInfo>>,
    pub operation: Option<OperationKind>,
    pub field_name: Option<String>,
    pub args: Option<Object>,
    pub context: Option<Context>,
    pub return_type: Option<ast::Type>,
    pub root_value: Option<Object>,
    pub transforms: Vec<Arc<dyn Transform>>,
    pub transformed_schema: Option<Schema>,
    pub skip_validation: bool,
    pub skip_type_merging: bool,
}

#[buildstructor::buildstructor]
impl DelegateToSchema {
    #[builder(visibility = "pub")]
    #[allow(clippy::too_many_arguments)]
    fn new(
        subschema: Subschema,
        info: Option<Arc<ResolveInfo>>,
        operation: Option<OperationKind>,
        field_name: Option<String>,
        args: Option<Object>,
        context: Option<Context>,
        return_type: Option<ast::Type>,
        root_value: Option<Object>,
        transforms: Vec<Arc<dyn Transform>>,
        transformed_schema: Option<Schema>,
        skip_validation: Option<bool>,
        skip_type_merging: Option<bool>,
    ) -> Self {
        Self {
            subschema,
            info,
            operation,
            field_name,
            args,
            context,
            return_type,
            root_value,
            transforms,
            transformed_schema,
            skip_validation: skip_validation.unwrap_or_default(),
            skip_type_merging: skip_type_merging.unwrap_or_default(),
        }
    }
}

/// What a delegation produces.
pub enum DelegationResult {
    /// The backend answered synchronously; the result is already transformed back.
    Response(Response),
    /// The backend answers later; the future resolves to the transformed result.
    Future(BoxFuture<'static, Result<Response, DelegationError>>),
    /// A subscription: one transformed result, or a stream of them.
    Subscription(BoxFuture<'static, Result<SubscriptionResult, DelegationError>>),
}

impl DelegationResult {
    /// Waits for the result of a query or mutation, or for the single result of a
    /// subscription. A subscription stream yields its first event.
    pub async fn into_response(self) -> Result<Response, DelegationError> {
        match self {
            DelegationResult::Response(response) => Ok(response),
            DelegationResult::Future(future) => future.await,
            DelegationResult::Subscription(future) => match future.await? {
                SubscriptionResult::Response(response) => Ok(response),
                SubscriptionResult::Stream(mut stream) => {
                    Ok(stream.next().await.unwrap_or_default())
                }
            },
        }
    }
}

impl fmt::Debug for DelegationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelegationResult::Response(response) => {
                f.debug_tuple("Response").field(response).finish()
            }
            DelegationResult::Future(_) => f.write_str("Future"),
            DelegationResult::Subscription(_) => f.write_str("Subscription"),
        }
    }
}

/// Delegates the field being resolved to `subschema`.
pub fn delegate_to_schema(
    options: DelegateToSchema,
) -> Result<DelegationResult, DelegationError> {
    let DelegateToSchema {
        subschema,
        info,
        operation,
        field_name,
        args,
        context,
        return_type,
        root_value,
        transforms,
        transformed_schema,
        skip_validation,
        skip_type_merging,
    } = options;
    let info = info.ok_or(DelegationError::MissingResolveInfo)?;
    let operation =
        operation.unwrap_or_else(|| delegating_operation(&info.parent_type, &info.schema));
    let field_name = match field_name {
        Some(field_name) => parse_name(field_name)?,
        None => info.field_name.clone(),
    };
    let request = create_request_from_info(&info, operation, &field_name);

    delegate_request(
        DelegateRequest::builder()
            .request(request)
            .subschema(subschema)
            .operation(operation)
            .field_name(field_name.to_string())
            .and_args(args)
            .and_context(context)
            .info(info)
            .and_return_type(return_type)
            .and_root_value(root_value)
            .transforms(transforms)
            .and_transformed_schema(transformed_schema)
            .skip_validation(skip_validation)
            .skip_type_merging(skip_type_merging)
            .build(),
    )
}

/// Delegates `request` to a subschema.
///
/// The request is rewritten through the transform chain, validated against the
/// subschema's schema and executed; the result is rewritten back through the chain in
/// reverse. Everything that can fail before execution fails here.
pub fn delegate_request(options: DelegateRequest) -> Result<DelegationResult, DelegationError> {
    let DelegateRequest {
        request,
        subschema,
        operation,
        field_name,
        args,
        context,
        info,
        return_type,
        root_value,
        transforms: extra_transforms,
        transformed_schema,
        transformed_schemas: caller_schemas,
        skip_validation,
        skip_type_merging,
    } = options;

    let operation = match operation {
        Some(operation) => operation,
        None => request
            .operation()
            .map(|operation| OperationKind::from(operation.operation_type))
            .ok_or(DelegationError::MissingOperation)?,
    };
    let field_name = match field_name {
        Some(field_name) => parse_name(field_name)?,
        None => request
            .root_field()
            .map(|field| field.name.clone())
            .ok_or(DelegationError::MissingFieldName)?,
    };
    let span = tracing::debug_span!(
        "delegate",
        subschema = subschema.name().unwrap_or("<schema>"),
        operation = %operation,
        field = %field_name,
    );
    let _guard = span.enter();

    // backend
    let target_schema = subschema.schema().clone();
    let root_value = root_value
        .or_else(|| subschema.config().and_then(|config| config.root_value.clone()))
        .or_else(|| info.as_ref().and_then(|info| info.root_value.clone()))
        .unwrap_or_default();
    let mut transforms = subschema.transforms().to_vec();
    transforms.extend(extra_transforms.iter().cloned());

    // schema chain
    let chain_schemas = if !caller_schemas.is_empty() {
        caller_schemas.clone()
    } else if extra_transforms.is_empty() {
        match subschema.config() {
            Some(config) => config.transformed_schemas().to_vec(),
            None => vec![target_schema.clone()],
        }
    } else {
        transformed_schemas(&target_schema, &transforms)?
    };
    let stitched_schema = info
        .as_ref()
        .and_then(|info| info.schema.stitching_info())
        .zip(subschema.name())
        .and_then(|(stitching_info, name)| stitching_info.transformed_schemas.get(name).cloned());
    let transformed_schema = stitched_schema
        .or_else(|| caller_schemas.first().cloned())
        .or(transformed_schema)
        .or_else(|| chain_schemas.first().cloned());

    // return type
    let return_type = match return_type.or_else(|| info.as_ref().map(|info| info.return_type.clone()))
    {
        Some(return_type) => return_type,
        None => {
            let root_type = target_schema
                .root_operation(operation)
                .ok_or(DelegationError::MissingRootType(operation))?;
            target_schema
                .field_type(root_type, &field_name)
                .ok_or_else(|| DelegationError::UnknownRootField {
                    operation,
                    field_name: field_name.to_string(),
                })?
        }
    };

    let delegation_context = DelegationContext::builder()
        .subschema(subschema.clone())
        .operation(operation)
        .field_name(field_name.clone())
        .and_args(args)
        .and_context(context)
        .and_info(info)
        .return_type(return_type)
        .transforms(transforms)
        .and_transformed_schema(transformed_schema)
        .transformed_schemas(chain_schemas)
        .skip_type_merging(skip_type_merging)
        .original_request(request.clone())
        .build();

    let chain = build_chain(&delegation_context);
    tracing::trace!(stages = ?chain.names(), "built transform chain");
    let request = chain.transform_request(request, &delegation_context)?;

    if !skip_validation {
        surface_validation_errors(validate(&target_schema, &request.document))?;
    }

    let params = ExecutionParams {
        document: request.document,
        variables: request.variables,
        context: delegation_context.context.clone(),
        info: delegation_context.info.clone(),
    };

    if operation == OperationKind::Subscription {
        let subscriber: Arc<dyn Subscriber> = match subschema
            .config()
            .and_then(|config| config.subscriber.clone())
        {
            Some(subscriber) => subscriber,
            None => Arc::new(DefaultSubscriber::new(target_schema, root_value)),
        };
        let subscription = subscriber.subscribe(params);
        let future = async move {
            let result = subscription.await.map_err(DelegationError::Execution)?;
            Ok::<_, DelegationError>(transform_subscription_result(
                result,
                chain,
                delegation_context,
            ))
        };
        return Ok(DelegationResult::Subscription(
            future.instrument(span.clone()).boxed(),
        ));
    }

    let executor: Arc<dyn Executor> = match subschema
        .config()
        .and_then(|config| config.executor.clone())
    {
        Some(executor) => executor,
        None => Arc::new(DefaultExecutor::new(target_schema, root_value)),
    };
    match executor
        .execute(params)
        .map_err(DelegationError::Execution)?
    {
        ExecutorResult::Sync(response) => Ok(DelegationResult::Response(
            chain.transform_result(response, &delegation_context),
        )),
        ExecutorResult::Async(execution) => {
            let future = async move {
                let response = execution.await.map_err(DelegationError::Execution)?;
                Ok::<_, DelegationError>(chain.transform_result(response, &delegation_context))
            };
            Ok(DelegationResult::Future(
                future.instrument(span.clone()).boxed(),
            ))
        }
    }
}

/// The stages of one delegation, in request order.
fn build_chain(delegation_context: &DelegationContext) -> TransformChain {
    let has_stitching_info = delegation_context.stitching_info.is_some();
    let mut chain = TransformChain::new();
    chain.add_transform(
        Arc::new(CheckResultAndHandleErrors),
        TransformContext::default(),
    );
    if has_stitching_info {
        chain
            .add_transform(Arc::new(AddSelectionSetsByField), TransformContext::default())
            .add_transform(Arc::new(AddSelectionSetsByType), TransformContext::default());
    } else {
        tracing::debug!("no stitching info, skipping selection set stages");
    }
    chain.add_transform(Arc::new(WrapConcreteTypes), TransformContext::default());
    if delegation_context.info.is_some() {
        chain.add_transform(Arc::new(ExpandAbstractTypes), TransformContext::default());
    }
    for (transform, transform_context) in pair_with_schemas(
        &delegation_context.transforms,
        &delegation_context.transformed_schemas,
    ) {
        chain.add_transform(transform, transform_context);
    }
    if has_stitching_info {
        chain.add_transform(Arc::new(AddFragmentsByField), TransformContext::default());
    }
    if delegation_context.args.is_some() {
        chain.add_transform(
            Arc::new(AddArgumentsAsVariables),
            TransformContext::default(),
        );
    }
    chain
        .add_transform(Arc::new(FilterToSchema), TransformContext::default())
        .add_transform(Arc::new(AddTypenameToAbstract), TransformContext::default());
    chain
}

fn transform_subscription_result(
    result: SubscriptionResult,
    chain: TransformChain,
    delegation_context: DelegationContext,
) -> SubscriptionResult {
    match result {
        SubscriptionResult::Response(response) => SubscriptionResult::Response(
            chain.transform_result(response, &delegation_context),
        ),
        SubscriptionResult::Stream(stream) => {
            let key = delegation_context.field_name.to_string();
            let stream = stream.map(move |event| {
                let Response {
                    data,
                    errors,
                    extensions,
                } = chain.transform_result(event, &delegation_context);
                let mut keyed = Object::new();
                keyed.insert(key.clone(), data.unwrap_or(Value::Null));
                Response::builder()
                    .data(Value::Object(keyed))
                    .errors(errors)
                    .extensions(extensions)
                    .build()
            });
            SubscriptionResult::Stream(Box::pin(stream))
        }
    }
}

fn parse_name(name: String) -> Result<Name, DelegationError> {
    Name::new(&name).map_err(|_| TransformError::InvalidName(name).into())
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;
    use serde_json_bytes::json;

    use super::*;
    use crate::stitching::StitchingInfo;

    const SCHEMA: &str = r#"
        type Query { client(id: ID!): Client }
        type Client { id: ID! name: String }
    "#;

    fn schema() -> Schema {
        Schema::parse_and_validate(SCHEMA, "schema.graphql").unwrap()
    }

    fn request(query: &str) -> Request {
        Request::builder()
            .document(ast::Document::parse(query, "query.graphql").unwrap())
            .build()
    }

    fn names(delegation_context: &DelegationContext) -> Vec<String> {
        build_chain(delegation_context)
            .names()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn minimal_chain() {
        let query = r#"{ client(id: "1") { name } }"#;
        let delegation_context = DelegationContext::builder()
            .subschema(schema())
            .field_name(name!("client"))
            .return_type(ast::Type::Named(name!("Client")))
            .original_request(request(query))
            .build();
        assert_eq!(
            names(&delegation_context),
            [
                "CheckResultAndHandleErrors",
                "WrapConcreteTypes",
                "FilterToSchema",
                "AddTypenameToAbstract"
            ]
        );
    }

    #[test]
    fn full_chain() {
        let query = r#"{ client(id: "1") { name } }"#;
        let source = schema().with_stitching_info(Arc::new(StitchingInfo::new()));
        let request = request(query);
        let info =
            ResolveInfo::for_root_field(source, &request.document, Object::new()).unwrap();
        let mut args = Object::new();
        args.insert("id", json!("1"));
        let delegation_context = DelegationContext::builder()
            .subschema(schema())
            .field_name(name!("client"))
            .args(args)
            .info(Arc::new(info))
            .return_type(ast::Type::Named(name!("Client")))
            .original_request(request)
            .build();
        assert_eq!(
            names(&delegation_context),
            [
                "CheckResultAndHandleErrors",
                "AddSelectionSetsByField",
                "AddSelectionSetsByType",
                "WrapConcreteTypes",
                "ExpandAbstractTypes",
                "AddFragmentsByField",
                "AddArgumentsAsVariables",
                "FilterToSchema",
                "AddTypenameToAbstract"
            ]
        );
    }

    #[test]
    fn delegate_to_schema_requires_info() {
        let result = delegate_to_schema(DelegateToSchema::builder().subschema(schema()).build());
        assert!(matches!(result, Err(DelegationError::MissingResolveInfo)));
    }

    #[test]
    fn unknown_root_field_is_a_misconfiguration() {
        let result = delegate_request(
            DelegateRequest::builder()
                .request(request("{ client(id: \"1\") { name } }"))
                .subschema(schema())
                .field_name("missing")
                .build(),
        );
        assert!(matches!(
            result,
            Err(DelegationError::UnknownRootField { .. })
        ));
    }

    #[test]
    fn delegates_with_the_default_executor() {
        let root = json!({"client": {"id": "1", "name": "Ada"}});
        let config = crate::subschema::SubschemaConfig::builder()
            .name("clients")
            .schema(schema())
            .root_value(root.as_object().unwrap().clone())
            .build()
            .unwrap();
        let result = delegate_request(
            DelegateRequest::builder()
                .request(request(r#"{ client(id: "1") { name } }"#))
                .subschema(config)
                .build(),
        )
        .unwrap();
        let DelegationResult::Response(response) = result else {
            panic!("expected a synchronous result");
        };
        assert_eq!(response.data, Some(json!({"name": "Ada"})));
    }
}
