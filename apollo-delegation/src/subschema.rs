//! Subschemas: the backends a composed schema delegates to.

use std::fmt;
use std::sync::Arc;

use apollo_compiler::ast;
use futures::future::BoxFuture;
use tower::BoxError;

use crate::context::Context;
use crate::error::TransformError;
use crate::graphql::Response;
use crate::graphql::ResponseStream;
use crate::json_ext::Object;
use crate::resolve_info::ResolveInfo;
use crate::schema::Schema;
use crate::transform::Transform;
use crate::transform::transformed_schemas;

/// What an [`Executor`] or [`Subscriber`] receives.
#[derive(Clone, Debug)]
pub struct ExecutionParams {
    pub document: ast::Document,
    pub variables: Object,
    pub context: Context,
    pub info: Option<Arc<ResolveInfo>>,
}

/// The outcome of an [`Executor`]: available right away or later.
pub enum ExecutorResult {
    Sync(Response),
    Async(BoxFuture<'static, Result<Response, BoxError>>),
}

impl fmt::Debug for ExecutorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorResult::Sync(response) => f.debug_tuple("Sync").field(response).finish(),
            ExecutorResult::Async(_) => f.write_str("Async"),
        }
    }
}

/// The outcome of a [`Subscriber`]: one result, or a stream of results.
pub enum SubscriptionResult {
    Response(Response),
    Stream(ResponseStream),
}

impl fmt::Debug for SubscriptionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionResult::Response(response) => {
                f.debug_tuple("Response").field(response).finish()
            }
            SubscriptionResult::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Runs queries and mutations against a subschema.
///
/// An `Err` is a failure of the backend itself (unreachable, crashed); field errors
/// belong in [`Response::errors`].
pub trait Executor: Send + Sync {
    fn execute(&self, params: ExecutionParams) -> Result<ExecutorResult, BoxError>;
}

impl<F> Executor for F
where
    F: Fn(ExecutionParams) -> Result<ExecutorResult, BoxError> + Send + Sync,
{
    fn execute(&self, params: ExecutionParams) -> Result<ExecutorResult, BoxError> {
        self(params)
    }
}

/// Runs subscriptions against a subschema.
pub trait Subscriber: Send + Sync {
    fn subscribe(&self, params: ExecutionParams)
    -> BoxFuture<'static, Result<SubscriptionResult, BoxError>>;
}

impl<F> Subscriber for F
where
    F: Fn(ExecutionParams) -> BoxFuture<'static, Result<SubscriptionResult, BoxError>>
        + Send
        + Sync,
{
    fn subscribe(
        &self,
        params: ExecutionParams,
    ) -> BoxFuture<'static, Result<SubscriptionResult, BoxError>> {
        self(params)
    }
}

/// A backend with its own execution and transforms.
pub struct SubschemaConfig {
    pub name: String,
    pub schema: Schema,
    pub executor: Option<Arc<dyn Executor>>,
    pub subscriber: Option<Arc<dyn Subscriber>>,
    pub root_value: Option<Object>,
    pub transforms: Vec<Arc<dyn Transform>>,
    transformed_schemas: Vec<Schema>,
}

#[buildstructor::buildstructor]
impl SubschemaConfig {
    /// Builds the configuration and computes the schemas its transforms produce.
    #[builder(visibility = "pub")]
    fn new(
        name: String,
        schema: Schema,
        executor: Option<Arc<dyn Executor>>,
        subscriber: Option<Arc<dyn Subscriber>>,
        root_value: Option<Object>,
        transforms: Vec<Arc<dyn Transform>>,
    ) -> Result<Self, TransformError> {
        let transformed_schemas = transformed_schemas(&schema, &transforms)?;
        Ok(Self {
            name,
            schema,
            executor,
            subscriber,
            root_value,
            transforms,
            transformed_schemas,
        })
    }

    /// The schemas produced by the transforms, outermost first and [`Self::schema`] last.
    pub fn transformed_schemas(&self) -> &[Schema] {
        &self.transformed_schemas
    }

    /// The schema the composed schema sees: [`Self::schema`] after every transform.
    pub fn transformed_schema(&self) -> &Schema {
        self.transformed_schemas.first().unwrap_or(&self.schema)
    }
}

impl fmt::Debug for SubschemaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubschemaConfig")
            .field("name", &self.name)
            .field("executor", &self.executor.is_some())
            .field("subscriber", &self.subscriber.is_some())
            .field("root_value", &self.root_value)
            .field(
                "transforms",
                &self.transforms.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// The backend a delegation targets: a bare schema executed in process, or a
/// configured subschema.
#[derive(Clone, Debug)]
pub enum Subschema {
    Schema(Schema),
    Config(Arc<SubschemaConfig>),
}

impl Subschema {
    pub fn schema(&self) -> &Schema {
        match self {
            Subschema::Schema(schema) => schema,
            Subschema::Config(config) => &config.schema,
        }
    }

    pub fn config(&self) -> Option<&SubschemaConfig> {
        match self {
            Subschema::Schema(_) => None,
            Subschema::Config(config) => Some(config),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.config().map(|config| config.name.as_str())
    }

    pub fn transforms(&self) -> &[Arc<dyn Transform>] {
        self.config()
            .map(|config| config.transforms.as_slice())
            .unwrap_or_default()
    }
}

impl From<Schema> for Subschema {
    fn from(schema: Schema) -> Self {
        Subschema::Schema(schema)
    }
}

impl From<SubschemaConfig> for Subschema {
    fn from(config: SubschemaConfig) -> Self {
        Subschema::Config(Arc::new(config))
    }
}

impl From<Arc<SubschemaConfig>> for Subschema {
    fn from(config: Arc<SubschemaConfig>) -> Self {
        Subschema::Config(config)
    }
}
