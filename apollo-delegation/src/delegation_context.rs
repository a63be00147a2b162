use std::fmt::Display;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::ast;
use serde::Deserialize;
use serde::Serialize;

use crate::context::Context;
use crate::graphql::Request;
use crate::json_ext::Object;
use crate::resolve_info::ResolveInfo;
use crate::schema::Schema;
use crate::stitching::StitchingInfo;
use crate::subschema::Subschema;
use crate::transform::Transform;

/// GraphQL operation type.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum OperationKind {
    #[default]
    Query,
    Mutation,
    Subscription,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.default_type_name())
    }
}

impl OperationKind {
    pub const fn default_type_name(&self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
            OperationKind::Subscription => "Subscription",
        }
    }
}

impl From<OperationKind> for ast::OperationType {
    fn from(value: OperationKind) -> Self {
        match value {
            OperationKind::Query => ast::OperationType::Query,
            OperationKind::Mutation => ast::OperationType::Mutation,
            OperationKind::Subscription => ast::OperationType::Subscription,
        }
    }
}

impl From<ast::OperationType> for OperationKind {
    fn from(value: ast::OperationType) -> Self {
        match value {
            ast::OperationType::Query => OperationKind::Query,
            ast::OperationType::Mutation => OperationKind::Mutation,
            ast::OperationType::Subscription => OperationKind::Subscription,
        }
    }
}

/// Everything known about one delegation, fixed before the first transform runs.
///
/// Every stage of the chain reads the same value; none can change it.
#[derive(Clone)]
pub struct DelegationContext {
    pub subschema: Subschema,
    /// The schema the request is executed against.
    pub target_schema: Schema,
    pub operation: OperationKind,
    pub field_name: Name,
    pub args: Option<Object>,
    pub context: Context,
    pub info: Option<Arc<ResolveInfo>>,
    pub return_type: ast::Type,
    /// Subschema transforms followed by the caller's extra transforms.
    pub transforms: Vec<Arc<dyn Transform>>,
    /// The target schema as the composed schema sees it.
    pub transformed_schema: Schema,
    /// Progressively transformed schemas, outermost first and the target last.
    pub transformed_schemas: Vec<Schema>,
    pub skip_type_merging: bool,
    pub stitching_info: Option<Arc<StitchingInfo>>,
    /// The request as the caller built it, before any transform.
    pub original_request: Request,
}

#[buildstructor::buildstructor]
impl DelegationContext {
    #[builder(visibility = "pub")]
    #[allow(clippy::too_many_arguments)]
    fn new(
        subschema: Subschema,
        operation: Option<OperationKind>,
        field_name: Name,
        args: Option<Object>,
        context: Option<Context>,
        info: Option<Arc<ResolveInfo>>,
        return_type: ast::Type,
        transforms: Vec<Arc<dyn Transform>>,
        transformed_schema: Option<Schema>,
        transformed_schemas: Option<Vec<Schema>>,
        skip_type_merging: Option<bool>,
        original_request: Request,
    ) -> Self {
        let target_schema = subschema.schema().clone();
        let transformed_schemas = transformed_schemas
            .filter(|schemas| !schemas.is_empty())
            .unwrap_or_else(|| vec![target_schema.clone()]);
        let transformed_schema = transformed_schema
            .or_else(|| transformed_schemas.first().cloned())
            .unwrap_or_else(|| target_schema.clone());
        let stitching_info = info
            .as_ref()
            .and_then(|info| info.schema.stitching_info().cloned());
        Self {
            subschema,
            target_schema,
            operation: operation.unwrap_or_default(),
            field_name,
            args,
            context: context.unwrap_or_default(),
            info,
            return_type,
            transforms,
            transformed_schema,
            transformed_schemas,
            skip_type_merging: skip_type_merging.unwrap_or_default(),
            stitching_info,
            original_request,
        }
    }

    /// The composed schema the caller resolves against, when resolver info is present.
    pub fn source_schema(&self) -> Option<&Schema> {
        self.info.as_ref().map(|info| &info.schema)
    }

    /// The response key under which the delegated field appears in the original request.
    pub fn response_key(&self) -> Name {
        self.original_request
            .root_field()
            .map(|field| field.alias.as_ref().unwrap_or(&field.name).clone())
            .unwrap_or_else(|| self.field_name.clone())
    }
}

impl std::fmt::Debug for DelegationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegationContext")
            .field("subschema", &self.subschema.name())
            .field("operation", &self.operation)
            .field("field_name", &self.field_name)
            .field("args", &self.args)
            .field("return_type", &self.return_type)
            .field(
                "transforms",
                &self.transforms.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("transformed_schemas", &self.transformed_schemas.len())
            .field("skip_type_merging", &self.skip_type_merging)
            .field("stitching_info", &self.stitching_info.is_some())
            .finish()
    }
}
