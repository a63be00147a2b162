//! The transform interface.
//!
//! A transform rewrites up to three things: the schema a subschema exposes, the
//! requests sent to it and the results it returns. Every operation defaults to the
//! identity, so a transform only implements the ones it needs.

use std::fmt;
use std::sync::Arc;

use crate::delegation_context::DelegationContext;
use crate::error::TransformError;
use crate::graphql::Request;
use crate::graphql::Response;
use crate::schema::Schema;

/// A rewrite rule over schemas, requests and results.
///
/// Request and result rewrites must not perform I/O. A result rewrite cannot fail: it
/// runs after the backend has executed, so malformed input is passed through.
pub trait Transform: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn transform_schema(&self, schema: Schema) -> Result<Schema, TransformError> {
        Ok(schema)
    }

    fn transform_request(
        &self,
        request: Request,
        _transform_context: &TransformContext,
        _delegation_context: &DelegationContext,
    ) -> Result<Request, TransformError> {
        Ok(request)
    }

    fn transform_result(
        &self,
        result: Response,
        _transform_context: &TransformContext,
        _delegation_context: &DelegationContext,
    ) -> Response {
        result
    }
}

/// The context of one stage of a chain, fixed when the chain is built.
///
/// For subschema transforms this is the pair of adjacent schemas the transform was
/// composed against: the schema it produced and the schema it was applied to.
#[derive(Clone, Debug, Default)]
pub struct TransformContext {
    pub transformed_schema: Option<Schema>,
    pub target_schema: Option<Schema>,
}

type SchemaFn = dyn Fn(Schema) -> Result<Schema, TransformError> + Send + Sync;
type RequestFn = dyn Fn(Request, &TransformContext, &DelegationContext) -> Result<Request, TransformError>
    + Send
    + Sync;
type ResultFn = dyn Fn(Response, &TransformContext, &DelegationContext) -> Response + Send + Sync;

/// A [`Transform`] made of up to three closures. A missing closure is the identity.
///
/// ```ignore
/// let add_header = TransformFns::new()
///     .named("add-header")
///     .result(|mut result, _, _| {
///         result.extensions.insert("seen", true.into());
///         result
///     });
/// ```
#[derive(Default)]
pub struct TransformFns {
    name: Option<String>,
    schema: Option<Box<SchemaFn>>,
    request: Option<Box<RequestFn>>,
    result: Option<Box<ResultFn>>,
}

impl TransformFns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn schema(
        mut self,
        schema: impl Fn(Schema) -> Result<Schema, TransformError> + Send + Sync + 'static,
    ) -> Self {
        self.schema = Some(Box::new(schema));
        self
    }

    pub fn request(
        mut self,
        request: impl Fn(Request, &TransformContext, &DelegationContext) -> Result<Request, TransformError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.request = Some(Box::new(request));
        self
    }

    pub fn result(
        mut self,
        result: impl Fn(Response, &TransformContext, &DelegationContext) -> Response
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.result = Some(Box::new(result));
        self
    }
}

impl Transform for TransformFns {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("TransformFns")
    }

    fn transform_schema(&self, schema: Schema) -> Result<Schema, TransformError> {
        match &self.schema {
            Some(transform) => transform(schema),
            None => Ok(schema),
        }
    }

    fn transform_request(
        &self,
        request: Request,
        transform_context: &TransformContext,
        delegation_context: &DelegationContext,
    ) -> Result<Request, TransformError> {
        match &self.request {
            Some(transform) => transform(request, transform_context, delegation_context),
            None => Ok(request),
        }
    }

    fn transform_result(
        &self,
        result: Response,
        transform_context: &TransformContext,
        delegation_context: &DelegationContext,
    ) -> Response {
        match &self.result {
            Some(transform) => transform(result, transform_context, delegation_context),
            None => result,
        }
    }
}

impl fmt::Debug for TransformFns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformFns")
            .field("name", &self.name())
            .field("schema", &self.schema.is_some())
            .field("request", &self.request.is_some())
            .field("result", &self.result.is_some())
            .finish()
    }
}

/// Applies the schema transforms in order.
pub fn apply_schema_transforms(
    schema: &Schema,
    transforms: &[Arc<dyn Transform>],
) -> Result<Schema, TransformError> {
    transforms
        .iter()
        .try_fold(schema.clone(), |schema, transform| {
            transform.transform_schema(schema)
        })
}

/// Every intermediate schema of the transforms, outermost first and `schema` last.
///
/// The result holds `transforms.len() + 1` schemas: entry `i` is produced by the
/// transform at position `len - 1 - i` from entry `i + 1`.
pub fn transformed_schemas(
    schema: &Schema,
    transforms: &[Arc<dyn Transform>],
) -> Result<Vec<Schema>, TransformError> {
    let mut schemas = Vec::with_capacity(transforms.len() + 1);
    schemas.push(schema.clone());
    let mut current = schema.clone();
    for transform in transforms {
        current = transform.transform_schema(current)?;
        schemas.push(current.clone());
    }
    schemas.reverse();
    Ok(schemas)
}

/// Pairs each transform, last first, with the two adjacent schemas it was composed
/// against.
///
/// The transform at reversed position `j` gets `schemas[j]` as its transformed schema
/// and `schemas[j + 1]` as its target. Schemas missing from a shorter chain are left
/// empty.
pub fn pair_with_schemas(
    transforms: &[Arc<dyn Transform>],
    schemas: &[Schema],
) -> Vec<(Arc<dyn Transform>, TransformContext)> {
    transforms
        .iter()
        .rev()
        .enumerate()
        .map(|(j, transform)| {
            (
                transform.clone(),
                TransformContext {
                    transformed_schema: schemas.get(j).cloned(),
                    target_schema: schemas.get(j + 1).cloned(),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn schema_with_field(field: &str) -> Schema {
        Schema::parse_and_validate(&format!("type Query {{ {field}: Int }}"), "schema.graphql")
            .unwrap()
    }

    /// A schema transform replacing the schema with one exposing `field`.
    fn replace_with(field: &str) -> Arc<dyn Transform> {
        let schema = schema_with_field(field);
        Arc::new(
            TransformFns::new()
                .named(field.to_string())
                .schema(move |_| Ok(schema.clone())),
        )
    }

    fn root_fields(schema: &Schema) -> Vec<String> {
        schema
            .definitions()
            .get_object("Query")
            .unwrap()
            .fields
            .keys()
            .map(|name| name.to_string())
            .collect()
    }

    #[test]
    fn identity_by_default() {
        let schema = schema_with_field("a");
        let transform = TransformFns::new();
        assert!(transform.transform_schema(schema.clone()).unwrap().ptr_eq(&schema));
        assert_eq!(transform.name(), "TransformFns");
    }

    #[test]
    fn transformed_schemas_are_outermost_first() {
        let schema = schema_with_field("original");
        let transforms = vec![replace_with("first"), replace_with("second")];
        let schemas = transformed_schemas(&schema, &transforms).unwrap();
        assert_eq!(
            schemas.iter().map(root_fields).collect::<Vec<_>>(),
            [vec!["second"], vec!["first"], vec!["original"]]
        );
        assert_eq!(
            root_fields(&apply_schema_transforms(&schema, &transforms).unwrap()),
            ["second"]
        );
        assert!(schemas[2].ptr_eq(&schema));
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(7)]
    fn pairing_walks_the_chain_from_its_end(#[case] len: usize) {
        let schema = schema_with_field("original");
        let transforms = (0..len)
            .map(|i| replace_with(&format!("t{i}")))
            .collect::<Vec<_>>();
        let schemas = transformed_schemas(&schema, &transforms).unwrap();
        assert_eq!(schemas.len(), len + 1);

        let pairs = pair_with_schemas(&transforms, &schemas);
        assert_eq!(pairs.len(), len);
        for (j, (transform, context)) in pairs.iter().enumerate() {
            let position = len - 1 - j;
            assert!(Arc::ptr_eq(transform, &transforms[position]));
            let transformed = context.transformed_schema.as_ref().unwrap();
            let target = context.target_schema.as_ref().unwrap();
            assert!(transformed.ptr_eq(&schemas[j]));
            assert!(target.ptr_eq(&schemas[j + 1]));
            // the transform produced its transformed schema
            assert_eq!(root_fields(transformed), [format!("t{position}")]);
        }
    }

    #[test]
    fn a_single_transform_is_paired() {
        let schema = schema_with_field("original");
        let transforms = vec![replace_with("only")];
        let schemas = transformed_schemas(&schema, &transforms).unwrap();
        let pairs = pair_with_schemas(&transforms, &schemas);
        assert_eq!(pairs.len(), 1);
        assert_eq!(
            root_fields(pairs[0].1.transformed_schema.as_ref().unwrap()),
            ["only"]
        );
        assert!(pairs[0].1.target_schema.as_ref().unwrap().ptr_eq(&schema));
    }
}
