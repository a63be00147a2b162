use std::fmt;

use apollo_compiler::Name;
use apollo_compiler::ast;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::schema::ExtendedType;

use crate::delegation_context::DelegationContext;
use crate::delegation_context::OperationKind;
use crate::error::SchemaError;
use crate::error::TransformError;
use crate::graphql::Request;
use crate::schema::Schema;
use crate::transform::Transform;
use crate::transform::TransformContext;

type RenameFn = dyn Fn(OperationKind, &str) -> String + Send + Sync;

/// Renames the root fields a subschema exposes.
///
/// The schema transform applies the renaming; requests written against the renamed
/// schema get their root fields mapped back, aliased to the name the caller used so
/// results need no rewrite. The mapping is read from the pair of schemas the
/// transform was composed against.
pub struct RenameRootFields {
    rename: Box<RenameFn>,
}

impl RenameRootFields {
    pub fn new(rename: impl Fn(OperationKind, &str) -> String + Send + Sync + 'static) -> Self {
        Self {
            rename: Box::new(rename),
        }
    }

    /// Prefixes every root field with `prefix`.
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::new(move |_, field_name| format!("{prefix}{field_name}"))
    }

    /// The field of `target`'s root type that is exposed as `exposed`.
    fn original_name(&self, target: &Schema, kind: OperationKind, exposed: &str) -> Option<Name> {
        let root_type = target.root_operation(kind)?;
        let object = target.definitions().get_object(root_type)?;
        object
            .fields
            .keys()
            .find(|field_name| (self.rename)(kind, field_name.as_str()) == exposed)
            .cloned()
    }
}

impl Transform for RenameRootFields {
    fn name(&self) -> &str {
        "RenameRootFields"
    }

    fn transform_schema(&self, schema: Schema) -> Result<Schema, TransformError> {
        let mut definitions = schema.definitions().clone().into_inner();
        for kind in [
            OperationKind::Query,
            OperationKind::Mutation,
            OperationKind::Subscription,
        ] {
            let Some(root_type) = definitions.root_operation(kind.into()).cloned() else {
                continue;
            };
            let Some(ExtendedType::Object(object)) = definitions.types.get_mut(&root_type) else {
                continue;
            };
            let object = object.make_mut();
            let mut fields = IndexMap::default();
            for (field_name, field) in object.fields.drain(..) {
                let renamed = (self.rename)(kind, field_name.as_str());
                let renamed =
                    Name::new(&renamed).map_err(|_| TransformError::InvalidName(renamed))?;
                let mut field = field;
                field.node.make_mut().name = renamed.clone();
                fields.insert(renamed, field);
            }
            object.fields = fields;
        }
        let definitions = definitions
            .validate()
            .map_err(|errors| SchemaError::Validate(errors.into()))?;
        Ok(Schema::new(definitions))
    }

    fn transform_request(
        &self,
        mut request: Request,
        transform_context: &TransformContext,
        delegation_context: &DelegationContext,
    ) -> Result<Request, TransformError> {
        let target = transform_context
            .target_schema
            .as_ref()
            .unwrap_or(&delegation_context.target_schema);
        for definition in &mut request.document.definitions {
            let ast::Definition::OperationDefinition(operation) = definition else {
                continue;
            };
            let kind = OperationKind::from(operation.operation_type);
            for selection in &mut operation.make_mut().selection_set {
                let ast::Selection::Field(field) = selection else {
                    continue;
                };
                let Some(original) = self.original_name(target, kind, &field.name) else {
                    continue;
                };
                if original == field.name {
                    continue;
                }
                let field = field.make_mut();
                if field.alias.is_none() {
                    field.alias = Some(field.name.clone());
                }
                field.name = original;
            }
        }
        Ok(request)
    }
}

impl fmt::Debug for RenameRootFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenameRootFields").finish_non_exhaustive()
    }
}
