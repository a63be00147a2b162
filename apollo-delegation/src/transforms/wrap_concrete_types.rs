use apollo_compiler::ast;

use crate::delegation_context::DelegationContext;
use crate::error::TransformError;
use crate::graphql::Request;
use crate::transform::Transform;
use crate::transform::TransformContext;
use crate::visitor::inline_fragment;

/// Narrows a root field the target declares abstract to the concrete type the caller
/// delegates for.
///
/// When the delegated return type is an object type, the selections of every root
/// field whose type is abstract in the transformed target schema are wrapped in
/// `... on <ReturnType>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WrapConcreteTypes;

impl Transform for WrapConcreteTypes {
    fn name(&self) -> &str {
        "WrapConcreteTypes"
    }

    fn transform_request(
        &self,
        mut request: Request,
        _transform_context: &TransformContext,
        delegation_context: &DelegationContext,
    ) -> Result<Request, TransformError> {
        // backend transforms have not run yet: root fields are the transformed ones
        let schema = &delegation_context.transformed_schema;
        let return_type = delegation_context.return_type.inner_named_type();
        // the caller's view of the type decides whether it is concrete
        let caller_schema = delegation_context.source_schema().unwrap_or(schema);
        if !caller_schema.is_object(return_type) {
            return Ok(request);
        }

        for definition in &mut request.document.definitions {
            let ast::Definition::OperationDefinition(operation) = definition else {
                continue;
            };
            let Some(root_type) = schema
                .root_operation(operation.operation_type.into())
                .cloned()
            else {
                continue;
            };
            for selection in &mut operation.make_mut().selection_set {
                let ast::Selection::Field(field) = selection else {
                    continue;
                };
                let is_abstract = schema
                    .field_type(&root_type, &field.name)
                    .is_some_and(|ty| schema.is_abstract(ty.inner_named_type()));
                if !is_abstract || field.selection_set.is_empty() {
                    continue;
                }
                let field = field.make_mut();
                let selections = std::mem::take(&mut field.selection_set);
                field
                    .selection_set
                    .push(inline_fragment(Some(return_type.clone()), selections));
            }
        }
        Ok(request)
    }
}
