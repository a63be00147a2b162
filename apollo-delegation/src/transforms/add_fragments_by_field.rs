use apollo_compiler::ast;

use crate::delegation_context::DelegationContext;
use crate::error::TransformError;
use crate::graphql::Request;
use crate::stitching::StitchingInfo;
use crate::transform::Transform;
use crate::transform::TransformContext;
use crate::visitor;
use crate::visitor::Visitor;

/// Adds the inline fragments registered for a field next to every selection of it.
///
/// Types are resolved against the untransformed target schema, which is what the
/// request is written against once the subschema transforms have run.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddFragmentsByField;

impl Transform for AddFragmentsByField {
    fn name(&self) -> &str {
        "AddFragmentsByField"
    }

    fn transform_request(
        &self,
        mut request: Request,
        _transform_context: &TransformContext,
        delegation_context: &DelegationContext,
    ) -> Result<Request, TransformError> {
        let Some(stitching_info) = delegation_context.stitching_info.as_deref() else {
            return Ok(request);
        };
        visitor::document(
            &mut FragmentAdder { stitching_info },
            &delegation_context.target_schema,
            &mut request.document,
        );
        Ok(request)
    }
}

struct FragmentAdder<'a> {
    stitching_info: &'a StitchingInfo,
}

impl Visitor for FragmentAdder<'_> {
    fn enter_selection_set(
        &mut self,
        parent_type: Option<&str>,
        selections: &mut Vec<ast::Selection>,
    ) {
        let Some(parent_type) = parent_type else {
            return;
        };
        let additions = selections
            .iter()
            .filter_map(|selection| match selection {
                ast::Selection::Field(field) => {
                    self.stitching_info.fragments_for_field(parent_type, &field.name)
                }
                _ => None,
            })
            .flatten()
            .map(|fragment| ast::Selection::InlineFragment(fragment.clone()))
            .collect::<Vec<_>>();
        selections.extend(additions);
    }
}
