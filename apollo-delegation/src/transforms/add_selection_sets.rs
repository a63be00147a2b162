use apollo_compiler::ast;

use crate::delegation_context::DelegationContext;
use crate::error::TransformError;
use crate::graphql::Request;
use crate::stitching::StitchingInfo;
use crate::transform::Transform;
use crate::transform::TransformContext;
use crate::visitor;
use crate::visitor::Visitor;

/// Adds the selections registered for a field next to every selection of that field.
///
/// Types are resolved against the caller's schema. Without stitching info this is the
/// identity.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddSelectionSetsByField;

/// Adds the selections registered for a type to every selection set on that type.
///
/// Types are resolved against the caller's schema. Without stitching info this is the
/// identity.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddSelectionSetsByType;

impl Transform for AddSelectionSetsByField {
    fn name(&self) -> &str {
        "AddSelectionSetsByField"
    }

    fn transform_request(
        &self,
        request: Request,
        _transform_context: &TransformContext,
        delegation_context: &DelegationContext,
    ) -> Result<Request, TransformError> {
        add_selection_sets(request, delegation_context, Mapping::ByField)
    }
}

impl Transform for AddSelectionSetsByType {
    fn name(&self) -> &str {
        "AddSelectionSetsByType"
    }

    fn transform_request(
        &self,
        request: Request,
        _transform_context: &TransformContext,
        delegation_context: &DelegationContext,
    ) -> Result<Request, TransformError> {
        add_selection_sets(request, delegation_context, Mapping::ByType)
    }
}

#[derive(Clone, Copy)]
enum Mapping {
    ByField,
    ByType,
}

fn add_selection_sets(
    mut request: Request,
    delegation_context: &DelegationContext,
    mapping: Mapping,
) -> Result<Request, TransformError> {
    let (Some(stitching_info), Some(schema)) = (
        delegation_context.stitching_info.as_deref(),
        delegation_context.source_schema(),
    ) else {
        return Ok(request);
    };
    let mut adder = SelectionSetAdder {
        stitching_info,
        mapping,
    };
    visitor::document(&mut adder, schema, &mut request.document);
    Ok(request)
}

struct SelectionSetAdder<'a> {
    stitching_info: &'a StitchingInfo,
    mapping: Mapping,
}

impl SelectionSetAdder<'_> {
    fn additions(&self, parent_type: &str, selections: &[ast::Selection]) -> Vec<ast::Selection> {
        match self.mapping {
            Mapping::ByType => self
                .stitching_info
                .selection_set_for_type(parent_type)
                .map(<[_]>::to_vec)
                .unwrap_or_default(),
            Mapping::ByField => selections
                .iter()
                .filter_map(|selection| match selection {
                    ast::Selection::Field(field) => self
                        .stitching_info
                        .selection_set_for_field(parent_type, &field.name),
                    _ => None,
                })
                .flatten()
                .cloned()
                .collect(),
        }
    }
}

impl Visitor for SelectionSetAdder<'_> {
    fn enter_selection_set(
        &mut self,
        parent_type: Option<&str>,
        selections: &mut Vec<ast::Selection>,
    ) {
        let Some(parent_type) = parent_type else {
            return;
        };
        for addition in self.additions(parent_type, selections) {
            if !selections.contains(&addition) {
                selections.push(addition);
            }
        }
    }
}
