//! Information about the field being resolved when a delegation starts.

use std::collections::HashMap;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;

use crate::error::DelegationError;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::PathElement;
use crate::schema::Schema;

/// The resolver information of the caller: which field of the composed schema is
/// being resolved, where, and with which selections.
#[derive(Clone, Debug)]
pub struct ResolveInfo {
    /// The composed schema the caller resolves against. Carries the stitching info.
    pub schema: Schema,
    pub parent_type: Name,
    pub field_name: Name,
    pub return_type: ast::Type,
    /// Every node selecting this field in the caller's operation.
    pub field_nodes: Vec<Node<ast::Field>>,
    pub fragments: HashMap<Name, Node<ast::FragmentDefinition>>,
    pub operation: Node<ast::OperationDefinition>,
    pub variable_values: Object,
    /// Response path of the field being resolved.
    pub path: Path,
    pub root_value: Option<Object>,
}

#[buildstructor::buildstructor]
impl ResolveInfo {
    #[builder(visibility = "pub")]
    #[allow(clippy::too_many_arguments)]
    fn new(
        schema: Schema,
        parent_type: Name,
        field_name: Name,
        return_type: ast::Type,
        field_nodes: Vec<Node<ast::Field>>,
        fragments: HashMap<Name, Node<ast::FragmentDefinition>>,
        operation: Node<ast::OperationDefinition>,
        variable_values: Option<Object>,
        path: Option<Path>,
        root_value: Option<Object>,
    ) -> Self {
        let path = path.unwrap_or_else(|| Path(vec![PathElement::Key(field_name.to_string())]));
        Self {
            schema,
            parent_type,
            field_name,
            return_type,
            field_nodes,
            fragments,
            operation,
            variable_values: variable_values.unwrap_or_default(),
            path,
            root_value,
        }
    }

    /// Resolver information for the first root field of the first operation of
    /// `document`, as seen by a root resolver of `schema`.
    pub fn for_root_field(
        schema: Schema,
        document: &ast::Document,
        variable_values: Object,
    ) -> Result<Self, DelegationError> {
        let mut operations = document.definitions.iter().filter_map(|definition| match definition {
            ast::Definition::OperationDefinition(operation) => Some(operation),
            _ => None,
        });
        let operation = operations
            .next()
            .ok_or(DelegationError::MissingOperation)?
            .clone();
        let kind = operation.operation_type.into();
        let parent_type = schema
            .root_operation(kind)
            .ok_or(DelegationError::MissingRootType(kind))?
            .clone();
        let field = operation
            .selection_set
            .iter()
            .find_map(|selection| match selection {
                ast::Selection::Field(field) => Some(field.clone()),
                _ => None,
            })
            .ok_or(DelegationError::MissingFieldName)?;
        let return_type = schema.field_type(&parent_type, &field.name).ok_or_else(|| {
            DelegationError::UnknownRootField {
                operation: kind,
                field_name: field.name.to_string(),
            }
        })?;
        let response_key = field.alias.as_ref().unwrap_or(&field.name).to_string();
        let fragments = document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                ast::Definition::FragmentDefinition(fragment) => {
                    Some((fragment.name.clone(), fragment.clone()))
                }
                _ => None,
            })
            .collect();
        Ok(Self {
            schema,
            parent_type,
            field_name: field.name.clone(),
            return_type,
            field_nodes: vec![field],
            fragments,
            operation,
            variable_values,
            path: Path(vec![PathElement::Key(response_key)]),
            root_value: None,
        })
    }
}
