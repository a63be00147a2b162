//! Merge metadata produced by schema composition.

use std::collections::HashMap;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;

use crate::error::SchemaError;
use crate::schema::Schema;

/// Read-only lookup maps describing how the types of a composed schema are merged
/// across subschemas.
///
/// Composition builds one of these and attaches it to the composed schema (see
/// [`Schema::with_stitching_info`]); every delegation made while resolving against that
/// schema reads it.
#[derive(Clone, Debug, Default)]
pub struct StitchingInfo {
    /// Subschema name to the schema it exposes once its transforms are applied.
    pub transformed_schemas: HashMap<String, Schema>,

    /// Type, then field, to the selections that must be fetched along with that field.
    pub selection_sets_by_field: HashMap<Name, HashMap<Name, Vec<ast::Selection>>>,

    /// Type to the selections that must be fetched whenever that type is selected.
    pub selection_sets_by_type: HashMap<Name, Vec<ast::Selection>>,

    /// Type, then field, to inline fragments injected next to that field.
    pub fragments_by_field: HashMap<Name, HashMap<Name, Vec<Node<ast::InlineFragment>>>>,
}

impl StitchingInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transformed_schema(mut self, subschema_name: impl Into<String>, schema: Schema) -> Self {
        self.transformed_schemas.insert(subschema_name.into(), schema);
        self
    }

    /// Registers the selections, written as in `{ products { id } }` without the outer
    /// braces, required whenever `type_name.field_name` is selected.
    pub fn with_selection_set_by_field(
        mut self,
        type_name: &str,
        field_name: &str,
        selections: &str,
    ) -> Result<Self, SchemaError> {
        let selections = parse_selections(selections)?;
        self.selection_sets_by_field
            .entry(parse_name(type_name)?)
            .or_default()
            .entry(parse_name(field_name)?)
            .or_default()
            .extend(selections);
        Ok(self)
    }

    pub fn with_selection_set_by_type(
        mut self,
        type_name: &str,
        selections: &str,
    ) -> Result<Self, SchemaError> {
        let selections = parse_selections(selections)?;
        self.selection_sets_by_type
            .entry(parse_name(type_name)?)
            .or_default()
            .extend(selections);
        Ok(self)
    }

    /// Registers inline fragments, written as `... on T { a }`, injected next to every
    /// selection of `type_name.field_name`.
    pub fn with_fragments_by_field(
        mut self,
        type_name: &str,
        field_name: &str,
        fragments: &str,
    ) -> Result<Self, SchemaError> {
        let fragments = parse_selections(fragments)?
            .into_iter()
            .filter_map(|selection| match selection {
                ast::Selection::InlineFragment(fragment) => Some(fragment),
                _ => None,
            })
            .collect::<Vec<_>>();
        self.fragments_by_field
            .entry(parse_name(type_name)?)
            .or_default()
            .entry(parse_name(field_name)?)
            .or_default()
            .extend(fragments);
        Ok(self)
    }

    pub fn selection_set_for_field(&self, type_name: &str, field_name: &str) -> Option<&[ast::Selection]> {
        self.selection_sets_by_field
            .get(type_name)?
            .get(field_name)
            .map(Vec::as_slice)
    }

    pub fn selection_set_for_type(&self, type_name: &str) -> Option<&[ast::Selection]> {
        self.selection_sets_by_type.get(type_name).map(Vec::as_slice)
    }

    pub fn fragments_for_field(
        &self,
        type_name: &str,
        field_name: &str,
    ) -> Option<&[Node<ast::InlineFragment>]> {
        self.fragments_by_field
            .get(type_name)?
            .get(field_name)
            .map(Vec::as_slice)
    }
}

fn parse_name(name: &str) -> Result<Name, SchemaError> {
    Name::new(name).map_err(|error| SchemaError::Invalid(error.to_string()))
}

fn parse_selections(source: &str) -> Result<Vec<ast::Selection>, SchemaError> {
    let document = ast::Document::parse(format!("{{ {source} }}"), "selections.graphql")
        .map_err(|errors| SchemaError::Validate(errors.into()))?;
    document
        .definitions
        .into_iter()
        .find_map(|definition| match definition {
            ast::Definition::OperationDefinition(operation) => {
                Some(operation.selection_set.clone())
            }
            _ => None,
        })
        .ok_or_else(|| SchemaError::Invalid(format!("no selections in `{source}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_selections_and_fragments() {
        let info = StitchingInfo::new()
            .with_selection_set_by_field("Client", "name", "products { id }")
            .unwrap()
            .with_selection_set_by_type("Product", "id")
            .unwrap()
            .with_fragments_by_field("Client", "name", "... on Client { id }")
            .unwrap();

        let selections = info.selection_set_for_field("Client", "name").unwrap();
        assert_eq!(selections.len(), 1);
        let ast::Selection::Field(field) = &selections[0] else {
            panic!("expected a field");
        };
        assert_eq!(field.name, "products");
        assert_eq!(field.selection_set.len(), 1);
        assert_eq!(info.selection_set_for_type("Product").unwrap().len(), 1);
        assert!(info.selection_set_for_type("Client").is_none());
        let fragments = info.fragments_for_field("Client", "name").unwrap();
        assert_eq!(fragments[0].type_condition.as_ref().unwrap(), "Client");
    }

    #[test]
    fn rejects_invalid_selections() {
        assert!(
            StitchingInfo::new()
                .with_selection_set_by_type("Product", "{{")
                .is_err()
        );
        assert!(
            StitchingInfo::new()
                .with_selection_set_by_type("not a name", "id")
                .is_err()
        );
    }
}
