//! Schema-aware traversal of operation documents, in place.

use apollo_compiler::Name;
use apollo_compiler::ast;
use apollo_compiler::name;

use crate::schema::Schema;

/// Hooks called for every selection set of a document.
///
/// `parent_type` is the type the selections apply to, or `None` when it cannot be
/// found in the schema (a field unknown to the schema, a fragment on a missing
/// type). Leaf fields are not visited. Selections added on enter are traversed;
/// selections added on leave are not.
pub(crate) trait Visitor {
    fn enter_selection_set(
        &mut self,
        _parent_type: Option<&str>,
        _selections: &mut Vec<ast::Selection>,
    ) {
    }

    fn leave_selection_set(
        &mut self,
        _parent_type: Option<&str>,
        _selections: &mut Vec<ast::Selection>,
    ) {
    }
}

/// Traverse every operation and fragment definition of `document`.
pub(crate) fn document(visitor: &mut impl Visitor, schema: &Schema, document: &mut ast::Document) {
    for definition in &mut document.definitions {
        match definition {
            ast::Definition::OperationDefinition(operation) => {
                let root_type = schema
                    .root_operation(operation.operation_type.into())
                    .cloned();
                let operation = operation.make_mut();
                selection_set(
                    visitor,
                    schema,
                    root_type.as_deref(),
                    &mut operation.selection_set,
                );
            }
            ast::Definition::FragmentDefinition(fragment) => {
                let type_condition = fragment.type_condition.clone();
                let fragment = fragment.make_mut();
                selection_set(
                    visitor,
                    schema,
                    known_type(schema, &type_condition).map(Name::as_str),
                    &mut fragment.selection_set,
                );
            }
            _ => {}
        }
    }
}

/// Traverse one selection set whose selections apply to `parent_type`.
pub(crate) fn selection_set(
    visitor: &mut impl Visitor,
    schema: &Schema,
    parent_type: Option<&str>,
    selections: &mut Vec<ast::Selection>,
) {
    visitor.enter_selection_set(parent_type, selections);
    for selection in selections.iter_mut() {
        match selection {
            ast::Selection::Field(field) => {
                // leaves have no selection set to visit
                if field.selection_set.is_empty() {
                    continue;
                }
                let field_type = parent_type
                    .and_then(|parent_type| schema.field_type(parent_type, &field.name))
                    .map(|ty| ty.inner_named_type().clone());
                let field = field.make_mut();
                selection_set(
                    visitor,
                    schema,
                    field_type.as_deref(),
                    &mut field.selection_set,
                );
            }
            ast::Selection::InlineFragment(fragment) => {
                let fragment_type = match &fragment.type_condition {
                    Some(type_condition) => known_type(schema, type_condition).map(Name::as_str),
                    None => parent_type,
                };
                // owned so that `fragment` can be borrowed mutably
                let fragment_type = fragment_type.map(str::to_owned);
                let fragment = fragment.make_mut();
                selection_set(
                    visitor,
                    schema,
                    fragment_type.as_deref(),
                    &mut fragment.selection_set,
                );
            }
            ast::Selection::FragmentSpread(_) => {}
        }
    }
    visitor.leave_selection_set(parent_type, selections);
}

fn known_type<'a>(schema: &Schema, type_name: &'a Name) -> Option<&'a Name> {
    schema.has_type(type_name).then_some(type_name)
}

/// A `__typename` field selection.
pub(crate) fn typename_field() -> ast::Selection {
    ast::Selection::Field(
        ast::Field {
            alias: None,
            name: name!("__typename"),
            arguments: Vec::new(),
            directives: ast::DirectiveList::new(),
            selection_set: Vec::new(),
        }
        .into(),
    )
}

/// Whether `selections` directly select `__typename` under its own name.
pub(crate) fn selects_typename(selections: &[ast::Selection]) -> bool {
    selections.iter().any(|selection| {
        matches!(selection, ast::Selection::Field(field)
            if field.name == "__typename" && field.alias.is_none())
    })
}

/// An inline fragment on `type_condition` wrapping `selections`.
pub(crate) fn inline_fragment(
    type_condition: Option<Name>,
    selections: Vec<ast::Selection>,
) -> ast::Selection {
    ast::Selection::InlineFragment(
        ast::InlineFragment {
            type_condition,
            directives: ast::DirectiveList::new(),
            selection_set: selections,
        }
        .into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordParents {
        entered: Vec<Option<String>>,
    }

    impl Visitor for RecordParents {
        fn enter_selection_set(
            &mut self,
            parent_type: Option<&str>,
            _selections: &mut Vec<ast::Selection>,
        ) {
            self.entered.push(parent_type.map(str::to_owned));
        }
    }

    struct AddTypename;

    impl Visitor for AddTypename {
        fn leave_selection_set(
            &mut self,
            parent_type: Option<&str>,
            selections: &mut Vec<ast::Selection>,
        ) {
            if parent_type == Some("User") && !selects_typename(selections) {
                selections.push(typename_field());
            }
        }
    }

    const SCHEMA: &str = r#"
        type Query { me: User node: Node }
        interface Node { id: ID! }
        type User implements Node { id: ID! friends: [User] }
    "#;

    #[test]
    fn parent_types() {
        let schema = Schema::parse_and_validate(SCHEMA, "schema.graphql").unwrap();
        let mut document = ast::Document::parse(
            "{ me { friends { id } unknown { id } } node { ... on User { id } ... on Missing { id } } } fragment F on User { id }",
            "query.graphql",
        )
        .unwrap();
        let mut visitor = RecordParents {
            entered: Vec::new(),
        };
        super::document(&mut visitor, &schema, &mut document);
        let entered = visitor
            .entered
            .iter()
            .map(|parent| parent.as_deref().unwrap_or("?"))
            .collect::<Vec<_>>();
        assert_eq!(
            entered,
            ["Query", "User", "User", "?", "Node", "User", "?", "User"]
        );
    }

    #[test]
    fn edits_in_place() {
        let schema = Schema::parse_and_validate(SCHEMA, "schema.graphql").unwrap();
        let mut document = ast::Document::parse(
            "{ me { friends { id __typename } } }",
            "query.graphql",
        )
        .unwrap();
        super::document(&mut AddTypename, &schema, &mut document);
        let expected = ast::Document::parse(
            "{ me { friends { id __typename } __typename } }",
            "expected.graphql",
        )
        .unwrap();
        assert_eq!(document.to_string(), expected.to_string());
    }
}
