//! Projection of JSON values onto GraphQL selections.

use std::collections::HashMap;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use serde_json_bytes::ByteString;
use serde_json_bytes::Entry;

use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::schema::Schema;

/// Keeps, from a response value, exactly what a selection set asks for.
///
/// Keys are response keys (alias or field name). A selected key missing from the value
/// resolves to `null`. Fragments apply when the object's `__typename`, or failing that
/// the static parent type, satisfies their type condition; an object whose type cannot
/// be determined gets every fragment. Objects whose static type is abstract keep their
/// `__typename`, selected or not.
pub(crate) struct Projection<'a> {
    schema: &'a Schema,
    fragments: &'a HashMap<Name, Node<ast::FragmentDefinition>>,
    variables: &'a Object,
}

impl<'a> Projection<'a> {
    pub(crate) fn new(
        schema: &'a Schema,
        fragments: &'a HashMap<Name, Node<ast::FragmentDefinition>>,
        variables: &'a Object,
    ) -> Self {
        Self {
            schema,
            fragments,
            variables,
        }
    }

    pub(crate) fn project(
        &self,
        value: &Value,
        selections: &[ast::Selection],
        parent_type: Option<&str>,
    ) -> Value {
        match value {
            Value::Array(elements) => Value::Array(
                elements
                    .iter()
                    .map(|element| self.project(element, selections, parent_type))
                    .collect(),
            ),
            Value::Object(object) => {
                let mut output = Object::with_capacity(selections.len());
                self.project_object(object, selections, parent_type, &mut output);
                // callers resolve abstract types from the concrete `__typename`
                if let Some(typename) = object
                    .get("__typename")
                    .filter(|_| parent_type.is_some_and(|parent| self.schema.is_abstract(parent)))
                {
                    if !output.contains_key("__typename") {
                        output.insert("__typename", typename.clone());
                    }
                }
                Value::Object(output)
            }
            other => other.clone(),
        }
    }

    fn project_object(
        &self,
        object: &Object,
        selections: &[ast::Selection],
        parent_type: Option<&str>,
        output: &mut Object,
    ) {
        for selection in selections {
            match selection {
                ast::Selection::Field(field) => {
                    if !self.is_included(&field.directives) {
                        continue;
                    }
                    let key = field.alias.as_ref().unwrap_or(&field.name);
                    let value = match object.get(key.as_str()) {
                        Some(value) if !field.selection_set.is_empty() => {
                            let field_type = parent_type
                                .and_then(|parent| self.schema.field_type(parent, &field.name))
                                .map(|ty| ty.inner_named_type().clone());
                            self.project(value, &field.selection_set, field_type.as_deref())
                        }
                        Some(value) => value.clone(),
                        None if field.name == "__typename" => parent_type
                            .filter(|parent| self.schema.is_object(parent))
                            .map(|parent| Value::String(parent.into()))
                            .unwrap_or(Value::Null),
                        None => Value::Null,
                    };
                    merge_into(output, ByteString::from(key.as_str()), value);
                }
                ast::Selection::InlineFragment(fragment) => {
                    if !self.is_included(&fragment.directives) {
                        continue;
                    }
                    let fragment_type = match &fragment.type_condition {
                        Some(condition) if !self.applies(object, condition, parent_type) => {
                            continue;
                        }
                        Some(condition) => Some(condition.as_str()),
                        None => parent_type,
                    };
                    self.project_object(object, &fragment.selection_set, fragment_type, output);
                }
                ast::Selection::FragmentSpread(spread) => {
                    if !self.is_included(&spread.directives) {
                        continue;
                    }
                    let Some(fragment) = self.fragments.get(&spread.fragment_name) else {
                        continue;
                    };
                    if self.applies(object, &fragment.type_condition, parent_type) {
                        self.project_object(
                            object,
                            &fragment.selection_set,
                            Some(fragment.type_condition.as_str()),
                            output,
                        );
                    }
                }
            }
        }
    }

    fn applies(&self, object: &Object, condition: &str, parent_type: Option<&str>) -> bool {
        let typename = object
            .get("__typename")
            .and_then(|typename| typename.as_str())
            .or(parent_type.filter(|parent| self.schema.is_object(parent)));
        match typename {
            None => true,
            Some(typename) if typename == condition => true,
            Some(typename) => self.schema.types_overlap(condition, typename),
        }
    }

    fn is_included(&self, directives: &ast::DirectiveList) -> bool {
        directives.iter().all(|directive| {
            let condition = || {
                directive
                    .arguments
                    .iter()
                    .find(|argument| argument.name == "if")
                    .map(|argument| self.boolean(&argument.value))
            };
            match directive.name.as_str() {
                "skip" => condition() != Some(true),
                "include" => condition() != Some(false),
                _ => true,
            }
        })
    }

    fn boolean(&self, value: &ast::Value) -> bool {
        match value {
            ast::Value::Boolean(value) => *value,
            ast::Value::Variable(name) => {
                matches!(self.variables.get(name.as_str()), Some(Value::Bool(true)))
            }
            _ => false,
        }
    }
}

fn merge_into(output: &mut Object, key: ByteString, value: Value) {
    match output.entry(key) {
        Entry::Vacant(e) => {
            e.insert(value);
        }
        Entry::Occupied(e) => {
            e.into_mut().deep_merge(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    const SCHEMA: &str = r#"
        type Query { client(id: ID!): Client node: Node }
        interface Node { id: ID! }
        type Client implements Node { id: ID! name: String products: [Product] }
        type Product implements Node { id: ID! upc: String }
    "#;

    fn selections(document: &ast::Document) -> Vec<ast::Selection> {
        document
            .definitions
            .iter()
            .find_map(|definition| match definition {
                ast::Definition::OperationDefinition(operation) => {
                    Some(operation.selection_set.clone())
                }
                _ => None,
            })
            .unwrap()
    }

    fn fragments(document: &ast::Document) -> HashMap<Name, Node<ast::FragmentDefinition>> {
        document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                ast::Definition::FragmentDefinition(fragment) => {
                    Some((fragment.name.clone(), fragment.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn project(query: &str, variables: Object, value: Value) -> Value {
        let schema = Schema::parse_and_validate(SCHEMA, "schema.graphql").unwrap();
        let document = ast::Document::parse(query, "query.graphql").unwrap();
        let fragments = fragments(&document);
        Projection::new(&schema, &fragments, &variables).project(
            &value,
            &selections(&document),
            Some("Query"),
        )
    }

    #[test]
    fn hides_unrequested_fields() {
        let projected = project(
            r#"{ client(id: "1") { name } }"#,
            Object::new(),
            json!({"client": {"name": "Ada", "products": [{"id": "p1"}], "__typename": "Client"}}),
        );
        assert_eq!(projected, json!({"client": {"name": "Ada"}}));
    }

    #[test]
    fn follows_aliases_lists_and_missing_keys() {
        let projected = project(
            r#"{ c: client(id: "1") { name products { id } } }"#,
            Object::new(),
            json!({"c": {"products": [{"id": "p1", "upc": "u"}, {"id": "p2"}]}}),
        );
        assert_eq!(
            projected,
            json!({"c": {"name": null, "products": [{"id": "p1"}, {"id": "p2"}]}})
        );
    }

    #[test]
    fn fragments_by_typename() {
        let projected = project(
            r#"{ node { id ... on Product { upc } ...C } } fragment C on Client { name }"#,
            Object::new(),
            json!({"node": {"__typename": "Client", "id": "c1", "name": "Ada", "upc": "x"}}),
        );
        assert_eq!(
            projected,
            json!({"node": {"id": "c1", "name": "Ada", "__typename": "Client"}})
        );
    }

    #[test]
    fn concrete_types_drop_an_unselected_typename() {
        let projected = project(
            r#"{ node { ... on Client { products { id } } } }"#,
            Object::new(),
            json!({"node": {"__typename": "Client", "products": [{"__typename": "Product", "id": "p1"}]}}),
        );
        assert_eq!(
            projected,
            json!({"node": {"products": [{"id": "p1"}], "__typename": "Client"}})
        );
    }

    #[test]
    fn skip_and_include() {
        let mut variables = Object::new();
        variables.insert("withName", json!(false));
        let projected = project(
            r#"query($withName: Boolean!) { client(id: "1") { id @skip(if: true) name @include(if: $withName) __typename } }"#,
            variables,
            json!({"client": {"id": "1", "name": "Ada"}}),
        );
        assert_eq!(projected, json!({"client": {"__typename": "Client"}}));
    }
}
