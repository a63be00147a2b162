//! Building the request of a delegation from the caller's resolver info.

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;

use crate::delegation_context::OperationKind;
use crate::graphql::Request;
use crate::resolve_info::ResolveInfo;
use crate::schema::Schema;

/// The operation a field of `parent_type` delegates as: a mutation or subscription
/// when `parent_type` is that root type of `schema`, a query otherwise.
pub fn delegating_operation(parent_type: &str, schema: &Schema) -> OperationKind {
    match schema.root_kind_of(parent_type) {
        Some(OperationKind::Mutation) => OperationKind::Mutation,
        Some(OperationKind::Subscription) => OperationKind::Subscription,
        _ => OperationKind::Query,
    }
}

/// A request selecting `field_name` at the root of an `operation`, with the arguments
/// and merged selections of every field node of `info`.
///
/// The caller's fragments, variable definitions and variable values are carried
/// over; the stages of the chain prune what the target does not need.
pub fn create_request_from_info(
    info: &ResolveInfo,
    operation: OperationKind,
    field_name: &Name,
) -> Request {
    let mut arguments: Vec<Node<ast::Argument>> = Vec::new();
    let mut selection_set = Vec::new();
    for field_node in &info.field_nodes {
        for argument in &field_node.arguments {
            match arguments.iter_mut().find(|known| known.name == argument.name) {
                Some(known) => *known = argument.clone(),
                None => arguments.push(argument.clone()),
            }
        }
        selection_set.extend(field_node.selection_set.iter().cloned());
    }

    let root_field = ast::Field {
        alias: None,
        name: field_name.clone(),
        arguments,
        directives: ast::DirectiveList::new(),
        selection_set,
    };

    let mut document = ast::Document::new();
    document
        .definitions
        .push(ast::Definition::OperationDefinition(Node::new(
            ast::OperationDefinition {
                operation_type: operation.into(),
                name: info.operation.name.clone(),
                variables: info.operation.variables.clone(),
                directives: ast::DirectiveList::new(),
                selection_set: vec![ast::Selection::Field(Node::new(root_field))],
            },
        )));
    let mut fragments = info.fragments.values().cloned().collect::<Vec<_>>();
    fragments.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
    document.definitions.extend(
        fragments
            .into_iter()
            .map(ast::Definition::FragmentDefinition),
    );

    Request::builder()
        .document(document)
        .variables(info.variable_values.clone())
        .build()
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::json_ext::Object;

    const SCHEMA: &str = r#"
        type Query { client(id: ID!): Client }
        type Mutation { renameClient(id: ID!, name: String!): Client }
        type Subscription { clientChanged: Client }
        type Client { id: ID! name: String }
    "#;

    #[test]
    fn operation_from_parent_type() {
        let schema = Schema::parse_and_validate(SCHEMA, "schema.graphql").unwrap();
        assert_eq!(delegating_operation("Query", &schema), OperationKind::Query);
        assert_eq!(
            delegating_operation("Mutation", &schema),
            OperationKind::Mutation
        );
        assert_eq!(
            delegating_operation("Subscription", &schema),
            OperationKind::Subscription
        );
        assert_eq!(delegating_operation("Client", &schema), OperationKind::Query);
    }

    #[test]
    fn request_from_info() {
        let schema = Schema::parse_and_validate(SCHEMA, "schema.graphql").unwrap();
        let document = ast::Document::parse(
            r#"query Q($id: ID!) { c: client(id: $id) { ...F } } fragment F on Client { name }"#,
            "query.graphql",
        )
        .unwrap();
        let mut variables = Object::new();
        variables.insert("id", json!("1"));
        let info = ResolveInfo::for_root_field(schema, &document, variables).unwrap();
        let request = create_request_from_info(&info, OperationKind::Query, &info.field_name);

        let expected = ast::Document::parse(
            r#"query Q($id: ID!) { client(id: $id) { ...F } } fragment F on Client { name }"#,
            "expected.graphql",
        )
        .unwrap();
        assert_eq!(request.document.to_string(), expected.to_string());
        assert_eq!(request.variables.get("id"), Some(&json!("1")));
    }
}
