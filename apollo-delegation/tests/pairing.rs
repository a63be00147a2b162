use std::sync::Arc;

use apollo_compiler::ast;
use apollo_compiler::name;
use apollo_delegation::DelegateToSchema;
use apollo_delegation::ResolveInfo;
use apollo_delegation::SubschemaConfig;
use apollo_delegation::Transform;
use apollo_delegation::delegate_to_schema;
use apollo_delegation::graphql::Response;
use apollo_delegation::json_ext::Object;
use apollo_delegation::transforms::RenameRootFields;
use serde_json_bytes::Value;
use serde_json_bytes::json;

use crate::common::CLIENTS;
use crate::common::normalized;
use crate::common::recording_executor;
use crate::common::schema;

const NODES: &str = r#"
    type Query {
      node(id: ID!): Node
    }
    interface Node {
      id: ID!
    }
    type Client implements Node {
      id: ID!
      name: String
    }
"#;

/// Delegates `query`, written against the fully renamed schema, through `prefixes`
/// applied in order. Returns the document the backend ran and the result data.
async fn delegate(prefixes: &[&str], query: &str, data: Value) -> (String, Option<Value>) {
    delegate_to(CLIENTS, prefixes, None, query, data).await
}

async fn delegate_to(
    sdl: &str,
    prefixes: &[&str],
    return_type: Option<ast::Type>,
    query: &str,
    data: Value,
) -> (String, Option<Value>) {
    let (executor, executed) = recording_executor(Response::builder().data(data).build());
    let transforms = prefixes
        .iter()
        .map(|prefix| Arc::new(RenameRootFields::prefixed(*prefix)) as Arc<dyn Transform>)
        .collect::<Vec<_>>();
    let config = Arc::new(
        SubschemaConfig::builder()
            .name("clients")
            .schema(schema(sdl))
            .executor(executor)
            .transforms(transforms)
            .build()
            .unwrap(),
    );
    let document = ast::Document::parse(query, "query.graphql").unwrap();
    let info = ResolveInfo::for_root_field(
        config.transformed_schema().clone(),
        &document,
        Object::new(),
    )
    .unwrap();

    let response = delegate_to_schema(
        DelegateToSchema::builder()
            .subschema(config)
            .info(Arc::new(info))
            .and_return_type(return_type)
            .build(),
    )
    .unwrap()
    .into_response()
    .await
    .unwrap();
    let document = executed.lock().unwrap()[0].document.clone();
    (document, response.data)
}

#[tokio::test]
async fn each_transform_sees_its_own_schemas() {
    let (document, data) = delegate(
        &["a_", "b_"],
        r#"{ b_a_client(id: "1") { name } }"#,
        json!({"b_a_client": {"name": "Ada"}}),
    )
    .await;
    assert_eq!(
        document,
        normalized(r#"{ b_a_client: client(id: "1") { name } }"#)
    );
    assert_eq!(data, Some(json!({"name": "Ada"})));
}

#[tokio::test]
async fn a_single_transform_is_paired_with_the_target() {
    let (document, data) = delegate(
        &["crm_"],
        r#"{ crm_client(id: "1") { name } }"#,
        json!({"crm_client": {"name": "Ada"}}),
    )
    .await;
    assert_eq!(
        document,
        normalized(r#"{ crm_client: client(id: "1") { name } }"#)
    );
    assert_eq!(data, Some(json!({"name": "Ada"})));
}

#[tokio::test]
async fn abstract_root_fields_are_narrowed_behind_renames() {
    let (document, data) = delegate_to(
        NODES,
        &["crm_"],
        Some(ast::Type::Named(name!("Client"))),
        r#"{ crm_node(id: "1") { id name } }"#,
        json!({"crm_node": {"__typename": "Client", "id": "1", "name": "Ada"}}),
    )
    .await;
    assert_eq!(
        document,
        normalized(r#"{ crm_node: node(id: "1") { ... on Client { id name } __typename } }"#)
    );
    assert_eq!(data, Some(json!({"id": "1", "name": "Ada"})));
}
