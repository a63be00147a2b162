use std::sync::Arc;

use apollo_compiler::ast;
use apollo_delegation::DelegateToSchema;
use apollo_delegation::DelegationResult;
use apollo_delegation::ResolveInfo;
use apollo_delegation::StitchingInfo;
use apollo_delegation::SubschemaConfig;
use apollo_delegation::delegate_to_schema;
use apollo_delegation::graphql;
use apollo_delegation::graphql::Response;
use apollo_delegation::json_ext::Object;
use apollo_delegation::json_ext::Path;
use serde_json_bytes::json;

use crate::common::CLIENTS;
use crate::common::normalized;
use crate::common::recording_executor;
use crate::common::schema;

/// The composed schema: the clients backend, with every client also fetching the
/// ids of its products for merging.
fn composed() -> apollo_delegation::Schema {
    let stitching_info = StitchingInfo::new()
        .with_selection_set_by_type("Client", "products { id }")
        .unwrap();
    schema(CLIENTS).with_stitching_info(Arc::new(stitching_info))
}

fn info(query: &str) -> Arc<ResolveInfo> {
    let document = ast::Document::parse(query, "query.graphql").unwrap();
    Arc::new(ResolveInfo::for_root_field(composed(), &document, Object::new()).unwrap())
}

fn delegate(query: &str, response: Response) -> (Response, Vec<String>) {
    let (executor, executed) = recording_executor(response);
    let config = SubschemaConfig::builder()
        .name("clients")
        .schema(schema(CLIENTS))
        .executor(executor)
        .build()
        .unwrap();
    let result = delegate_to_schema(
        DelegateToSchema::builder()
            .subschema(config)
            .info(info(query))
            .build(),
    )
    .unwrap();
    let DelegationResult::Response(response) = result else {
        panic!("expected a synchronous result");
    };
    let documents = executed
        .lock()
        .unwrap()
        .iter()
        .map(|executed| executed.document.clone())
        .collect();
    (response, documents)
}

#[test]
fn merge_selections_are_fetched_and_hidden() {
    let (response, documents) = delegate(
        r#"{ client(id: "1") { name } }"#,
        Response::builder()
            .data(json!({"client": {"name": "Ada", "products": [{"id": "p1"}]}}))
            .build(),
    );
    assert_eq!(
        documents,
        [normalized(r#"{ client(id: "1") { name products { id } } }"#)]
    );
    assert_eq!(response.data, Some(json!({"name": "Ada"})));
    assert!(response.errors.is_empty());
}

#[test]
fn errors_are_relocated_under_the_caller_alias() {
    let (response, _) = delegate(
        r#"{ c: client(id: "1") { name } }"#,
        Response::builder()
            .data(json!({"client": null}))
            .error(
                graphql::Error::builder()
                    .message("client not found")
                    .path(Path::from_slice(&["client"]))
                    .build(),
            )
            .build(),
    );
    assert_eq!(response.data, Some(json!(null)));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "client not found");
    assert_eq!(
        response.errors[0].path.as_ref().map(ToString::to_string),
        Some("/c".to_string())
    );
}
