use std::sync::Arc;
use std::sync::Mutex;

use apollo_compiler::ast;
use apollo_delegation::ExecutionParams;
use apollo_delegation::Executor;
use apollo_delegation::ExecutorResult;
use apollo_delegation::Schema;
use apollo_delegation::graphql::Request;
use apollo_delegation::graphql::Response;
use apollo_delegation::json_ext::Object;
use apollo_delegation::json_ext::Value;
use tower::BoxError;

pub(crate) const CLIENTS: &str = r#"
    type Query {
      client(id: ID!): Client
      clients: [Client]
    }
    type Subscription {
      clientChanged: Client
    }
    type Client {
      id: ID!
      name: String
      products: [Product]
    }
    type Product {
      id: ID!
    }
"#;

pub(crate) fn schema(sdl: &str) -> Schema {
    Schema::parse_and_validate(sdl, "schema.graphql").unwrap()
}

pub(crate) fn request(query: &str) -> Request {
    Request::builder()
        .document(ast::Document::parse(query, "query.graphql").unwrap())
        .build()
}

pub(crate) fn object(value: Value) -> Object {
    value.as_object().unwrap().clone()
}

/// Prints `query` the way documents built by the delegation print.
pub(crate) fn normalized(query: &str) -> String {
    ast::Document::parse(query, "expected.graphql")
        .unwrap()
        .to_string()
}

/// What an executor was asked to run.
#[derive(Clone, Debug)]
pub(crate) struct Executed {
    pub(crate) document: String,
    pub(crate) variables: Object,
}

/// An executor answering `response` synchronously, and the requests it received.
pub(crate) fn recording_executor(
    response: Response,
) -> (Arc<dyn Executor>, Arc<Mutex<Vec<Executed>>>) {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let log = executed.clone();
    let executor = move |params: ExecutionParams| {
        log.lock().unwrap().push(Executed {
            document: params.document.to_string(),
            variables: params.variables.clone(),
        });
        Ok::<_, BoxError>(ExecutorResult::Sync(response.clone()))
    };
    (Arc::new(executor), executed)
}
