use apollo_compiler::ast;

use crate::delegation_context::DelegationContext;
use crate::error::TransformError;
use crate::graphql::Request;
use crate::schema::Schema;
use crate::transform::Transform;
use crate::transform::TransformContext;
use crate::visitor;
use crate::visitor::Visitor;
use crate::visitor::selects_typename;
use crate::visitor::typename_field;

/// Selects `__typename` in every selection set on an abstract type of the target, so
/// the concrete type of each returned object is known.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddTypenameToAbstract;

impl Transform for AddTypenameToAbstract {
    fn name(&self) -> &str {
        "AddTypenameToAbstract"
    }

    fn transform_request(
        &self,
        mut request: Request,
        _transform_context: &TransformContext,
        delegation_context: &DelegationContext,
    ) -> Result<Request, TransformError> {
        let schema = &delegation_context.target_schema;
        visitor::document(&mut TypenameAdder { schema }, schema, &mut request.document);
        Ok(request)
    }
}

struct TypenameAdder<'a> {
    schema: &'a Schema,
}

impl Visitor for TypenameAdder<'_> {
    fn leave_selection_set(
        &mut self,
        parent_type: Option<&str>,
        selections: &mut Vec<ast::Selection>,
    ) {
        if parent_type.is_some_and(|parent_type| self.schema.is_abstract(parent_type))
            && !selects_typename(selections)
        {
            selections.push(typename_field());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::test_utils::assert_document;
    use crate::transforms::test_utils::delegation_context;
    use crate::transforms::test_utils::request;
    use crate::transforms::test_utils::schema;

    const SCHEMA: &str = r#"
        type Query { node(id: ID!): Node search: [Result] }
        interface Node { id: ID! }
        union Result = Client
        type Client implements Node { id: ID! name: String }
    "#;

    fn run(query: &str) -> Request {
        let context = delegation_context(&schema(SCHEMA), schema(SCHEMA), query, None);
        AddTypenameToAbstract
            .transform_request(request(query), &TransformContext::default(), &context)
            .unwrap()
    }

    #[test]
    fn adds_typename_to_abstract_selections() {
        let request = run(r#"{ node(id: "1") { id ... on Client { name } } }"#);
        assert_document(
            &request.document,
            r#"{ node(id: "1") { id ... on Client { name } __typename } }"#,
        );
    }

    #[test]
    fn aliased_typename_does_not_count() {
        let request = run(r#"{ search { t: __typename } }"#);
        assert_document(
            &request.document,
            r#"{ search { t: __typename __typename } }"#,
        );
    }

    #[test]
    fn keeps_existing_typename() {
        let query = r#"{ node(id: "1") { __typename id } }"#;
        assert_document(&run(query).document, query);
    }
}
