use apollo_compiler::ast;

use crate::json_ext::Object;

/// A GraphQL request travelling through a transform chain: a parsed document and
/// the variable values it refers to.
///
/// Stages never edit a request in place; each one returns the request it hands on.
#[derive(Clone, Debug)]
pub struct Request {
    /// The parsed operation document.
    pub document: ast::Document,

    /// Variable values, keyed by variable name (without `$`).
    pub variables: Object,
}

#[buildstructor::buildstructor]
impl Request {
    #[builder(visibility = "pub")]
    fn new(document: ast::Document, variables: Option<Object>) -> Self {
        Self {
            document,
            variables: variables.unwrap_or_default(),
        }
    }

    /// The first operation definition of the document.
    pub fn operation(&self) -> Option<&ast::OperationDefinition> {
        self.document
            .definitions
            .iter()
            .find_map(|definition| match definition {
                ast::Definition::OperationDefinition(operation) => Some(operation.as_ref()),
                _ => None,
            })
    }

    /// The first field selected at the root of the first operation.
    pub fn root_field(&self) -> Option<&ast::Field> {
        self.operation()?
            .selection_set
            .iter()
            .find_map(|selection| match selection {
                ast::Selection::Field(field) => Some(field.as_ref()),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_field_skips_fragments() {
        let document = ast::Document::parse(
            "fragment F on Query { a } query Q { ...F client(id: \"1\") { name } }",
            "query.graphql",
        )
        .unwrap();
        let request = Request::builder().document(document).build();
        assert_eq!(request.operation().unwrap().name.as_ref().unwrap(), "Q");
        assert_eq!(request.root_field().unwrap().name, "client");
        assert!(request.variables.is_empty());
    }
}
