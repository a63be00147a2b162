//! Built-in transforms.
//!
//! Every delegation installs the stages below around the subschema's own transforms.
//! They read their configuration from the [`DelegationContext`] of the call.
//!
//! [`DelegationContext`]: crate::DelegationContext

mod add_arguments_as_variables;
mod add_fragments_by_field;
mod add_selection_sets;
mod add_typename_to_abstract;
mod check_result_and_handle_errors;
mod expand_abstract_types;
mod filter_to_schema;
mod rename_root_fields;
mod wrap_concrete_types;

pub use add_arguments_as_variables::AddArgumentsAsVariables;
pub use add_fragments_by_field::AddFragmentsByField;
pub use add_selection_sets::AddSelectionSetsByField;
pub use add_selection_sets::AddSelectionSetsByType;
pub use add_typename_to_abstract::AddTypenameToAbstract;
pub use check_result_and_handle_errors::CheckResultAndHandleErrors;
pub use expand_abstract_types::ExpandAbstractTypes;
pub use filter_to_schema::FilterToSchema;
pub use rename_root_fields::RenameRootFields;
pub use wrap_concrete_types::WrapConcreteTypes;

#[cfg(test)]
pub(crate) mod test_utils {
    use std::sync::Arc;

    use apollo_compiler::ast;

    use crate::context::Context;
    use crate::delegation_context::DelegationContext;
    use crate::delegation_context::OperationKind;
    use crate::graphql::Request;
    use crate::json_ext::Object;
    use crate::resolve_info::ResolveInfo;
    use crate::schema::Schema;
    use crate::subschema::Subschema;

    pub(crate) fn schema(sdl: &str) -> Schema {
        Schema::parse_and_validate(sdl, "schema.graphql").unwrap()
    }

    pub(crate) fn request(query: &str) -> Request {
        Request::builder()
            .document(ast::Document::parse(query, "query.graphql").unwrap())
            .build()
    }

    /// A delegation of the first root field of `query`, resolved against `source`,
    /// to `target`.
    pub(crate) fn delegation_context(
        source: &Schema,
        target: impl Into<Subschema>,
        query: &str,
        args: Option<Object>,
    ) -> DelegationContext {
        let request = request(query);
        let info =
            ResolveInfo::for_root_field(source.clone(), &request.document, Object::new()).unwrap();
        DelegationContext::builder()
            .subschema(target)
            .operation(OperationKind::from(info.operation.operation_type))
            .field_name(info.field_name.clone())
            .and_args(args)
            .context(Context::new())
            .return_type(info.return_type.clone())
            .info(Arc::new(info))
            .original_request(request)
            .build()
    }

    /// Asserts that both documents print the same.
    pub(crate) fn assert_document(actual: &ast::Document, expected: &str) {
        let expected = ast::Document::parse(expected, "expected.graphql").unwrap();
        pretty_assertions::assert_eq!(actual.to_string(), expected.to_string());
    }
}
