//! GraphQL schema.

use std::fmt;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::ast;
use apollo_compiler::collections::HashMap;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::Implementers;
use apollo_compiler::validation::Valid;

use crate::delegation_context::OperationKind;
use crate::error::SchemaError;
use crate::stitching::StitchingInfo;

/// A validated, read-only GraphQL schema.
///
/// Cloning is cheap: the definitions are shared between clones. Delegation only ever
/// reads a schema; transforms that rewrite one produce a new value.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

struct SchemaInner {
    definitions: Valid<apollo_compiler::Schema>,
    implementers_map: HashMap<Name, Implementers>,
    extensions: SchemaExtensions,
}

/// Data attached to a schema by the composition layer.
#[derive(Clone, Debug, Default)]
pub struct SchemaExtensions {
    pub stitching_info: Option<Arc<StitchingInfo>>,
}

impl Schema {
    pub fn parse_and_validate(sdl: &str, path: &str) -> Result<Self, SchemaError> {
        let definitions = apollo_compiler::Schema::parse_and_validate(sdl, path)
            .map_err(|errors| SchemaError::Validate(errors.into()))?;
        Ok(Self::new(definitions))
    }

    pub fn new(definitions: Valid<apollo_compiler::Schema>) -> Self {
        Self::with_extensions(definitions, SchemaExtensions::default())
    }

    fn with_extensions(
        definitions: Valid<apollo_compiler::Schema>,
        extensions: SchemaExtensions,
    ) -> Self {
        let implementers_map = definitions.implementers_map();
        Self {
            inner: Arc::new(SchemaInner {
                definitions,
                implementers_map,
                extensions,
            }),
        }
    }

    /// Returns a copy of this schema carrying `stitching_info`.
    pub fn with_stitching_info(&self, stitching_info: Arc<StitchingInfo>) -> Self {
        Self::with_extensions(
            self.inner.definitions.clone(),
            SchemaExtensions {
                stitching_info: Some(stitching_info),
            },
        )
    }

    pub fn definitions(&self) -> &Valid<apollo_compiler::Schema> {
        &self.inner.definitions
    }

    pub fn extensions(&self) -> &SchemaExtensions {
        &self.inner.extensions
    }

    pub fn stitching_info(&self) -> Option<&Arc<StitchingInfo>> {
        self.inner.extensions.stitching_info.as_ref()
    }

    /// Whether both values share the same definitions.
    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn root_operation(&self, kind: OperationKind) -> Option<&Name> {
        self.inner.definitions.root_operation(kind.into())
    }

    /// The operation kind whose root type is `type_name`, if any.
    pub fn root_kind_of(&self, type_name: &str) -> Option<OperationKind> {
        [
            OperationKind::Query,
            OperationKind::Mutation,
            OperationKind::Subscription,
        ]
        .into_iter()
        .find(|kind| self.root_operation(*kind).is_some_and(|root| root == type_name))
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.inner.definitions.types.contains_key(type_name)
    }

    pub fn has_directive(&self, directive_name: &str) -> bool {
        self.inner
            .definitions
            .directive_definitions
            .contains_key(directive_name)
    }

    /// The declared type of `type_name.field_name`, including `__typename` on
    /// composite types.
    pub fn field_type(&self, type_name: &str, field_name: &str) -> Option<ast::Type> {
        if field_name == "__typename" {
            return self
                .is_composite(type_name)
                .then(|| ast::Type::Named(apollo_compiler::name!("String")).non_null());
        }
        self.field_definition(type_name, field_name)
            .map(|definition| definition.ty.clone())
    }

    pub fn field_definition(
        &self,
        type_name: &str,
        field_name: &str,
    ) -> Option<&ast::FieldDefinition> {
        let fields = match self.inner.definitions.types.get(type_name)? {
            ExtendedType::Object(object) => &object.fields,
            ExtendedType::Interface(interface) => &interface.fields,
            _ => return None,
        };
        let field: &ast::FieldDefinition = fields.get(field_name)?;
        Some(field)
    }

    pub fn is_object(&self, type_name: &str) -> bool {
        matches!(
            self.inner.definitions.types.get(type_name),
            Some(ExtendedType::Object(_))
        )
    }

    pub fn is_abstract(&self, type_name: &str) -> bool {
        matches!(
            self.inner.definitions.types.get(type_name),
            Some(ExtendedType::Interface(_) | ExtendedType::Union(_))
        )
    }

    pub fn is_composite(&self, type_name: &str) -> bool {
        self.is_object(type_name) || self.is_abstract(type_name)
    }

    /// Whether `maybe_subtype` is a member or implementer of `abstract_type`.
    pub fn is_subtype(&self, abstract_type: &str, maybe_subtype: &str) -> bool {
        self.inner
            .definitions
            .is_subtype(abstract_type, maybe_subtype)
    }

    /// The object types a value of `type_name` may have at runtime, sorted by name.
    pub fn possible_types(&self, type_name: &str) -> Vec<Name> {
        let mut possible = match self.inner.definitions.types.get(type_name) {
            Some(ExtendedType::Object(object)) => vec![object.name.clone()],
            Some(ExtendedType::Interface(_)) => self
                .inner
                .implementers_map
                .get(type_name)
                .map(|implementers| implementers.objects.iter().cloned().collect())
                .unwrap_or_default(),
            Some(ExtendedType::Union(union_)) => union_
                .members
                .iter()
                .map(|member| member.name.clone())
                .collect(),
            _ => Vec::new(),
        };
        possible.sort();
        possible
    }

    /// Whether a fragment on `type_condition` can apply to a value of `parent_type`.
    pub fn types_overlap(&self, parent_type: &str, type_condition: &str) -> bool {
        if parent_type == type_condition {
            return true;
        }
        match (self.is_abstract(parent_type), self.is_abstract(type_condition)) {
            (true, true) => {
                let parent_possible = self.possible_types(parent_type);
                self.possible_types(type_condition)
                    .iter()
                    .any(|possible| parent_possible.contains(possible))
            }
            (true, false) => self.is_subtype(parent_type, type_condition),
            (false, true) => self.is_subtype(type_condition, parent_type),
            (false, false) => false,
        }
    }
}

impl From<Valid<apollo_compiler::Schema>> for Schema {
    fn from(definitions: Valid<apollo_compiler::Schema>) -> Self {
        Self::new(definitions)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("types", &self.inner.definitions.types.len())
            .field("extensions", &self.inner.extensions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
        type Query {
            node(id: ID!): Node
            search: [SearchResult]
            me: User
        }
        type Mutation { rename(name: String): User }
        interface Node { id: ID! }
        type User implements Node { id: ID! name: String }
        type Product implements Node { id: ID! upc: String }
        type Review { body: String }
        union SearchResult = User | Review
    "#;

    fn schema() -> Schema {
        Schema::parse_and_validate(SCHEMA, "schema.graphql").unwrap()
    }

    #[test]
    fn root_operations() {
        let schema = schema();
        assert_eq!(schema.root_operation(OperationKind::Query).unwrap(), "Query");
        assert_eq!(
            schema.root_operation(OperationKind::Mutation).unwrap(),
            "Mutation"
        );
        assert!(schema.root_operation(OperationKind::Subscription).is_none());
        assert_eq!(schema.root_kind_of("Mutation"), Some(OperationKind::Mutation));
        assert_eq!(schema.root_kind_of("User"), None);
    }

    #[test]
    fn field_types() {
        let schema = schema();
        assert_eq!(schema.field_type("Query", "me").unwrap().to_string(), "User");
        assert_eq!(
            schema.field_type("Node", "__typename").unwrap().to_string(),
            "String!"
        );
        assert!(schema.field_type("User", "upc").is_none());
        assert!(schema.field_type("ID", "__typename").is_none());
    }

    #[test]
    fn abstract_types() {
        let schema = schema();
        assert!(schema.is_abstract("Node"));
        assert!(schema.is_abstract("SearchResult"));
        assert!(!schema.is_abstract("User"));
        let possible = |type_name: &str| -> Vec<String> {
            schema
                .possible_types(type_name)
                .iter()
                .map(|name| name.to_string())
                .collect()
        };
        assert_eq!(possible("Node"), ["Product", "User"]);
        assert_eq!(possible("SearchResult"), ["Review", "User"]);
        assert_eq!(possible("User"), ["User"]);
        assert!(schema.types_overlap("Node", "SearchResult"));
        assert!(schema.types_overlap("SearchResult", "Review"));
        assert!(!schema.types_overlap("Node", "Review"));
        assert!(!schema.types_overlap("User", "Product"));
    }

    #[test]
    fn stitching_info_is_attached_to_a_copy() {
        let schema = schema();
        let stitched = schema.with_stitching_info(Arc::new(StitchingInfo::default()));
        assert!(schema.stitching_info().is_none());
        assert!(stitched.stitching_info().is_some());
        assert!(!schema.ptr_eq(&stitched));
        assert!(schema.ptr_eq(&schema.clone()));
    }
}
