use std::collections::HashMap;
use std::collections::HashSet;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;

use crate::delegation_context::DelegationContext;
use crate::delegation_context::OperationKind;
use crate::error::TransformError;
use crate::graphql::Request;
use crate::schema::Schema;
use crate::transform::Transform;
use crate::transform::TransformContext;

/// Removes from the request everything the target schema cannot execute.
///
/// Fields the target type lacks, arguments and directives it does not define,
/// fragments on unknown or non-overlapping types and composite fields left without
/// selections are dropped, as are the fragment definitions, variable definitions and
/// variable values no longer used.
#[derive(Clone, Copy, Debug, Default)]
pub struct FilterToSchema;

impl Transform for FilterToSchema {
    fn name(&self) -> &str {
        "FilterToSchema"
    }

    fn transform_request(
        &self,
        request: Request,
        _transform_context: &TransformContext,
        delegation_context: &DelegationContext,
    ) -> Result<Request, TransformError> {
        Ok(filter_to_schema(&delegation_context.target_schema, request))
    }
}

pub(crate) fn filter_to_schema(schema: &Schema, request: Request) -> Request {
    let Request {
        document,
        mut variables,
    } = request;
    let fragments = filter_fragments(schema, &document);
    let filter = Filter {
        schema,
        fragments: fragments
            .iter()
            .map(|(name, fragment)| (name.clone(), fragment.type_condition.clone()))
            .collect(),
    };

    let mut definitions = Vec::new();
    let mut used_fragments = HashSet::new();
    let mut used_variables = HashSet::new();
    for definition in &document.definitions {
        let ast::Definition::OperationDefinition(operation) = definition else {
            continue;
        };
        let Some(root_type) = schema.root_operation(operation.operation_type.into()) else {
            tracing::debug!(
                operation = %OperationKind::from(operation.operation_type),
                "dropping operation without a root type in the target schema"
            );
            continue;
        };
        let selection_set = filter.selection_set(root_type, &operation.selection_set);
        let directives = filter.directives(&operation.directives);

        let mut operation_fragments = HashSet::new();
        collect_spreads(&selection_set, &mut operation_fragments);
        let mut pending = operation_fragments.iter().cloned().collect::<Vec<_>>();
        while let Some(name) = pending.pop() {
            if let Some(fragment) = fragments.get(&name) {
                let mut spreads = HashSet::new();
                collect_spreads(&fragment.selection_set, &mut spreads);
                for spread in spreads {
                    if operation_fragments.insert(spread.clone()) {
                        pending.push(spread);
                    }
                }
            }
        }

        let mut operation_variables = HashSet::new();
        collect_selection_variables(&selection_set, &mut operation_variables);
        collect_directive_variables(&directives, &mut operation_variables);
        for name in &operation_fragments {
            if let Some(fragment) = fragments.get(name) {
                collect_selection_variables(&fragment.selection_set, &mut operation_variables);
                collect_directive_variables(&fragment.directives, &mut operation_variables);
            }
        }

        definitions.push(ast::Definition::OperationDefinition(Node::new(
            ast::OperationDefinition {
                operation_type: operation.operation_type,
                name: operation.name.clone(),
                variables: operation
                    .variables
                    .iter()
                    .filter(|variable| operation_variables.contains(&variable.name))
                    .cloned()
                    .collect(),
                directives,
                selection_set,
            },
        )));
        used_fragments.extend(operation_fragments);
        used_variables.extend(operation_variables);
    }

    // keep the caller's fragment order
    for definition in &document.definitions {
        if let ast::Definition::FragmentDefinition(fragment) = definition
            && used_fragments.contains(&fragment.name)
            && let Some(filtered) = fragments.get(&fragment.name)
        {
            definitions.push(ast::Definition::FragmentDefinition(filtered.clone()));
        }
    }

    let unused = variables
        .keys()
        .filter(|name| !used_variables.contains(name.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    for name in unused {
        variables.remove(name.as_str());
    }
    let mut document = document;
    document.definitions = definitions;
    Request::builder()
        .document(document)
        .variables(variables)
        .build()
}

/// Fragment definitions filtered against their type condition.
///
/// A fragment left empty is removed, along with every spread of it, until no more
/// fragments become empty.
fn filter_fragments(
    schema: &Schema,
    document: &ast::Document,
) -> HashMap<Name, Node<ast::FragmentDefinition>> {
    let mut fragments = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            ast::Definition::FragmentDefinition(fragment)
                if schema.is_composite(&fragment.type_condition) =>
            {
                Some((fragment.name.clone(), fragment.clone()))
            }
            _ => None,
        })
        .collect::<HashMap<_, _>>();
    loop {
        let filter = Filter {
            schema,
            fragments: fragments
                .iter()
                .map(|(name, fragment)| (name.clone(), fragment.type_condition.clone()))
                .collect(),
        };
        let count = fragments.len();
        fragments = fragments
            .into_iter()
            .filter_map(|(name, fragment)| {
                let selection_set =
                    filter.selection_set(&fragment.type_condition, &fragment.selection_set);
                if selection_set.is_empty() {
                    return None;
                }
                let filtered = ast::FragmentDefinition {
                    name: fragment.name.clone(),
                    type_condition: fragment.type_condition.clone(),
                    directives: filter.directives(&fragment.directives),
                    selection_set,
                };
                Some((name, Node::new(filtered)))
            })
            .collect();
        if fragments.len() == count {
            return fragments;
        }
    }
}

struct Filter<'a> {
    schema: &'a Schema,
    /// Fragments that may be spread, to their type condition.
    fragments: HashMap<Name, Name>,
}

impl Filter<'_> {
    fn selection_set(&self, parent_type: &str, selections: &[ast::Selection]) -> Vec<ast::Selection> {
        selections
            .iter()
            .filter_map(|selection| match selection {
                ast::Selection::Field(field) => self.field(parent_type, field),
                ast::Selection::InlineFragment(fragment) => {
                    self.inline_fragment(parent_type, fragment)
                }
                ast::Selection::FragmentSpread(spread) => {
                    let type_condition = self.fragments.get(&spread.fragment_name)?;
                    if !self.schema.types_overlap(parent_type, type_condition) {
                        return None;
                    }
                    Some(ast::Selection::FragmentSpread(Node::new(ast::FragmentSpread {
                        fragment_name: spread.fragment_name.clone(),
                        directives: self.directives(&spread.directives),
                    })))
                }
            })
            .collect()
    }

    fn field(&self, parent_type: &str, field: &Node<ast::Field>) -> Option<ast::Selection> {
        let field_type = self.schema.field_type(parent_type, &field.name)?;
        let arguments = match self.schema.field_definition(parent_type, &field.name) {
            Some(definition) => field
                .arguments
                .iter()
                .filter(|argument| {
                    definition
                        .arguments
                        .iter()
                        .any(|known| known.name == argument.name)
                })
                .cloned()
                .collect(),
            // __typename
            None => Vec::new(),
        };
        let named_type = field_type.inner_named_type();
        let selection_set = if self.schema.is_composite(named_type) {
            let selection_set = self.selection_set(named_type, &field.selection_set);
            if selection_set.is_empty() {
                return None;
            }
            selection_set
        } else {
            Vec::new()
        };
        Some(ast::Selection::Field(Node::new(ast::Field {
            alias: field.alias.clone(),
            name: field.name.clone(),
            arguments,
            directives: self.directives(&field.directives),
            selection_set,
        })))
    }

    fn inline_fragment(
        &self,
        parent_type: &str,
        fragment: &Node<ast::InlineFragment>,
    ) -> Option<ast::Selection> {
        let fragment_type = match &fragment.type_condition {
            Some(type_condition) => {
                if !self.schema.is_composite(type_condition)
                    || !self.schema.types_overlap(parent_type, type_condition)
                {
                    return None;
                }
                type_condition.as_str()
            }
            None => parent_type,
        };
        let selection_set = self.selection_set(fragment_type, &fragment.selection_set);
        if selection_set.is_empty() {
            return None;
        }
        Some(ast::Selection::InlineFragment(Node::new(ast::InlineFragment {
            type_condition: fragment.type_condition.clone(),
            directives: self.directives(&fragment.directives),
            selection_set,
        })))
    }

    fn directives(&self, directives: &ast::DirectiveList) -> ast::DirectiveList {
        ast::DirectiveList(
            directives
                .iter()
                .filter(|directive| self.schema.has_directive(&directive.name))
                .cloned()
                .collect(),
        )
    }
}

fn collect_spreads(selections: &[ast::Selection], spreads: &mut HashSet<Name>) {
    for selection in selections {
        match selection {
            ast::Selection::Field(field) => collect_spreads(&field.selection_set, spreads),
            ast::Selection::InlineFragment(fragment) => {
                collect_spreads(&fragment.selection_set, spreads)
            }
            ast::Selection::FragmentSpread(spread) => {
                spreads.insert(spread.fragment_name.clone());
            }
        }
    }
}

fn collect_selection_variables(selections: &[ast::Selection], variables: &mut HashSet<Name>) {
    for selection in selections {
        match selection {
            ast::Selection::Field(field) => {
                for argument in &field.arguments {
                    collect_value_variables(&argument.value, variables);
                }
                collect_directive_variables(&field.directives, variables);
                collect_selection_variables(&field.selection_set, variables);
            }
            ast::Selection::InlineFragment(fragment) => {
                collect_directive_variables(&fragment.directives, variables);
                collect_selection_variables(&fragment.selection_set, variables);
            }
            ast::Selection::FragmentSpread(spread) => {
                collect_directive_variables(&spread.directives, variables);
            }
        }
    }
}

fn collect_directive_variables(directives: &ast::DirectiveList, variables: &mut HashSet<Name>) {
    for directive in directives.iter() {
        for argument in &directive.arguments {
            collect_value_variables(&argument.value, variables);
        }
    }
}

fn collect_value_variables(value: &ast::Value, variables: &mut HashSet<Name>) {
    match value {
        ast::Value::Variable(name) => {
            variables.insert(name.clone());
        }
        ast::Value::List(values) => {
            for value in values {
                collect_value_variables(value, variables);
            }
        }
        ast::Value::Object(fields) => {
            for (_, value) in fields {
                collect_value_variables(value, variables);
            }
        }
        _ => {}
    }
}
