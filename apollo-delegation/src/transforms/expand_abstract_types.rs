use std::collections::HashMap;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::schema::ExtendedType;

use crate::delegation_context::DelegationContext;
use crate::error::TransformError;
use crate::graphql::Request;
use crate::schema::Schema;
use crate::transform::Transform;
use crate::transform::TransformContext;
use crate::visitor;
use crate::visitor::Visitor;
use crate::visitor::inline_fragment;
use crate::visitor::selects_typename;
use crate::visitor::typename_field;

/// Rewrites fragments on abstract types the target does not know as abstract.
///
/// An abstract type of the caller's schema that is missing from the target, or
/// concrete there, is expanded into its possible types the target knows: each inline
/// fragment gets a sibling per possible type, and each named fragment a copy per
/// possible type named `<fragment>_<Type>`. Selection sets on those possible types also
/// select `__typename`. Fragments the target cannot apply are left for
/// [`FilterToSchema`](super::FilterToSchema) to remove.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpandAbstractTypes;

impl Transform for ExpandAbstractTypes {
    fn name(&self) -> &str {
        "ExpandAbstractTypes"
    }

    fn transform_request(
        &self,
        mut request: Request,
        _transform_context: &TransformContext,
        delegation_context: &DelegationContext,
    ) -> Result<Request, TransformError> {
        let Some(source) = delegation_context.source_schema() else {
            return Ok(request);
        };
        // the request still addresses the target as the backend transforms expose it
        let target = &delegation_context.transformed_schema;
        let possible_types = possible_types_map(source, target);
        if possible_types.is_empty() {
            return Ok(request);
        }
        let mut reverse_possible_types: HashMap<Name, Vec<Name>> = HashMap::new();
        for (abstract_type, possible) in &possible_types {
            for possible_type in possible {
                reverse_possible_types
                    .entry(possible_type.clone())
                    .or_default()
                    .push(abstract_type.clone());
            }
        }

        // named fragments on expanded types get one copy per possible type
        let mut replacements: HashMap<Name, Vec<(Name, Name)>> = HashMap::new();
        let mut new_fragments = Vec::new();
        for definition in &request.document.definitions {
            let ast::Definition::FragmentDefinition(fragment) = definition else {
                continue;
            };
            let Some(possible) = possible_types.get(&fragment.type_condition) else {
                continue;
            };
            for possible_type in possible {
                let fragment_name = format!("{}_{}", fragment.name, possible_type);
                let fragment_name = Name::new(&fragment_name)
                    .map_err(|_| TransformError::InvalidName(fragment_name))?;
                replacements
                    .entry(fragment.name.clone())
                    .or_default()
                    .push((fragment_name.clone(), possible_type.clone()));
                new_fragments.push(ast::Definition::FragmentDefinition(Node::new(
                    ast::FragmentDefinition {
                        name: fragment_name,
                        type_condition: possible_type.clone(),
                        directives: fragment.directives.clone(),
                        selection_set: fragment.selection_set.clone(),
                    },
                )));
            }
        }
        request.document.definitions.extend(new_fragments);

        let mut expander = Expander {
            schema: target,
            possible_types: &possible_types,
            reverse_possible_types: &reverse_possible_types,
            replacements: &replacements,
        };
        visitor::document(&mut expander, target, &mut request.document);
        Ok(request)
    }
}

/// Abstract types of `source` that `target` lacks or declares concrete, to their
/// possible types in `source` that `target` knows.
fn possible_types_map(source: &Schema, target: &Schema) -> HashMap<Name, Vec<Name>> {
    source
        .definitions()
        .types
        .iter()
        .filter(|(_, ty)| matches!(ty, ExtendedType::Interface(_) | ExtendedType::Union(_)))
        .filter(|(name, _)| !target.is_abstract(name))
        .map(|(name, _)| {
            let possible = source
                .possible_types(name)
                .into_iter()
                .filter(|possible| target.has_type(possible))
                .collect::<Vec<_>>();
            (name.clone(), possible)
        })
        .collect()
}

struct Expander<'a> {
    schema: &'a Schema,
    possible_types: &'a HashMap<Name, Vec<Name>>,
    reverse_possible_types: &'a HashMap<Name, Vec<Name>>,
    replacements: &'a HashMap<Name, Vec<(Name, Name)>>,
}

impl Visitor for Expander<'_> {
    fn enter_selection_set(
        &mut self,
        parent_type: Option<&str>,
        selections: &mut Vec<ast::Selection>,
    ) {
        let Some(parent_type) = parent_type else {
            return;
        };
        let mut additions = Vec::new();
        for selection in selections.iter() {
            match selection {
                ast::Selection::InlineFragment(fragment) => {
                    let Some(possible) = fragment
                        .type_condition
                        .as_ref()
                        .and_then(|condition| self.possible_types.get(condition))
                    else {
                        continue;
                    };
                    additions.extend(
                        possible
                            .iter()
                            .filter(|possible| self.schema.types_overlap(parent_type, possible))
                            .map(|possible| {
                                inline_fragment(
                                    Some(possible.clone()),
                                    fragment.selection_set.clone(),
                                )
                            }),
                    );
                }
                ast::Selection::FragmentSpread(spread) => {
                    let Some(replacements) = self.replacements.get(&spread.fragment_name) else {
                        continue;
                    };
                    additions.extend(
                        replacements
                            .iter()
                            .filter(|(_, possible)| {
                                self.schema.types_overlap(parent_type, possible)
                            })
                            .map(|(fragment_name, _)| {
                                ast::Selection::FragmentSpread(Node::new(ast::FragmentSpread {
                                    fragment_name: fragment_name.clone(),
                                    directives: spread.directives.clone(),
                                }))
                            }),
                    );
                }
                ast::Selection::Field(_) => {}
            }
        }
        if self.reverse_possible_types.contains_key(parent_type) && !selects_typename(selections)
        {
            additions.push(typename_field());
        }
        selections.extend(additions);
    }
}
