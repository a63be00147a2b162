use std::collections::HashSet;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;

use crate::delegation_context::DelegationContext;
use crate::error::TransformError;
use crate::graphql::Request;
use crate::transform::Transform;
use crate::transform::TransformContext;

/// Passes the delegation's explicit arguments to the root field as variables.
///
/// Each argument the target root field defines becomes a variable named
/// `_v<n>_<argument>`, where `n` counts up from 0 and skips names the operation
/// already declares. The variable is declared with the argument's type in the target
/// schema and its value added to the request variables. Arguments the field does not
/// define are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddArgumentsAsVariables;

impl Transform for AddArgumentsAsVariables {
    fn name(&self) -> &str {
        "AddArgumentsAsVariables"
    }

    fn transform_request(
        &self,
        mut request: Request,
        _transform_context: &TransformContext,
        delegation_context: &DelegationContext,
    ) -> Result<Request, TransformError> {
        let Some(args) = delegation_context.args.as_ref().filter(|args| !args.is_empty())
        else {
            return Ok(request);
        };
        let schema = &delegation_context.target_schema;

        for definition in &mut request.document.definitions {
            let ast::Definition::OperationDefinition(operation) = definition else {
                continue;
            };
            let kind = operation.operation_type.into();
            let root_type = schema
                .root_operation(kind)
                .ok_or(TransformError::MissingRootType(kind))?
                .clone();
            let operation = operation.make_mut();
            let mut existing = operation
                .variables
                .iter()
                .map(|variable| variable.name.to_string())
                .collect::<HashSet<_>>();
            let mut counter = 0;
            let mut new_variables = Vec::new();

            for selection in &mut operation.selection_set {
                let ast::Selection::Field(field) = selection else {
                    continue;
                };
                let Some(definition) = schema.field_definition(&root_type, &field.name) else {
                    continue;
                };
                let field = field.make_mut();
                for argument in &definition.arguments {
                    let Some(value) = args.get(argument.name.as_str()) else {
                        continue;
                    };
                    let variable_name = loop {
                        let candidate = format!("_v{counter}_{}", argument.name);
                        counter += 1;
                        if !existing.contains(&candidate) {
                            break candidate;
                        }
                    };
                    existing.insert(variable_name.clone());
                    let variable_name = Name::new(&variable_name)
                        .map_err(|_| TransformError::InvalidName(variable_name))?;

                    let value_node = Node::new(ast::Value::Variable(variable_name.clone()));
                    match field
                        .arguments
                        .iter_mut()
                        .find(|known| known.name == argument.name)
                    {
                        Some(known) => known.make_mut().value = value_node,
                        None => field.arguments.push(Node::new(ast::Argument {
                            name: argument.name.clone(),
                            value: value_node,
                        })),
                    }
                    new_variables.push(Node::new(ast::VariableDefinition {
                        name: variable_name.clone(),
                        ty: argument.ty.clone(),
                        default_value: None,
                        directives: ast::DirectiveList::new(),
                    }));
                    request
                        .variables
                        .insert(variable_name.as_str(), value.clone());
                }
            }
            operation.variables.extend(new_variables);
        }
        Ok(request)
    }
}
