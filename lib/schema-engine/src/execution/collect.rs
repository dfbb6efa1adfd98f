use std::collections::HashSet;

use graphql_parser::query::{Directive, Field, Selection, TypeCondition};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{
    graph::{FragmentMap, SchemaGraph},
    rewrite::QuerySelectionSet,
    values::value_from_ast,
};

pub type GroupedFields<'a> = IndexMap<String, Vec<&'a Field<'static, String>>>;

/// Groups the fields selected on `object_type` by response key, following fragments
/// whose type condition applies and leaving out skipped selections.
pub fn collect_fields<'a>(
    schema: &SchemaGraph,
    fragments: &'a FragmentMap,
    variables: &Map<String, Value>,
    object_type: &str,
    selection_sets: &[&'a QuerySelectionSet],
) -> GroupedFields<'a> {
    let mut grouped = GroupedFields::new();
    let mut visited = HashSet::new();

    for selection_set in selection_sets {
        collect_into(
            schema,
            fragments,
            variables,
            object_type,
            selection_set,
            &mut visited,
            &mut grouped,
        );
    }

    grouped
}

fn collect_into<'a>(
    schema: &SchemaGraph,
    fragments: &'a FragmentMap,
    variables: &Map<String, Value>,
    object_type: &str,
    selection_set: &'a QuerySelectionSet,
    visited: &mut HashSet<&'a str>,
    grouped: &mut GroupedFields<'a>,
) {
    for selection in &selection_set.items {
        match selection {
            Selection::Field(field) => {
                if is_skipped(&field.directives, variables) {
                    continue;
                }

                let key = field.alias.as_ref().unwrap_or(&field.name);
                grouped.entry(key.clone()).or_default().push(field);
            }
            Selection::InlineFragment(fragment) => {
                if is_skipped(&fragment.directives, variables) {
                    continue;
                }

                if let Some(TypeCondition::On(condition)) = &fragment.type_condition {
                    if !schema.is_possible_type(condition, object_type) {
                        continue;
                    }
                }

                collect_into(
                    schema,
                    fragments,
                    variables,
                    object_type,
                    &fragment.selection_set,
                    visited,
                    grouped,
                );
            }
            Selection::FragmentSpread(spread) => {
                if is_skipped(&spread.directives, variables) {
                    continue;
                }

                let Some((name, fragment)) = fragments.get_key_value(&spread.fragment_name) else {
                    continue;
                };

                if !visited.insert(name.as_str()) {
                    continue;
                }

                let TypeCondition::On(condition) = &fragment.type_condition;
                if !schema.is_possible_type(condition, object_type) {
                    continue;
                }

                collect_into(
                    schema,
                    fragments,
                    variables,
                    object_type,
                    &fragment.selection_set,
                    visited,
                    grouped,
                );
            }
        }
    }
}

/// `@skip(if: true)` or `@include(if: false)`.
fn is_skipped(directives: &[Directive<'static, String>], variables: &Map<String, Value>) -> bool {
    directives.iter().any(|directive| {
        let condition = directive
            .arguments
            .iter()
            .find(|(name, _)| name == "if")
            .map(|(_, value)| value_from_ast(value, variables));

        match (directive.name.as_str(), condition) {
            ("skip", Some(Value::Bool(true))) => true,
            ("include", Some(Value::Bool(false))) => true,
            _ => false,
        }
    })
}
