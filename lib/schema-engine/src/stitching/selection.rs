//! Building the selection set of a delegated sub-query.

use graphql_parser::{
    query::{Field, InlineFragment, Selection, SelectionSet, TypeCondition},
    Pos,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{
    graph::{FragmentMap, SchemaGraph, TypeRefExt, TYPENAME_FIELD},
    rewrite::QuerySelectionSet,
    transform::TypeRenameTable,
    values::substitute_variables,
};

/// The sub-selections of every node merged into one response key.
pub fn merge_field_selections(field_nodes: &[&Field<'static, String>]) -> QuerySelectionSet {
    let mut merged = empty_selection_set();

    for field in field_nodes {
        merged
            .items
            .extend(field.selection_set.items.iter().cloned());
    }

    merged
}

/// Replaces every fragment spread with an inline fragment of the same type condition.
pub fn inline_fragment_spreads(selection_set: &mut QuerySelectionSet, fragments: &FragmentMap) {
    let mut visiting = Vec::new();
    inline_spreads_in(selection_set, fragments, &mut visiting);
}

fn inline_spreads_in(
    selection_set: &mut QuerySelectionSet,
    fragments: &FragmentMap,
    visiting: &mut Vec<String>,
) {
    let items = std::mem::take(&mut selection_set.items);

    for selection in items {
        match selection {
            Selection::FragmentSpread(spread) => {
                if visiting.contains(&spread.fragment_name) {
                    continue;
                }

                let Some(fragment) = fragments.get(&spread.fragment_name) else {
                    continue;
                };

                let mut fragment_selection = fragment.selection_set.clone();
                visiting.push(spread.fragment_name.clone());
                inline_spreads_in(&mut fragment_selection, fragments, visiting);
                visiting.pop();

                selection_set
                    .items
                    .push(Selection::InlineFragment(InlineFragment {
                        position: spread.position,
                        type_condition: Some(fragment.type_condition.clone()),
                        directives: spread.directives,
                        selection_set: fragment_selection,
                    }));
            }
            Selection::Field(mut field) => {
                inline_spreads_in(&mut field.selection_set, fragments, visiting);
                selection_set.items.push(Selection::Field(field));
            }
            Selection::InlineFragment(mut fragment) => {
                inline_spreads_in(&mut fragment.selection_set, fragments, visiting);
                selection_set.items.push(Selection::InlineFragment(fragment));
            }
        }
    }
}

/// Turns a selection written against the public type names into one the remote
/// schema understands.
pub struct RemoteSelection<'a> {
    /// The remote schema under its own names.
    pub graph: &'a SchemaGraph,
    pub type_renames: &'a TypeRenameTable,
    pub variables: &'a Map<String, Value>,
}

impl RemoteSelection<'_> {
    /// Maps type conditions back to remote names, inlines variables and asks for
    /// `__typename` on every composite selection.
    pub fn prepare(&self, selection_set: &mut QuerySelectionSet, scope: &str) {
        if selection_set.items.is_empty() {
            return;
        }

        let mut selects_typename = false;

        for selection in selection_set.items.iter_mut() {
            match selection {
                Selection::Field(field) => {
                    self.inline_directive_variables(&mut field.directives);

                    if field.name == TYPENAME_FIELD {
                        selects_typename |= field.alias.is_none();
                        continue;
                    }

                    let descriptor = self.graph.field(scope, &field.name);
                    for (name, value) in field.arguments.iter_mut() {
                        let value_type = descriptor
                            .and_then(|d| d.argument(name))
                            .map(|argument| &argument.value_type);
                        *value = substitute_variables(value, value_type, self.variables, self.graph);
                    }

                    let child_scope = descriptor
                        .map(|d| d.field_type.named_type().to_string())
                        .unwrap_or_else(|| scope.to_string());
                    self.prepare(&mut field.selection_set, &child_scope);
                }
                Selection::InlineFragment(fragment) => {
                    self.inline_directive_variables(&mut fragment.directives);

                    let child_scope = match &mut fragment.type_condition {
                        Some(TypeCondition::On(type_name)) => {
                            let original = self.type_renames.original_of(type_name).to_string();
                            *type_name = original.clone();
                            original
                        }
                        None => scope.to_string(),
                    };
                    self.prepare(&mut fragment.selection_set, &child_scope);
                }
                Selection::FragmentSpread(_) => {}
            }
        }

        if !selects_typename {
            selection_set
                .items
                .insert(0, Selection::Field(typename_field()));
        }
    }

    fn inline_directive_variables(
        &self,
        directives: &mut [graphql_parser::query::Directive<'static, String>],
    ) {
        for directive in directives.iter_mut() {
            for (_, value) in directive.arguments.iter_mut() {
                *value = substitute_variables(value, None, self.variables, self.graph);
            }
        }
    }
}

/// Rewrites the `__typename` values of a remote result into the public type names.
///
/// The result is walked along the selection it answers, so only response keys that
/// select `__typename` at that position are touched.
pub fn map_result_typenames(
    value: &mut Value,
    selection_set: &QuerySelectionSet,
    renames: &TypeRenameTable,
) {
    map_typenames_in(value, &[selection_set], renames);
}

fn map_typenames_in(value: &mut Value, selection_sets: &[&QuerySelectionSet], renames: &TypeRenameTable) {
    match value {
        Value::Object(entries) => {
            let mut by_key: IndexMap<&str, (bool, Vec<&QuerySelectionSet>)> = IndexMap::new();
            for set in selection_sets {
                collect_by_key(set, &mut by_key);
            }

            for (key, (is_typename, sub_selections)) in by_key {
                let Some(entry) = entries.get_mut(key) else {
                    continue;
                };

                match entry {
                    Value::String(type_name) if is_typename => {
                        *type_name = renames.public_of(type_name).to_string();
                    }
                    other => map_typenames_in(other, &sub_selections, renames),
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                map_typenames_in(item, selection_sets, renames);
            }
        }
        _ => {}
    }
}

/// Groups the fields of a selection set, inline fragments included, by response key.
fn collect_by_key<'s>(
    selection_set: &'s QuerySelectionSet,
    by_key: &mut IndexMap<&'s str, (bool, Vec<&'s QuerySelectionSet>)>,
) {
    for selection in &selection_set.items {
        match selection {
            Selection::Field(field) => {
                let key = field.alias.as_deref().unwrap_or(&field.name);
                let (is_typename, sub_selections) = by_key.entry(key).or_default();
                *is_typename |= field.name == TYPENAME_FIELD;
                sub_selections.push(&field.selection_set);
            }
            Selection::InlineFragment(fragment) => collect_by_key(&fragment.selection_set, by_key),
            Selection::FragmentSpread(_) => {}
        }
    }
}

pub fn empty_selection_set() -> QuerySelectionSet {
    SelectionSet {
        span: (Pos::default(), Pos::default()),
        items: Vec::new(),
    }
}

pub(crate) fn typename_field() -> Field<'static, String> {
    Field {
        position: Pos::default(),
        alias: None,
        name: TYPENAME_FIELD.to_string(),
        arguments: Vec::new(),
        directives: Vec::new(),
        selection_set: empty_selection_set(),
    }
}
