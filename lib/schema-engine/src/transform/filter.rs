use std::{collections::HashSet, sync::Arc};

use indexmap::IndexMap;
use tracing::{debug, instrument};

use crate::{
    error::SchemaBuildErrors,
    graph::{FieldDescriptor, SchemaGraph, TypeDescriptor, TypeRefExt},
};

use super::rename_fields::{rename_fields, renamer, FieldRename};

/// Keeps the fields `predicate` accepts. Accepting every field returns a graph of the
/// same shape, sharing every type with the input.
pub fn filter_fields<P>(graph: &SchemaGraph, predicate: P) -> Result<SchemaGraph, SchemaBuildErrors>
where
    P: Fn(&str, &FieldDescriptor) -> bool,
{
    rename_fields(
        graph,
        &renamer(|type_name, field| {
            if predicate(type_name, field) {
                FieldRename::Keep
            } else {
                FieldRename::Drop
            }
        }),
    )
    .map(|output| output.graph)
}

pub fn drop_deprecated(graph: &SchemaGraph) -> Result<SchemaGraph, SchemaBuildErrors> {
    filter_fields(graph, |_, field| !field.is_deprecated())
}

/// Removes the named types, along with every field, argument-bearing field, union
/// member and interface declaration pointing at them. Root types are never removed.
#[instrument(level = "trace", skip_all)]
pub fn filter_types(graph: &SchemaGraph, remove: &HashSet<String>) -> SchemaGraph {
    let removed: HashSet<&str> = remove
        .iter()
        .map(String::as_str)
        .filter(|name| graph.contains_type(name) && !graph.is_root_type(name))
        .collect();

    if removed.is_empty() {
        return graph.clone();
    }

    debug!("removing types {:?}", removed);

    let types: IndexMap<String, Arc<TypeDescriptor>> = graph
        .shared_types()
        .filter(|shared| !removed.contains(shared.name()))
        .map(|shared| {
            let next = prune_references(shared, &removed).map_or_else(|| shared.clone(), Arc::new);
            (shared.name().to_string(), next)
        })
        .collect();

    graph.with_types(types)
}

/// Removes object and interface types without fields and unions without members,
/// until none is left. References to removed types go with them.
#[instrument(level = "trace", skip_all)]
pub fn drop_empty_types(graph: &SchemaGraph) -> SchemaGraph {
    let mut current = graph.clone();

    loop {
        let empty: HashSet<String> = current
            .types()
            .filter(|t| !current.is_root_type(t.name()))
            .filter(|t| match t {
                TypeDescriptor::Object(object) => object.fields.is_empty(),
                TypeDescriptor::Interface(interface) => interface.fields.is_empty(),
                TypeDescriptor::Union(union) => union.members.is_empty(),
                _ => false,
            })
            .map(|t| t.name().to_string())
            .collect();

        if empty.is_empty() {
            return current;
        }

        current = filter_types(&current, &empty);
    }
}

fn references_removed(field: &FieldDescriptor, removed: &HashSet<&str>) -> bool {
    removed.contains(field.field_type.named_type())
        || field
            .arguments
            .iter()
            .any(|arg| removed.contains(arg.value_type.named_type()))
}

/// The type without its references to removed types, or `None` when it has none.
fn prune_references(shared: &TypeDescriptor, removed: &HashSet<&str>) -> Option<TypeDescriptor> {
    let mut descriptor = shared.clone();

    let changed = match &mut descriptor {
        TypeDescriptor::Object(object) => {
            let before = (object.fields.len(), object.interfaces.len());
            object.fields.retain(|_, field| !references_removed(field, removed));
            object.interfaces.retain(|i| !removed.contains(i.as_str()));
            before != (object.fields.len(), object.interfaces.len())
        }
        TypeDescriptor::Interface(interface) => {
            let before = (interface.fields.len(), interface.interfaces.len());
            interface.fields.retain(|_, field| !references_removed(field, removed));
            interface.interfaces.retain(|i| !removed.contains(i.as_str()));
            before != (interface.fields.len(), interface.interfaces.len())
        }
        TypeDescriptor::Union(union) => {
            let before = union.members.len();
            union.members.retain(|m| !removed.contains(m.as_str()));
            before != union.members.len()
        }
        TypeDescriptor::InputObject(input) => {
            let before = input.fields.len();
            input
                .fields
                .retain(|f| !removed.contains(f.value_type.named_type()));
            before != input.fields.len()
        }
        TypeDescriptor::Scalar(_) | TypeDescriptor::Enum(_) => false,
    };

    changed.then_some(descriptor)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc};

    use super::{drop_deprecated, drop_empty_types, filter_fields, filter_types};
    use crate::graph::SchemaGraph;

    fn schema() -> SchemaGraph {
        SchemaGraph::from_sdl(
            "local",
            r#"
            type Query {
              artist: Artist
              partner: Partner
              search: SearchResult
            }

            type Artist {
              name: String
              hometown: String @deprecated(reason: "Use location")
              partner: Partner
            }

            type Partner {
              secret: String
            }

            type Artwork {
              title: String
            }

            union SearchResult = Artist | Artwork
            "#,
        )
        .expect("valid schema")
    }

    #[test]
    fn accepting_every_field_is_a_no_op() {
        let graph = schema();
        let filtered = filter_fields(&graph, |_, _| true).expect("filtering never fails");

        assert_eq!(
            filtered.type_names().collect::<Vec<_>>(),
            graph.type_names().collect::<Vec<_>>()
        );
        for name in graph.type_names() {
            assert!(Arc::ptr_eq(
                graph.shared_type(name).expect("declared"),
                filtered.shared_type(name).expect("kept")
            ));
        }
        assert_eq!(filtered.to_sdl(), graph.to_sdl());
    }

    #[test]
    fn drops_deprecated_fields() {
        let filtered = drop_deprecated(&schema()).expect("filtering never fails");

        assert!(filtered.field("Artist", "hometown").is_none());
        assert!(filtered.field("Artist", "name").is_some());
    }

    #[test]
    fn removing_a_type_prunes_its_references() {
        let filtered = filter_types(&schema(), &HashSet::from(["Artwork".to_string()]));

        assert!(!filtered.contains_type("Artwork"));
        assert_eq!(filtered.possible_types("SearchResult"), vec!["Artist"]);
    }

    #[test]
    fn empty_types_are_dropped_until_none_is_left() {
        let graph = filter_fields(&schema(), |type_name, field| {
            !(type_name == "Partner" && field.name == "secret")
        })
        .expect("filtering never fails");
        assert!(graph.contains_type("Partner"));

        let cleaned = drop_empty_types(&graph);
        assert!(!cleaned.contains_type("Partner"));
        assert!(cleaned.field("Artist", "partner").is_none());
        assert!(cleaned.field("Query", "partner").is_none());
        assert!(cleaned.field("Query", "artist").is_some());
    }
}
