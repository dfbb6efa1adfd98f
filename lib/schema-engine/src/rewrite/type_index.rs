use std::collections::HashMap;

use crate::graph::{SchemaGraph, TypeKind, TypeRefExt};

#[derive(Debug, Clone)]
struct IndexedType {
    kind: TypeKind,
    /// Field name → named result type.
    fields: HashMap<String, String>,
}

/// The type information a document walk needs, captured from one schema.
#[derive(Debug, Clone)]
pub struct TypeIndex {
    types: HashMap<String, IndexedType>,
    query_type: String,
    mutation_type: Option<String>,
}

impl TypeIndex {
    pub fn from_graph(graph: &SchemaGraph) -> Self {
        let types = graph
            .types()
            .map(|descriptor| {
                let fields = descriptor
                    .fields()
                    .map(|fields| {
                        fields
                            .values()
                            .map(|f| (f.name.clone(), f.field_type.named_type().to_string()))
                            .collect()
                    })
                    .unwrap_or_default();

                (
                    descriptor.name().to_string(),
                    IndexedType {
                        kind: descriptor.kind(),
                        fields,
                    },
                )
            })
            .collect();

        Self {
            types,
            query_type: graph.query_type().to_string(),
            mutation_type: graph.mutation_type().map(str::to_string),
        }
    }

    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    pub fn kind(&self, type_name: &str) -> Option<TypeKind> {
        self.types.get(type_name).map(|t| t.kind)
    }

    /// The named result type of `type_name.field`.
    pub fn field_type(&self, type_name: &str, field: &str) -> Option<&str> {
        self.types
            .get(type_name)
            .and_then(|t| t.fields.get(field))
            .map(String::as_str)
    }

    /// Object and interface types own selectable fields; unions and leaves do not.
    pub fn owns_fields(&self, type_name: &str) -> bool {
        matches!(
            self.kind(type_name),
            Some(TypeKind::Object) | Some(TypeKind::Interface)
        )
    }
}
