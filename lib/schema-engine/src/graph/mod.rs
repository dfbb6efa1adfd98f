pub mod descriptors;
pub mod resolver;
pub mod sdl;
pub mod type_ref;

use std::sync::Arc;

use indexmap::IndexMap;

pub use descriptors::*;
pub use resolver::{
    FieldResolver, FragmentMap, PropertyResolver, RenamedFieldResolver, ResolveInfo, ResolverContext,
};
pub use type_ref::{TypeRef, TypeRefExt, BUILTIN_SCALARS};

pub const TYPENAME_FIELD: &str = "__typename";

/// An in-memory type system.
///
/// Types are kept in declaration order. Each type sits behind an `Arc` so that
/// transforms can hand unchanged types over to the graph they produce without
/// rebuilding them.
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    types: IndexMap<String, Arc<TypeDescriptor>>,
    query_type: String,
    mutation_type: Option<String>,
}

impl SchemaGraph {
    pub fn new(query_type: impl Into<String>) -> Self {
        Self {
            types: IndexMap::new(),
            query_type: query_type.into(),
            mutation_type: None,
        }
    }

    pub fn with_mutation_type(mut self, mutation_type: impl Into<String>) -> Self {
        self.mutation_type = Some(mutation_type.into());
        self
    }

    pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.insert_type(descriptor);
        self
    }

    /// Inserts or replaces a type. A replaced type keeps its position.
    pub fn insert_type(&mut self, descriptor: TypeDescriptor) {
        self.insert_shared(Arc::new(descriptor));
    }

    pub fn insert_shared(&mut self, descriptor: Arc<TypeDescriptor>) {
        self.types
            .insert(descriptor.name().to_string(), descriptor);
    }

    pub fn remove_type(&mut self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.shift_remove(name)
    }

    pub fn type_by_name(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name).map(Arc::as_ref)
    }

    pub fn shared_type(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(name)
    }

    pub fn contains_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values().map(Arc::as_ref)
    }

    pub fn shared_types(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.types.values()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDescriptor> {
        self.type_by_name(type_name)
            .and_then(|descriptor| descriptor.field(field_name))
    }

    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    pub fn set_mutation_type(&mut self, name: impl Into<String>) {
        self.mutation_type = Some(name.into());
    }

    pub fn is_root_type(&self, name: &str) -> bool {
        self.query_type == name || self.mutation_type.as_deref() == Some(name)
    }

    /// Scalars and enums. Built-in scalars count even when not declared.
    pub fn is_leaf_type(&self, name: &str) -> bool {
        BUILTIN_SCALARS.contains(&name)
            || self
                .type_by_name(name)
                .is_some_and(TypeDescriptor::is_leaf)
    }

    /// Whether a value of the concrete object type `candidate` may appear where
    /// `abstract_type` is expected.
    pub fn is_possible_type(&self, abstract_type: &str, candidate: &str) -> bool {
        if abstract_type == candidate {
            return true;
        }

        match self.type_by_name(abstract_type) {
            Some(TypeDescriptor::Union(union)) => union.members.iter().any(|m| m == candidate),
            Some(TypeDescriptor::Interface(_)) => self
                .type_by_name(candidate)
                .is_some_and(|t| t.interfaces().iter().any(|i| i == abstract_type)),
            _ => false,
        }
    }

    /// The concrete object types a value of `type_name` can have.
    pub fn possible_types(&self, type_name: &str) -> Vec<&str> {
        match self.type_by_name(type_name) {
            Some(TypeDescriptor::Object(object)) => vec![object.name.as_str()],
            Some(TypeDescriptor::Union(union)) => {
                union.members.iter().map(String::as_str).collect()
            }
            Some(TypeDescriptor::Interface(_)) => self
                .types()
                .filter(|t| {
                    matches!(t, TypeDescriptor::Object(_))
                        && t.interfaces().iter().any(|i| i == type_name)
                })
                .map(TypeDescriptor::name)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Builds a new graph from the same root names and the given types.
    pub(crate) fn with_types(&self, types: IndexMap<String, Arc<TypeDescriptor>>) -> Self {
        Self {
            types,
            query_type: self.query_type.clone(),
            mutation_type: self.mutation_type.clone(),
        }
    }

    pub(crate) fn into_parts(self) -> (IndexMap<String, Arc<TypeDescriptor>>, String, Option<String>) {
        (self.types, self.query_type, self.mutation_type)
    }

    pub(crate) fn from_parts(
        types: IndexMap<String, Arc<TypeDescriptor>>,
        query_type: String,
        mutation_type: Option<String>,
    ) -> Self {
        Self {
            types,
            query_type,
            mutation_type,
        }
    }
}
