use std::{collections::HashMap, sync::Arc};

use graphql_parser::schema::{Definition, TypeExtension};
use tracing::{debug, instrument, trace};

use crate::{
    error::{SchemaBuildError, SchemaBuildErrors},
    graph::{
        sdl::{field_from_ast, parse_schema_document, type_from_definition, unknown_type_references},
        FieldDescriptor, FieldResolver, ObjectTypeDescriptor, SchemaGraph, TypeDescriptor,
        TYPENAME_FIELD,
    },
};

use super::{DelegatingResolver, DelegationDescriptor, RemoteSchema};

/// Fields added to existing types, and new types, written against the renamed
/// remote type names.
pub struct SchemaExtension {
    name: String,
    sdl: String,
    resolvers: HashMap<(String, String), Arc<dyn FieldResolver>>,
}

impl SchemaExtension {
    pub fn new(name: impl Into<String>, sdl: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sdl: sdl.into(),
            resolvers: HashMap::new(),
        }
    }

    pub fn with_resolver(
        mut self,
        type_name: &str,
        field: &str,
        resolver: Arc<dyn FieldResolver>,
    ) -> Self {
        self.resolvers
            .insert((type_name.to_string(), field.to_string()), resolver);
        self
    }

    /// Resolves `type_name.field` by delegating it.
    pub fn with_delegation(self, type_name: &str, field: &str, delegation: DelegationDescriptor) -> Self {
        self.with_resolver(type_name, field, Arc::new(DelegatingResolver::new(delegation)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn resolver(&self, type_name: &str, field: &str) -> Option<Arc<dyn FieldResolver>> {
        self.resolvers
            .get(&(type_name.to_string(), field.to_string()))
            .cloned()
    }
}

/// Merges renamed remote schemas and extensions into the local graph.
///
/// Merging only adds: types already declared, fields already present on their
/// type, and extensions of types nobody declares are errors. Every error of the
/// merge is reported.
#[instrument(level = "trace", skip_all)]
pub fn merge(
    local: SchemaGraph,
    remotes: &[RemoteSchema],
    extensions: &[SchemaExtension],
) -> Result<SchemaGraph, SchemaBuildErrors> {
    let mut graph = local;
    let mut errors = SchemaBuildErrors::default();

    for remote in remotes {
        merge_remote(&mut graph, remote, &mut errors);
    }

    for extension in extensions {
        apply_extension(&mut graph, extension, &mut errors);
    }

    errors.extend(unknown_type_references(&graph));
    errors.into_result(graph)
}

fn merge_remote(graph: &mut SchemaGraph, remote: &RemoteSchema, errors: &mut SchemaBuildErrors) {
    let remote_graph = remote.graph();
    let mut merged_types = 0;

    for shared in remote_graph.shared_types() {
        let name = shared.name();
        if remote_graph.is_root_type(name) {
            continue;
        }

        if graph.contains_type(name) {
            errors.push(SchemaBuildError::TypeCollision {
                type_name: name.to_string(),
            });
            continue;
        }

        graph.insert_shared(shared.clone());
        merged_types += 1;
    }

    debug!(
        "merged {} type(s) of remote schema '{}'",
        merged_types,
        remote.name()
    );

    if !remote.options().expose_root_fields {
        return;
    }

    let query_fields = root_fields(remote_graph, Some(remote_graph.query_type()));
    let target = graph.query_type().to_string();
    add_fields(graph, &target, query_fields, errors);

    let mutation_fields = root_fields(remote_graph, remote_graph.mutation_type());
    if !mutation_fields.is_empty() {
        let target = match graph.mutation_type() {
            Some(name) => name.to_string(),
            None => {
                graph.insert_type(TypeDescriptor::Object(ObjectTypeDescriptor::new("Mutation")));
                graph.set_mutation_type("Mutation");
                "Mutation".to_string()
            }
        };
        add_fields(graph, &target, mutation_fields, errors);
    }
}

fn root_fields(graph: &SchemaGraph, root: Option<&str>) -> Vec<FieldDescriptor> {
    root.and_then(|name| graph.type_by_name(name))
        .and_then(TypeDescriptor::fields)
        .map(|fields| {
            fields
                .values()
                .filter(|field| field.name != TYPENAME_FIELD)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Adds fields to an object or interface type, reporting the ones it already has.
fn add_fields(
    graph: &mut SchemaGraph,
    type_name: &str,
    fields: Vec<FieldDescriptor>,
    errors: &mut SchemaBuildErrors,
) {
    let Some(existing) = graph.type_by_name(type_name) else {
        errors.push(SchemaBuildError::UnknownExtensionTarget {
            type_name: type_name.to_string(),
        });
        return;
    };

    let mut extended = existing.clone();
    let Some(field_map) = extended.fields_mut() else {
        errors.push(SchemaBuildError::UnknownExtensionTarget {
            type_name: type_name.to_string(),
        });
        return;
    };

    for field in fields {
        if field_map.contains_key(&field.name) {
            errors.push(SchemaBuildError::DuplicateField {
                type_name: type_name.to_string(),
                field: field.name,
            });
            continue;
        }

        trace!("adding field '{}.{}'", type_name, field.name);
        field_map.insert(field.name.clone(), field);
    }

    graph.insert_type(extended);
}

fn apply_extension(graph: &mut SchemaGraph, extension: &SchemaExtension, errors: &mut SchemaBuildErrors) {
    let document = match parse_schema_document(extension.name(), &extension.sdl) {
        Ok(document) => document,
        Err(err) => {
            errors.push(err);
            return;
        }
    };

    for definition in &document.definitions {
        if let Definition::TypeDefinition(type_definition) = definition {
            let mut descriptor = type_from_definition(type_definition);
            let type_name = descriptor.name().to_string();

            if graph.contains_type(&type_name) {
                errors.push(SchemaBuildError::TypeCollision { type_name });
                continue;
            }

            if let Some(fields) = descriptor.fields_mut() {
                for field in fields.values_mut() {
                    if let Some(resolver) = extension.resolver(&type_name, &field.name) {
                        field.resolver = resolver;
                    }
                }
            }

            graph.insert_type(descriptor);
        }
    }

    for definition in &document.definitions {
        let Definition::TypeExtension(type_extension) = definition else {
            continue;
        };

        // Interface fields are resolved by their implementations.
        let (type_name, ast_fields, needs_resolvers) = match type_extension {
            TypeExtension::Object(ext) => (&ext.name, &ext.fields, true),
            TypeExtension::Interface(ext) => (&ext.name, &ext.fields, false),
            _ => {
                debug!("extension '{}' ignores a non-object type extension", extension.name());
                continue;
            }
        };

        let mut fields = Vec::with_capacity(ast_fields.len());
        for ast_field in ast_fields {
            match extension.resolver(type_name, &ast_field.name) {
                Some(resolver) => fields.push(field_from_ast(ast_field).with_resolver(resolver)),
                None if !needs_resolvers => fields.push(field_from_ast(ast_field)),
                None => errors.push(SchemaBuildError::MissingExtensionResolver {
                    type_name: type_name.clone(),
                    field: ast_field.name.clone(),
                }),
            }
        }

        add_fields(graph, type_name, fields, errors);
    }
}
