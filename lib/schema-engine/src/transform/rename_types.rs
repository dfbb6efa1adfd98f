use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{instrument, trace};

use crate::{
    error::{SchemaBuildError, SchemaBuildErrors},
    graph::{
        ArgumentDescriptor, FieldMap, SchemaGraph, TypeDescriptor, TypeRef, TypeRefExt,
        BUILTIN_SCALARS,
    },
};

use super::{
    rename_fields::{rename_fields, renamer, FieldRename, FieldTransformOutput},
    rename_table::TypeRenameTable,
};

#[derive(Debug, Clone)]
pub struct TypeTransformOutput {
    pub graph: SchemaGraph,
    pub renames: TypeRenameTable,
}

/// Renames types, and every reference to them.
///
/// Built-in scalars, introspection types and the root types keep their names.
#[instrument(level = "trace", skip_all)]
pub fn rename_types<F>(graph: &SchemaGraph, rename: F) -> Result<TypeTransformOutput, SchemaBuildErrors>
where
    F: Fn(&str) -> Option<String>,
{
    let mut renames = TypeRenameTable::default();
    let mut errors = SchemaBuildErrors::default();

    for name in graph.type_names() {
        if BUILTIN_SCALARS.contains(&name) || name.starts_with("__") || graph.is_root_type(name) {
            continue;
        }

        if let Some(public) = rename(name).filter(|public| public != name) {
            if graph.contains_type(&public) {
                errors.push(SchemaBuildError::TypeCollision { type_name: public });
                continue;
            }
            trace!("renaming type '{}' to '{}'", name, public);
            renames.insert(name, &public);
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let types: IndexMap<String, Arc<TypeDescriptor>> = graph
        .shared_types()
        .map(|shared| {
            let descriptor = retype(shared, &renames);
            (descriptor.name().to_string(), descriptor)
        })
        .collect();

    Ok(TypeTransformOutput {
        graph: graph.with_types(types),
        renames,
    })
}

/// Prefixes every renameable type name.
pub fn prefix_types(graph: &SchemaGraph, prefix: &str) -> Result<TypeTransformOutput, SchemaBuildErrors> {
    rename_types(graph, |name| Some(format!("{}{}", prefix, name)))
}

/// Renames the fields of the root types to `prefix` followed by the field name with
/// its first letter upper-cased (`order` with prefix `ecommerce` becomes `ecommerceOrder`).
pub fn prefix_root_fields(
    graph: &SchemaGraph,
    prefix: &str,
) -> Result<FieldTransformOutput, SchemaBuildErrors> {
    rename_fields(
        graph,
        &renamer(|type_name, field| {
            if graph.is_root_type(type_name) {
                FieldRename::RenameTo(prefixed_field_name(prefix, &field.name))
            } else {
                FieldRename::Keep
            }
        }),
    )
}

pub fn prefixed_field_name(prefix: &str, name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("{}{}{}", prefix, first.to_uppercase(), chars.as_str()),
        None => prefix.to_string(),
    }
}

fn retype_ref(type_ref: &TypeRef, renames: &TypeRenameTable) -> TypeRef {
    type_ref.with_named_type(renames.public_of(type_ref.named_type()))
}

fn retype_arguments(arguments: &[ArgumentDescriptor], renames: &TypeRenameTable) -> Vec<ArgumentDescriptor> {
    arguments
        .iter()
        .map(|argument| ArgumentDescriptor {
            value_type: retype_ref(&argument.value_type, renames),
            ..argument.clone()
        })
        .collect()
}

fn retype_fields(fields: &FieldMap, renames: &TypeRenameTable) -> FieldMap {
    fields
        .iter()
        .map(|(name, field)| {
            let mut field = field.clone();
            field.field_type = retype_ref(&field.field_type, renames);
            field.arguments = retype_arguments(&field.arguments, renames);
            (name.clone(), field)
        })
        .collect()
}

fn retype_names(names: &[String], renames: &TypeRenameTable) -> Vec<String> {
    names
        .iter()
        .map(|name| renames.public_of(name).to_string())
        .collect()
}

fn retype(shared: &Arc<TypeDescriptor>, renames: &TypeRenameTable) -> Arc<TypeDescriptor> {
    let public = |name: &str| renames.public_of(name).to_string();

    let descriptor = match shared.as_ref() {
        TypeDescriptor::Object(object) => {
            let mut object = object.clone();
            object.name = public(&object.name);
            object.interfaces = retype_names(&object.interfaces, renames);
            object.fields = retype_fields(&object.fields, renames);
            TypeDescriptor::Object(object)
        }
        TypeDescriptor::Interface(interface) => {
            let mut interface = interface.clone();
            interface.name = public(&interface.name);
            interface.interfaces = retype_names(&interface.interfaces, renames);
            interface.fields = retype_fields(&interface.fields, renames);
            TypeDescriptor::Interface(interface)
        }
        TypeDescriptor::Union(union) => {
            let mut union = union.clone();
            union.name = public(&union.name);
            union.members = retype_names(&union.members, renames);
            TypeDescriptor::Union(union)
        }
        TypeDescriptor::InputObject(input) => {
            let mut input = input.clone();
            input.name = public(&input.name);
            input.fields = retype_arguments(&input.fields, renames);
            TypeDescriptor::InputObject(input)
        }
        TypeDescriptor::Scalar(_) | TypeDescriptor::Enum(_)
            if renames.public_of(shared.name()) == shared.name() =>
        {
            return shared.clone();
        }
        TypeDescriptor::Scalar(scalar) => {
            let mut scalar = scalar.clone();
            scalar.name = public(&scalar.name);
            TypeDescriptor::Scalar(scalar)
        }
        TypeDescriptor::Enum(enum_type) => {
            let mut enum_type = enum_type.clone();
            enum_type.name = public(&enum_type.name);
            TypeDescriptor::Enum(enum_type)
        }
    };

    Arc::new(descriptor)
}
