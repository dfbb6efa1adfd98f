use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{instrument, trace};

use crate::{
    error::{SchemaBuildError, SchemaBuildErrors},
    graph::{
        ArgumentDescriptor, FieldDescriptor, FieldMap, RenamedFieldResolver, SchemaGraph,
        TYPENAME_FIELD,
    },
};

use super::rename_table::{ArgumentRenameTable, RenameTable};

/// What happens to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRename {
    Keep,
    Drop,
    RenameTo(String),
}

pub trait FieldRenamer {
    fn rename_field(
        &self,
        type_name: &str,
        field: &FieldDescriptor,
    ) -> Result<FieldRename, SchemaBuildError>;

    /// A new name for one argument of `field`, or `None` to keep it.
    fn rename_argument(
        &self,
        _type_name: &str,
        _field: &FieldDescriptor,
        _argument: &ArgumentDescriptor,
    ) -> Option<String> {
        None
    }
}

/// A renamer backed by a closure.
pub struct FnRenamer<F>(F);

pub fn renamer<F>(f: F) -> FnRenamer<F>
where
    F: Fn(&str, &FieldDescriptor) -> FieldRename,
{
    FnRenamer(f)
}

impl<F> FieldRenamer for FnRenamer<F>
where
    F: Fn(&str, &FieldDescriptor) -> FieldRename,
{
    fn rename_field(
        &self,
        type_name: &str,
        field: &FieldDescriptor,
    ) -> Result<FieldRename, SchemaBuildError> {
        Ok((self.0)(type_name, field))
    }
}

#[derive(Debug, Clone)]
pub struct FieldTransformOutput {
    pub graph: SchemaGraph,
    pub renames: RenameTable,
    pub argument_renames: ArgumentRenameTable,
}

/// Renames or removes fields of every object and interface type.
///
/// Field order is preserved, and types without any change are carried over as the
/// same `Arc`. Unions, leaf and input types are passed through.
#[instrument(level = "trace", skip_all)]
pub fn rename_fields<R: FieldRenamer + ?Sized>(
    graph: &SchemaGraph,
    renamer: &R,
) -> Result<FieldTransformOutput, SchemaBuildErrors> {
    let mut types = IndexMap::with_capacity(graph.len());
    let mut renames = RenameTable::default();
    let mut argument_renames = ArgumentRenameTable::default();
    let mut errors = SchemaBuildErrors::default();

    for shared in graph.shared_types() {
        let replacement = match shared.fields() {
            Some(fields) => rename_type_fields(
                shared.name(),
                fields,
                renamer,
                &mut renames,
                &mut argument_renames,
                &mut errors,
            ),
            None => None,
        };

        let next = match replacement {
            Some(fields) => {
                let mut descriptor = shared.as_ref().clone();
                if let Some(slot) = descriptor.fields_mut() {
                    *slot = fields;
                }
                Arc::new(descriptor)
            }
            None => shared.clone(),
        };

        types.insert(shared.name().to_string(), next);
    }

    errors.into_result(FieldTransformOutput {
        graph: graph.with_types(types),
        renames,
        argument_renames,
    })
}

/// The new field map of one type, or `None` when nothing changed.
fn rename_type_fields<R: FieldRenamer + ?Sized>(
    type_name: &str,
    fields: &FieldMap,
    renamer: &R,
    renames: &mut RenameTable,
    argument_renames: &mut ArgumentRenameTable,
    errors: &mut SchemaBuildErrors,
) -> Option<FieldMap> {
    let mut changed = false;
    let mut next = FieldMap::with_capacity(fields.len());

    for (name, field) in fields {
        let outcome = if name == TYPENAME_FIELD {
            FieldRename::Keep
        } else {
            match renamer.rename_field(type_name, field) {
                Ok(outcome) => outcome,
                Err(err) => {
                    errors.push(err);
                    FieldRename::Keep
                }
            }
        };

        let mut field = match outcome {
            FieldRename::Keep => field.clone(),
            FieldRename::RenameTo(to) if &to == name => field.clone(),
            FieldRename::Drop => {
                trace!("dropping field '{}.{}'", type_name, name);
                changed = true;
                continue;
            }
            FieldRename::RenameTo(to) => {
                if let Err(reason) = validate_name(&to) {
                    errors.push(SchemaBuildError::InvalidRename {
                        type_name: type_name.to_string(),
                        field: name.clone(),
                        to,
                        reason,
                    });
                    field.clone()
                } else {
                    trace!("renaming field '{}.{}' to '{}'", type_name, name, to);
                    changed = true;
                    renames.insert(&to, name, type_name);

                    let mut renamed = field.clone();
                    renamed.name = to;
                    renamed
                }
            }
        };

        let mut renamed_arguments = Vec::new();

        let arguments: Vec<_> = std::mem::take(&mut field.arguments)
            .into_iter()
            .map(|mut argument| {
                if let Some(to) = renamer.rename_argument(type_name, &field, &argument) {
                    if to != argument.name {
                        trace!(
                            "renaming argument '{}.{}({})' to '{}'",
                            type_name,
                            field.name,
                            argument.name,
                            to
                        );
                        changed = true;
                        argument_renames.insert(type_name, &field.name, &to, &argument.name);
                        renamed_arguments.push((to.clone(), argument.name.clone()));
                        argument.name = to;
                    }
                }
                argument
            })
            .collect();
        field.arguments = arguments;

        if &field.name != name || !renamed_arguments.is_empty() {
            field.resolver = Arc::new(
                RenamedFieldResolver::new(field.resolver.clone(), name.clone())
                    .with_arguments(renamed_arguments),
            );
        }

        if next.contains_key(&field.name) {
            errors.push(SchemaBuildError::FieldNameCollision {
                type_name: type_name.to_string(),
                field: name.clone(),
                to: field.name.clone(),
            });
            continue;
        }

        next.insert(field.name.clone(), field);
    }

    changed.then_some(next)
}

fn validate_name(name: &str) -> Result<(), &'static str> {
    let mut chars = name.chars();

    match chars.next() {
        None => return Err("name is empty"),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
            return Err("name must start with a letter or an underscore")
        }
        _ => {}
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("name may only contain letters, digits and underscores");
    }

    if name.starts_with("__") {
        return Err("names starting with '__' are reserved for introspection");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::{rename_fields, renamer, FieldRename};
    use crate::{
        error::SchemaBuildError,
        graph::{SchemaGraph, TYPENAME_FIELD},
    };

    fn schema() -> SchemaGraph {
        SchemaGraph::from_sdl(
            "local",
            r#"
            type Query {
              artist: Artist
              artwork: Artwork
              search: SearchResult
            }

            type Artist {
              name: String
              birthday: String
              nationality: String
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
    fn keeps_order_and_unchanged_types() {
        let graph = schema();
        let output = rename_fields(
            &graph,
            &renamer(|type_name, field| match (type_name, field.name.as_str()) {
                ("Artist", "birthday") => FieldRename::RenameTo("birthDate".to_string()),
                ("Artist", "nationality") => FieldRename::Drop,
                _ => FieldRename::Keep,
            }),
        )
        .expect("valid renames");

        let artist = output.graph.type_by_name("Artist").expect("Artist survives");
        assert_eq!(
            artist.fields().expect("fields").keys().collect::<Vec<_>>(),
            vec!["name", "birthDate"]
        );
        assert!(Arc::ptr_eq(
            graph.shared_type("Artwork").expect("declared"),
            output.graph.shared_type("Artwork").expect("kept")
        ));
        assert!(Arc::ptr_eq(
            graph.shared_type("SearchResult").expect("declared"),
            output.graph.shared_type("SearchResult").expect("kept")
        ));
        assert_eq!(output.renames.lookup("Artist", "birthDate"), Some("birthday"));
        assert_eq!(output.renames.lookup("Artwork", "birthDate"), None);
    }

    #[test]
    fn a_type_may_be_left_without_fields() {
        let output = rename_fields(
            &schema(),
            &renamer(|type_name, _| match type_name {
                "Artwork" => FieldRename::Drop,
                _ => FieldRename::Keep,
            }),
        )
        .expect("dropping is always valid");

        let artwork = output.graph.type_by_name("Artwork").expect("type remains");
        assert!(artwork.fields().expect("fields").is_empty());
    }

    #[test]
    fn typename_is_never_renamed() {
        let mut graph = schema();
        let mut artist = graph.type_by_name("Artist").expect("declared").clone();
        if let Some(fields) = artist.fields_mut() {
            fields.insert(
                TYPENAME_FIELD.to_string(),
                crate::graph::FieldDescriptor::new(
                    TYPENAME_FIELD,
                    crate::graph::type_ref::non_null(crate::graph::type_ref::named("String")),
                ),
            );
        }
        graph.insert_type(artist);

        let output = rename_fields(&graph, &renamer(|_, _| FieldRename::Drop))
            .expect("dropping is always valid");

        let artist = output.graph.type_by_name("Artist").expect("declared");
        assert_eq!(
            artist.fields().expect("fields").keys().collect::<Vec<_>>(),
            vec![TYPENAME_FIELD]
        );
    }

    #[test]
    fn invalid_names_and_collisions_are_build_errors() {
        let errors = rename_fields(
            &schema(),
            &renamer(|type_name, field| match (type_name, field.name.as_str()) {
                ("Artist", "name") => FieldRename::RenameTo("__name".to_string()),
                ("Artist", "birthday") => FieldRename::RenameTo("nationality".to_string()),
                ("Artwork", "title") => FieldRename::RenameTo("1title".to_string()),
                _ => FieldRename::Keep,
            }),
        )
        .expect_err("renames are invalid");

        assert_eq!(
            errors.0,
            vec![
                SchemaBuildError::InvalidRename {
                    type_name: "Artist".to_string(),
                    field: "name".to_string(),
                    to: "__name".to_string(),
                    reason: "names starting with '__' are reserved for introspection",
                },
                SchemaBuildError::FieldNameCollision {
                    type_name: "Artist".to_string(),
                    field: "nationality".to_string(),
                    to: "nationality".to_string(),
                },
                SchemaBuildError::InvalidRename {
                    type_name: "Artwork".to_string(),
                    field: "title".to_string(),
                    to: "1title".to_string(),
                    reason: "name must start with a letter or an underscore",
                },
            ]
        );
    }
}
