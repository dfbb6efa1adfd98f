//! Identifier normalization.
//!
//! Every identifier exposed by the public schema has a name telling clients which
//! system it comes from. The `id` name itself is reserved for global identifiers,
//! so a bare `id` field has to carry a description tag saying what it is, or the
//! schema does not build.

use gateway_config::id_policy::IdPolicyConfig;

use crate::{
    error::SchemaBuildError,
    graph::{ArgumentDescriptor, FieldDescriptor, TypeRefExt},
    transform::{FieldRename, FieldRenamer, TransformFields},
};

const ID_FIELD: &str = "id";

#[derive(Debug, Clone)]
pub struct IdNormalization {
    config: IdPolicyConfig,
}

impl IdNormalization {
    pub fn new(config: IdPolicyConfig) -> Self {
        Self { config }
    }

    /// The policy as a pipeline step.
    pub fn into_transform(self) -> TransformFields<IdNormalization> {
        TransformFields::new("normalize_ids", self)
    }

    fn has_tag(field: &FieldDescriptor, tag: &str) -> bool {
        field
            .description
            .as_deref()
            .is_some_and(|description| description.trim() == tag)
    }

    fn is_stitched_type(&self, type_name: &str) -> bool {
        self.config
            .stitched_type_prefixes
            .iter()
            .any(|prefix| type_name.starts_with(prefix.as_str()))
    }

    fn is_allowed_untagged(&self, type_name: &str) -> bool {
        self.config
            .allowed_untagged_id_types
            .iter()
            .any(|allowed| allowed == type_name)
    }

    fn rename_id(&self, type_name: &str, field: &FieldDescriptor) -> Result<FieldRename, SchemaBuildError> {
        if Self::has_tag(field, &self.config.record_store_tag) {
            return Ok(FieldRename::RenameTo(self.config.record_store_name.clone()));
        }

        if Self::has_tag(field, &self.config.internal_tag) || self.is_stitched_type(type_name) {
            return Ok(FieldRename::RenameTo(self.config.internal_name.clone()));
        }

        if self.is_allowed_untagged(type_name) {
            return Ok(FieldRename::Keep);
        }

        if !field.field_type.is_non_null() {
            return Err(SchemaBuildError::NullableId {
                type_name: type_name.to_string(),
            });
        }

        Err(SchemaBuildError::UntaggedId {
            type_name: type_name.to_string(),
        })
    }
}

impl FieldRenamer for IdNormalization {
    fn rename_field(
        &self,
        type_name: &str,
        field: &FieldDescriptor,
    ) -> Result<FieldRename, SchemaBuildError> {
        if type_name.starts_with("__") {
            return Ok(FieldRename::Keep);
        }

        let name = field.name.as_str();
        if name == ID_FIELD {
            self.rename_id(type_name, field)
        } else if name == self.config.global_id_marker {
            Ok(FieldRename::RenameTo(ID_FIELD.to_string()))
        } else if name == self.config.persistence_id_marker {
            Ok(FieldRename::RenameTo(self.config.internal_name.clone()))
        } else {
            Ok(FieldRename::Keep)
        }
    }

    fn rename_argument(
        &self,
        _type_name: &str,
        _field: &FieldDescriptor,
        argument: &ArgumentDescriptor,
    ) -> Option<String> {
        (argument.name == self.config.global_id_marker).then(|| ID_FIELD.to_string())
    }
}

#[cfg(test)]
mod tests {
    use gateway_config::id_policy::IdPolicyConfig;
    use pretty_assertions::assert_eq;

    use super::IdNormalization;
    use crate::{
        error::SchemaBuildError,
        graph::SchemaGraph,
        transform::{rename_fields, SchemaTransform},
    };

    fn policy() -> IdNormalization {
        IdNormalization::new(IdPolicyConfig {
            stitched_type_prefixes: vec!["Ecommerce_".to_string()],
            allowed_untagged_id_types: vec!["Legacy".to_string()],
            ..IdPolicyConfig::default()
        })
    }

    #[test]
    fn tagged_and_marked_fields_are_renamed() {
        let graph = SchemaGraph::from_sdl(
            "local",
            r#"
            type Query {
              artist(__id: ID!): Artist
              order: Order
              ecommerceOrder: Ecommerce_Order
              legacy: Legacy
            }

            type Artist {
              "A slug ID."
              id: ID!
              __id: ID!
              _id: String!
              name: String
            }

            type Order {
              "A type-specific ID likely used as a database ID."
              id: ID!
            }

            type Ecommerce_Order {
              id: ID!
            }

            type Legacy {
              id: ID
            }
            "#,
        )
        .expect("valid schema");

        let output = rename_fields(&graph, &policy()).expect("every identifier is tagged");
        let public = output.graph;

        let artist_fields = public
            .type_by_name("Artist")
            .and_then(|t| t.fields())
            .map(|fields| fields.keys().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(artist_fields, Some(vec!["slug", "id", "internalID", "name"]));
        assert!(public.field("Order", "internalID").is_some());
        assert!(public.field("Ecommerce_Order", "internalID").is_some());
        assert!(public.field("Legacy", "id").is_some());

        let artist = public.field("Query", "artist").expect("root field");
        assert_eq!(artist.arguments[0].name, "id");
        assert_eq!(
            output.argument_renames.lookup("Query", "artist", "id"),
            Some("__id")
        );
        assert_eq!(output.renames.lookup("Artist", "id"), Some("__id"));
        assert_eq!(output.renames.lookup("Artist", "slug"), Some("id"));
        assert_eq!(output.renames.lookup("Order", "internalID"), Some("id"));
    }

    #[test]
    fn every_untagged_identifier_is_reported() {
        let graph = SchemaGraph::from_sdl(
            "local",
            r#"
            type Query {
              show: Show
              fair: Fair
            }

            type Show {
              id: ID
            }

            type Fair {
              id: ID!
            }
            "#,
        )
        .expect("valid schema");

        let errors = policy()
            .into_transform()
            .transform_schema(graph)
            .expect_err("identifiers are untagged");

        assert_eq!(
            errors.0,
            vec![
                SchemaBuildError::NullableId {
                    type_name: "Show".to_string()
                },
                SchemaBuildError::UntaggedId {
                    type_name: "Fair".to_string()
                },
            ]
        );
    }
}
