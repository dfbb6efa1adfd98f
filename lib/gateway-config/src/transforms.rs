use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One step of the transform pipeline. Steps run in the order they are declared.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum TransformRule {
    /// Renames fields on the listed types.
    RenameFields { fields: Vec<FieldRenameRule> },
    /// Removes the listed fields.
    FilterFields { remove: Vec<FieldCoordinate> },
    /// Removes the listed types, and every field or union member pointing at them.
    FilterTypes { remove: Vec<String> },
    /// Applies the identifier normalization policy (see `id_policy`).
    NormalizeIds,
    /// Removes every field carrying a deprecation marker.
    DropDeprecated,
    /// Removes object and interface types left without fields by earlier steps.
    DropEmptyTypes,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FieldRenameRule {
    /// The type owning the field.
    #[serde(rename = "on")]
    pub type_name: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FieldCoordinate {
    #[serde(rename = "on")]
    pub type_name: String,
    pub field: String,
}
