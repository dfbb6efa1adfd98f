use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Rules for normalizing identifier-shaped fields.
///
/// Description strings act as semantic tags: a field named `id` carrying one of
/// the configured tags is renamed to the canonical name of the system it comes from.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct IdPolicyConfig {
    /// Description marking an `id` field as a record-store (system of record) identifier.
    #[serde(default = "default_record_store_tag")]
    pub record_store_tag: String,

    /// Public name given to record-store identifiers.
    #[serde(default = "default_record_store_name")]
    pub record_store_name: String,

    /// Description marking an `id` field as an internal/stable identifier.
    #[serde(default = "default_internal_tag")]
    pub internal_tag: String,

    /// Public name given to internal identifiers.
    #[serde(default = "default_internal_name")]
    pub internal_name: String,

    /// Field name that is unwrapped back to `id`, so that a type can expose both an
    /// opaque global identifier and a raw one.
    #[serde(default = "default_global_id_marker")]
    pub global_id_marker: String,

    /// Persistence-layer identifier field name, renamed to `internal_name`.
    #[serde(default = "default_persistence_id_marker")]
    pub persistence_id_marker: String,

    /// Type name prefixes of stitched (remote) types. Their `id` fields are treated
    /// as internal identifiers.
    #[serde(default)]
    pub stitched_type_prefixes: Vec<String>,

    /// Types allowed to expose an untagged `id` field (nullable or not). Such fields are
    /// left untouched.
    #[serde(default)]
    pub allowed_untagged_id_types: Vec<String>,
}

impl Default for IdPolicyConfig {
    fn default() -> Self {
        Self {
            record_store_tag: default_record_store_tag(),
            record_store_name: default_record_store_name(),
            internal_tag: default_internal_tag(),
            internal_name: default_internal_name(),
            global_id_marker: default_global_id_marker(),
            persistence_id_marker: default_persistence_id_marker(),
            stitched_type_prefixes: Vec::new(),
            allowed_untagged_id_types: Vec::new(),
        }
    }
}

fn default_record_store_tag() -> String {
    "A slug ID.".to_string()
}

fn default_record_store_name() -> String {
    "slug".to_string()
}

fn default_internal_tag() -> String {
    "A type-specific ID likely used as a database ID.".to_string()
}

fn default_internal_name() -> String {
    "internalID".to_string()
}

fn default_global_id_marker() -> String {
    "__id".to_string()
}

fn default_persistence_id_marker() -> String {
    "_id".to_string()
}
