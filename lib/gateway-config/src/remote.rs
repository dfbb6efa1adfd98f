use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RemoteSchemaConfig {
    /// A unique name for the remote schema, used in logs and error messages.
    pub name: String,

    /// Path to the remote schema document (SDL), relative to the configuration file.
    pub schema: String,

    /// Prefix prepended to every remote type name, to keep them from colliding with local types.
    pub type_prefix: String,

    /// Prefix prepended to the remote root fields when they are merged into the local root types.
    /// The first letter of the original field name is upper-cased after the prefix.
    #[serde(default)]
    pub root_field_prefix: Option<String>,

    /// When `false`, the remote root fields are not exposed on the merged root types.
    /// They remain reachable through extension fields.
    #[serde(default = "default_expose_root_fields")]
    pub expose_root_fields: bool,
}

fn default_expose_root_fields() -> bool {
    true
}
