mod env_overrides;
pub mod id_policy;
pub mod log;
pub mod remote;
pub mod transforms;

use config::{Config, File, FileFormat, FileSourceFile};
use envconfig::Envconfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::{Path, PathBuf};

use crate::{
    env_overrides::{EnvVarOverrides, EnvVarOverridesError},
    id_policy::IdPolicyConfig,
    log::LoggingConfig,
    remote::RemoteSchemaConfig,
    transforms::TransformRule,
};

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(skip)]
    root_directory: PathBuf,

    /// The logger configuration.
    #[serde(default)]
    pub log: LoggingConfig,

    /// Path to the local schema document (SDL), relative to the configuration file.
    #[serde(default = "default_local_schema")]
    pub local_schema: String,

    /// Remote schemas merged into the local schema before the pipeline runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remotes: Vec<RemoteSchemaConfig>,

    /// Identifier normalization rules, used by the `normalize_ids` transform.
    #[serde(default)]
    pub id_policy: IdPolicyConfig,

    /// The ordered transform pipeline producing the public schema.
    #[serde(default)]
    pub transforms: Vec<TransformRule>,
}

fn default_local_schema() -> String {
    "./schema.graphql".to_string()
}

impl GatewayConfig {
    /// Resolves a path declared in the configuration against the directory of the configuration file.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_directory.join(path)
        }
    }

    pub fn local_schema_path(&self) -> PathBuf {
        self.resolve_path(&self.local_schema)
    }

    pub fn remote(&self, name: &str) -> Option<&RemoteSchemaConfig> {
        self.remotes.iter().find(|remote| remote.name == name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayConfigError {
    #[error("Failed to load configuration: {0}")]
    ConfigLoadError(#[from] config::ConfigError),
    #[error("Failed to apply configuration overrides: {0}")]
    EnvVarOverridesError(#[from] EnvVarOverridesError),
    #[error("Failed to load the environment variables: {0}")]
    EnvVarLoadError(#[from] envconfig::Error),
    #[error("Failed to get the current directory: {0}")]
    CurrentDirError(std::io::Error),
    #[error("Failed to parse the configuration file path: {0}")]
    ConfigPathParseError(Infallible),
    #[error("Remote schema name '{0}' is declared more than once")]
    DuplicateRemoteName(String),
}

static DEFAULT_FILE_NAMES: &[&str] = &[
    "gateway.config.yaml",
    "gateway.config.yml",
    "gateway.config.json",
    "gateway.config.json5",
];

fn get_current_dir() -> Result<PathBuf, GatewayConfigError> {
    std::env::current_dir().map_err(GatewayConfigError::CurrentDirError)
}

pub fn load_config(
    override_config_path: Option<String>,
) -> Result<GatewayConfig, GatewayConfigError> {
    let env_overrides = EnvVarOverrides::init_from_env()?;
    let mut config = Config::builder();
    let mut config_root_path = get_current_dir()?;

    if let Some(path_str) = override_config_path {
        let path_buf = path_str
            .parse::<std::path::PathBuf>()
            .map_err(GatewayConfigError::ConfigPathParseError)?;
        if let Some(parent_dir) = path_buf.parent() {
            config_root_path = config_root_path.join(parent_dir);
        }
        let as_file: File<FileSourceFile, _> = path_buf.into();

        config = config.add_source(as_file.required(true));
    } else {
        for name in DEFAULT_FILE_NAMES {
            config = config.add_source(File::with_name(name).required(false));
        }
    }

    config = env_overrides.apply_overrides(config)?;

    let mut base_cfg = config.build()?.try_deserialize::<GatewayConfig>()?;
    base_cfg.root_directory = config_root_path;

    validate(base_cfg)
}

pub fn parse_yaml_config(config_raw: &str) -> Result<GatewayConfig, GatewayConfigError> {
    let mut base_cfg = Config::builder()
        .add_source(File::from_str(config_raw, FileFormat::Yaml))
        .build()?
        .try_deserialize::<GatewayConfig>()?;
    base_cfg.root_directory = get_current_dir()?;

    validate(base_cfg)
}

fn validate(config: GatewayConfig) -> Result<GatewayConfig, GatewayConfigError> {
    for (index, remote) in config.remotes.iter().enumerate() {
        if config.remotes[..index]
            .iter()
            .any(|other| other.name == remote.name)
        {
            return Err(GatewayConfigError::DuplicateRemoteName(remote.name.clone()));
        }
    }

    Ok(config)
}
