use config::{builder::BuilderState, ConfigBuilder, ConfigError};
use envconfig::Envconfig;
use tracing::debug;

#[derive(Envconfig)]
pub struct EnvVarOverrides {
    // Logger overrides, checked when the merged configuration is deserialized
    #[envconfig(from = "LOG_LEVEL")]
    pub log_level: Option<String>,
    #[envconfig(from = "LOG_FORMAT")]
    pub log_format: Option<String>,
    #[envconfig(from = "LOG_FILTER")]
    pub log_filter: Option<String>,

    // Schema source overrides
    #[envconfig(from = "LOCAL_SCHEMA_PATH")]
    pub local_schema_path: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EnvVarOverridesError {
    #[error("Failed to override configuration: {0}")]
    FailedToOverrideConfig(#[from] ConfigError),
}

impl EnvVarOverrides {
    pub fn apply_overrides<T: BuilderState>(
        mut self,
        mut config: ConfigBuilder<T>,
    ) -> Result<ConfigBuilder<T>, EnvVarOverridesError> {
        if let Some(log_level) = self.log_level.take() {
            debug!("[config-override] 'log.level' = {}", log_level);
            config = config.set_override("log.level", log_level.to_lowercase())?;
        }
        if let Some(log_format) = self.log_format.take() {
            debug!("[config-override] 'log.format' = {}", log_format);
            config = config.set_override("log.format", log_format.to_lowercase())?;
        }
        if let Some(log_filter) = self.log_filter.take() {
            debug!("[config-override] 'log.filter' = {:?}", log_filter);
            config = config.set_override("log.filter", log_filter)?;
        }

        if let Some(local_schema_path) = self.local_schema_path.take() {
            debug!("[config-override] 'local_schema' = {}", local_schema_path);
            config = config.set_override("local_schema", local_schema_path)?;
        }

        Ok(config)
    }
}
