//! External configuration boundary (§1, §6 [FULL]). The core consumes
//! configuration through these traits rather than owning storage; the
//! binary supplies the concrete TOML-backed implementation.

use stairled_types::CoreConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("configuration invalid: {field}: {reason}")]
    Invalid { field: String, reason: String },
}

pub trait ConfigSource {
    fn load(&self) -> Result<CoreConfig, ConfigError>;
}

pub trait ConfigSink {
    fn save(&self, cfg: &CoreConfig) -> Result<(), ConfigError>;
}
