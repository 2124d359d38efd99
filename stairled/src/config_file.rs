//! TOML-backed `ConfigSource`/`ConfigSink`, the concrete external
//! configuration collaborator (SPEC_FULL §6), grounded on the donor's
//! `braid-config-data::parse_config_file` read/parse/fixup-path pattern.

use std::path::{Path, PathBuf};

use stairled_engine::config::{ConfigError, ConfigSink, ConfigSource};
use stairled_types::CoreConfig;

pub struct TomlConfigSource {
    path: PathBuf,
}

impl TomlConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for TomlConfigSource {
    fn load(&self) -> Result<CoreConfig, ConfigError> {
        read_config(&self.path)
    }
}

impl ConfigSink for TomlConfigSource {
    fn save(&self, cfg: &CoreConfig) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(cfg).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<CoreConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
}
