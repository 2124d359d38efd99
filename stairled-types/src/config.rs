use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::animation::NamedAnimationConfig;
use crate::pinmap::PinMapConfig;
use crate::sensor::SensorConfig;

fn default_pwm_hz() -> u32 {
    52_000
}

fn default_tick_hz() -> u32 {
    60
}

fn default_sensor_prefix() -> String {
    "stairled-sensor-".to_string()
}

/// `pinmapper.*` configuration keys (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinMapperConfig {
    #[serde(default)]
    pub mapping: PinMapConfig,
    #[serde(default = "default_pwm_hz")]
    pub pwm_hz: u32,
}

impl Default for PinMapperConfig {
    fn default() -> Self {
        Self {
            mapping: PinMapConfig::default(),
            pwm_hz: default_pwm_hz(),
        }
    }
}

/// `engine.*` configuration keys (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
        }
    }
}

/// MQTT-facing dispatcher configuration. `sensor_name_prefix` is stripped
/// from inbound topic-derived sensor names before dispatcher lookup (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatcherConfig {
    #[serde(default = "default_sensor_prefix")]
    pub sensor_name_prefix: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            sensor_name_prefix: default_sensor_prefix(),
        }
    }
}

/// The full set of configuration keys the core consumes (§6), aggregated
/// the way `braid-config-data::BraidConfig2` aggregates `mainbrain` /
/// `trigger` / `cameras` into one top-level struct read from one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    #[serde(default)]
    pub pinmapper: PinMapperConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    /// Keyed by animation name, i.e. the `animations.<name>` keys of §6.
    #[serde(default)]
    pub animations: BTreeMap<String, NamedAnimationConfig>,
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.pinmapper.pwm_hz, 52_000);
        assert_eq!(cfg.engine.tick_hz, 60);
        assert_eq!(cfg.dispatcher.sensor_name_prefix, "stairled-sensor-");
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = CoreConfig::default();
        let s = toml_text(&cfg);
        let back: CoreConfig = toml::from_str(&s).unwrap();
        assert_eq!(back.engine.tick_hz, cfg.engine.tick_hz);
    }

    fn toml_text(cfg: &CoreConfig) -> String {
        toml::to_string(cfg).unwrap()
    }
}
