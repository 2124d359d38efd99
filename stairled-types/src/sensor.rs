use serde::{Deserialize, Serialize};

/// Comparison used to decide whether a sensor sample triggers its target
/// animation (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Le,
    Ge,
    Eq,
}

impl Operator {
    pub fn evaluate(self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Le => value <= threshold,
            Operator::Ge => value >= threshold,
            // Equality on raw sensor floats is intentionally exact per
            // spec.md §4.7; sensors emitting discretized values (counts,
            // enumerations encoded as f64) are the expected callers.
            Operator::Eq => value == threshold,
        }
    }
}

/// A configured sensor-to-animation binding. `enabled`, `last_trigger_at`
/// and `active` are runtime-mutable state carried alongside the otherwise
/// static configuration; the dispatcher (`stairled-engine`) owns mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub name: String,
    pub channel_id: String,
    pub threshold: f64,
    pub operator: Operator,
    pub target_animation_name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// A single `(sensor_name, value)` sample crossing the MQTT boundary into
/// the dispatcher, after topic-prefix normalization (§6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_name: String,
    pub value: f64,
    pub timestamp_ms: u64,
}

/// Emitted by the dispatcher to the trigger-event sink (§6). Persistence
/// of this event is an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub sensor_name: String,
    pub value: f64,
    pub animation_name: String,
    pub timestamp_ms: u64,
}
