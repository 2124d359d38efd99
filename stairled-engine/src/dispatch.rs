//! C7 — Sensor Dispatcher: threshold evaluation, single-flight animation
//! activation, and trigger event emission (§4.7).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, warn};

use stairled_types::{Operator, SensorConfig, SensorReading, TriggerEvent};

use crate::engine::AnimationEngine;
use crate::error::Error;
use crate::registry::AnimationRegistry;

/// Minimum gap, beyond the animation's own duration, before a sensor's
/// `active` latch auto-clears (§4.7, §5).
const AUTO_CLEAR_SAFETY_MARGIN_MS: u64 = 2_000;

/// Minimum spacing between repeated "dropped while active" warnings for
/// the same sensor (§4.7's "rate-limit log once per 2s per sensor").
const DROP_LOG_INTERVAL: Duration = Duration::from_secs(2);

/// Yields inbound `(sensor_name, value)` samples; implemented by the
/// binary's MQTT glue in production and by a channel-backed stand-in
/// everywhere else (tests, other in-process callers).
pub trait SensorSource {
    fn recv(&self) -> Option<SensorReading>;
}

/// Receives trigger events for external persistence/notification. The
/// binary's SQL/MQTT publishing is out of scope for this core; both
/// production and tests use the in-process `LoggingTriggerSink` below.
pub trait TriggerSink: Send + Sync {
    fn emit(&self, event: TriggerEvent);
}

/// Channel-backed `SensorSource`, the in-process stand-in used by the
/// binary to bridge an async MQTT task into the dispatcher thread.
pub struct ChannelSensorSource {
    receiver: crossbeam_channel::Receiver<SensorReading>,
}

impl ChannelSensorSource {
    pub fn new(receiver: crossbeam_channel::Receiver<SensorReading>) -> Self {
        Self { receiver }
    }
}

impl SensorSource for ChannelSensorSource {
    fn recv(&self) -> Option<SensorReading> {
        self.receiver.try_recv().ok()
    }
}

/// Logs every trigger event at `info` level; the default sink when no
/// external persistence collaborator is wired up.
pub struct LoggingTriggerSink;

impl TriggerSink for LoggingTriggerSink {
    fn emit(&self, event: TriggerEvent) {
        tracing::info!(
            sensor = %event.sensor_name,
            value = event.value,
            animation = %event.animation_name,
            "trigger event"
        );
    }
}

struct SensorState {
    config: SensorConfig,
    active: bool,
    clear_at_ms: Option<u64>,
    /// Set when the engine rejected this sensor's trigger with `Busy`;
    /// the latch resets on the *next* sample rather than immediately,
    /// per §4.7's "single-flight across sensors" note.
    pending_reset_due_to_busy: bool,
    last_drop_log: Option<Instant>,
}

/// Reads sensor samples, evaluates thresholds, and asks the engine to
/// start the target animation under single-flight discipline (§4.7).
pub struct SensorDispatcher {
    sensors: RwLock<BTreeMap<String, SensorState>>,
    sensor_name_prefix: String,
    engine: Arc<AnimationEngine>,
    registry: Arc<AnimationRegistry>,
    trigger_sink: Arc<dyn TriggerSink>,
}

impl SensorDispatcher {
    pub fn new(
        sensors: Vec<SensorConfig>,
        sensor_name_prefix: String,
        engine: Arc<AnimationEngine>,
        registry: Arc<AnimationRegistry>,
        trigger_sink: Arc<dyn TriggerSink>,
    ) -> Self {
        let sensors = sensors
            .into_iter()
            .map(|config| {
                (
                    config.name.clone(),
                    SensorState {
                        config,
                        active: false,
                        clear_at_ms: None,
                        pending_reset_due_to_busy: false,
                        last_drop_log: None,
                    },
                )
            })
            .collect();
        Self {
            sensors: RwLock::new(sensors),
            sensor_name_prefix,
            engine,
            registry,
            trigger_sink,
        }
    }

    /// Strips the configured topic prefix, if present, before lookup (§6).
    pub fn normalize_sensor_name<'a>(&self, raw: &'a str) -> &'a str {
        raw.strip_prefix(self.sensor_name_prefix.as_str())
            .unwrap_or(raw)
    }

    /// Processes one sample against §4.7's decision table. Returns `true`
    /// if a trigger event was emitted, for tests to assert against.
    pub fn handle_reading(&self, reading: &SensorReading) -> bool {
        let mut sensors = self.sensors.write();
        let name = self.normalize_sensor_name(&reading.sensor_name).to_string();
        let Some(state) = sensors.get_mut(&name) else {
            debug!(sensor = %name, "reading for unknown sensor, dropping");
            return false;
        };

        if state.pending_reset_due_to_busy {
            state.active = false;
            state.clear_at_ms = None;
            state.pending_reset_due_to_busy = false;
        }

        if !state.config.enabled {
            return false;
        }

        let triggered = state
            .config
            .operator
            .evaluate(reading.value, state.config.threshold);
        if !triggered {
            return false;
        }

        if state.active {
            let should_log = match state.last_drop_log {
                Some(prev) => prev.elapsed() >= DROP_LOG_INTERVAL,
                None => true,
            };
            if should_log {
                warn!(sensor = %name, "sample dropped, sensor already active");
                state.last_drop_log = Some(Instant::now());
            }
            return false;
        }

        let Some(animation) = self.registry.get(&state.config.target_animation_name) else {
            warn!(
                sensor = %name,
                animation = %state.config.target_animation_name,
                "target animation not found; ignoring trigger"
            );
            return false;
        };

        // Ask the engine first: only a successful `start()` counts as
        // "triggered" for event emission and the active latch. Literal
        // §4.7 prose orders emission before the engine call, but that
        // ordering can record two trigger events for one animation slot
        // under contention; gating on the engine's own verdict is the
        // only way to guarantee exactly one (per §8 Scenario C).
        match self.engine.start(
            &state.config.target_animation_name,
            &animation,
            reading.timestamp_ms,
        ) {
            Ok(()) => {
                state.active = true;
                let clear_after =
                    animation.timeline.duration_ms().max(AUTO_CLEAR_SAFETY_MARGIN_MS);
                state.clear_at_ms = Some(reading.timestamp_ms + clear_after);
                let event = TriggerEvent {
                    sensor_name: name.clone(),
                    value: reading.value,
                    animation_name: state.config.target_animation_name.clone(),
                    timestamp_ms: reading.timestamp_ms,
                };
                self.trigger_sink.emit(event);
                true
            }
            Err(Error::Busy) => {
                debug!(sensor = %name, "trigger dropped, engine busy");
                state.pending_reset_due_to_busy = true;
                false
            }
            Err(e) => {
                warn!(sensor = %name, error = %e, "engine rejected start");
                false
            }
        }
    }

    /// Clears any sensor whose auto-clear deadline has passed (§4.7,
    /// §5). Called periodically by the production driver loop and
    /// directly by tests with synthetic timestamps.
    pub fn sweep_clears(&self, now_ms: u64) {
        let mut sensors = self.sensors.write();
        for state in sensors.values_mut() {
            if let Some(clear_at) = state.clear_at_ms {
                if now_ms >= clear_at {
                    state.active = false;
                    state.clear_at_ms = None;
                }
            }
        }
    }

    pub fn is_active(&self, sensor_name: &str) -> bool {
        self.sensors
            .read()
            .get(sensor_name)
            .map(|s| s.active)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stairled_i2c::RecordingBus;
    use stairled_types::{
        AnimationConfig, Brightness, ChipAddress, Easing, LedstripTimelineConfig,
        NamedAnimationConfig, PinMapConfig, PinMapEntry, Step, TimelineItemConfig,
    };

    use crate::pinmap::PinMapper;

    struct RecordingSink {
        events: parking_lot::Mutex<Vec<TriggerEvent>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                events: parking_lot::Mutex::new(Vec::new()),
            }
        }
        fn events(&self) -> Vec<TriggerEvent> {
            self.events.lock().clone()
        }
    }

    impl TriggerSink for RecordingSink {
        fn emit(&self, event: TriggerEvent) {
            self.events.lock().push(event);
        }
    }

    fn fade1(name: &str) -> NamedAnimationConfig {
        NamedAnimationConfig {
            name: name.to_string(),
            description: String::new(),
            timeline: LedstripTimelineConfig {
                items: vec![TimelineItemConfig {
                    offset_ms: 0,
                    animation: AnimationConfig::FadeIn {
                        leds: vec![Step(1)],
                        start_brightness: Brightness::clamped(0),
                        end_brightness: Brightness::clamped(4000),
                        duration_ms: 1000,
                        easing: Easing::Linear,
                    },
                }],
            },
            step_groups: Default::default(),
        }
    }

    fn setup(sensors: Vec<SensorConfig>) -> (Arc<SensorDispatcher>, Arc<RecordingSink>) {
        let bus = Arc::new(RecordingBus::new());
        bus.mark_responsive(ChipAddress(0x40));
        let mapper = Arc::new(PinMapper::initialize(
            bus,
            &[ChipAddress(0x40)],
            PinMapConfig {
                entries: vec![PinMapEntry {
                    step: Step(1),
                    chip: ChipAddress(0x40),
                    channel: stairled_types::Channel(0),
                }],
            },
            52_000,
            25_000_000,
        ));
        let engine = Arc::new(AnimationEngine::new(mapper, 60));
        let registry = Arc::new(AnimationRegistry::new());
        registry.upsert(fade1("fade1")).unwrap();
        registry.upsert(fade1("fade2")).unwrap();
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = Arc::new(SensorDispatcher::new(
            sensors,
            "stairled-sensor-".to_string(),
            engine,
            registry,
            sink.clone(),
        ));
        (dispatcher, sink)
    }

    fn sensor(name: &str, target: &str) -> SensorConfig {
        SensorConfig {
            name: name.to_string(),
            channel_id: "chan".to_string(),
            threshold: 500.0,
            operator: Operator::Le,
            target_animation_name: target.to_string(),
            enabled: true,
        }
    }

    fn reading(name: &str, value: f64, t: u64) -> SensorReading {
        SensorReading {
            sensor_name: name.to_string(),
            value,
            timestamp_ms: t,
        }
    }

    #[test]
    fn scenario_b_triggers_exactly_once() {
        let (dispatcher, sink) = setup(vec![sensor("A", "fade1")]);
        assert!(!dispatcher.handle_reading(&reading("A", 600.0, 0)));
        assert!(dispatcher.handle_reading(&reading("A", 400.0, 10)));
        assert!(!dispatcher.handle_reading(&reading("A", 300.0, 20)));
        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.events()[0].value, 400.0);
    }

    #[test]
    fn scenario_c_single_flight_under_contention() {
        let (dispatcher, sink) = setup(vec![sensor("A", "fade1"), sensor("B", "fade2")]);
        let a_started = dispatcher.handle_reading(&reading("A", 100.0, 0));
        let b_started = dispatcher.handle_reading(&reading("B", 100.0, 0));
        assert!(a_started);
        assert!(!b_started);
        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn strips_configured_topic_prefix() {
        let (dispatcher, _sink) = setup(vec![sensor("A", "fade1")]);
        assert!(dispatcher.handle_reading(&reading("stairled-sensor-A", 100.0, 0)));
    }
}
