//! C6 — Animation Engine: the periodic scheduler that owns the currently
//! running named animation and drives the pin mapper each tick (§4.6).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

use stairled_types::NamedAnimationConfig;

use crate::error::{Error, Result};
use crate::pinmap::PinMapper;
use crate::timeline::LedstripTimeline;

/// Minimum spacing between repeated "missed tick" warnings (§4.6/§5).
const MISSED_TICK_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Stopping,
}

struct Current {
    name: String,
    timeline: LedstripTimeline,
}

struct Inner {
    state: EngineState,
    current: Option<Current>,
}

/// Single dedicated-thread scheduler (§4.6, §5). `tick` is a pure function
/// of `now_ms` plus internal state so it can be driven directly by tests
/// without a real clock or thread.
pub struct AnimationEngine {
    pin_mapper: Arc<PinMapper>,
    tick_hz: u32,
    inner: Mutex<Inner>,
    stop_requested: AtomicBool,
    last_missed_tick_log: Mutex<Option<Instant>>,
}

impl AnimationEngine {
    pub fn new(pin_mapper: Arc<PinMapper>, tick_hz: u32) -> Self {
        Self {
            pin_mapper,
            tick_hz,
            inner: Mutex::new(Inner {
                state: EngineState::Idle,
                current: None,
            }),
            stop_requested: AtomicBool::new(false),
            last_missed_tick_log: Mutex::new(None),
        }
    }

    pub fn state(&self) -> EngineState {
        self.inner.lock().state
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(1000 / self.tick_hz.max(1) as u64)
    }

    /// Arms `animation` and transitions `IDLE -> RUNNING`; rejects with
    /// `Busy` from any other state, both as the dispatcher's own
    /// single-flight check and as the engine's defensive one (§4.6).
    pub fn start(&self, name: &str, config: &NamedAnimationConfig, now_ms: u64) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state != EngineState::Idle {
            return Err(Error::Busy);
        }
        let mut timeline = LedstripTimeline::new(config.timeline.clone());
        timeline.set_absolute_start(now_ms);
        inner.current = Some(Current {
            name: name.to_string(),
            timeline,
        });
        inner.state = EngineState::Running;
        info!(animation = name, "engine started animation");
        Ok(())
    }

    /// Cooperative: marks a pending stop, effective at the next `tick`
    /// call (§4.6, §5), not synchronously.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    pub fn current_name(&self) -> Option<String> {
        self.inner.lock().current.as_ref().map(|c| c.name.clone())
    }

    /// One scheduler step for `now_ms` (§4.6): renders the active set and
    /// writes it out in ascending `(chip, channel)` order, so visually
    /// adjacent steps served by different chips never tear within a tick.
    pub fn tick(&self, now_ms: u64) {
        let mut inner = self.inner.lock();
        match inner.state {
            EngineState::Idle => {}
            EngineState::Running => {
                if self.stop_requested.swap(false, Ordering::AcqRel) {
                    inner.state = EngineState::Stopping;
                } else if let Some(current) = &mut inner.current {
                    current.timeline.set_current(now_ms, self.pin_mapper.as_ref());
                    let merged = current.timeline.render_active();
                    let mut writes: Vec<_> = merged.into_iter().collect();
                    writes.sort_by_key(|(step, _)| {
                        self.pin_mapper
                            .get_mapped_pin(*step)
                            .map(|p| (p.chip, p.channel))
                    });
                    for (step, brightness) in writes {
                        self.pin_mapper.set_brightness(step, brightness);
                    }
                    if now_ms > current.timeline.absolute_end() {
                        inner.state = EngineState::Stopping;
                    }
                }
            }
            EngineState::Stopping => {}
        }

        if inner.state == EngineState::Stopping {
            drop(inner);
            self.pin_mapper.set_all(stairled_types::Brightness::ZERO);
            let mut inner = self.inner.lock();
            inner.state = EngineState::Idle;
            inner.current = None;
        }
    }

    /// Real clock-driven loop for the production binary. Sleeps to the
    /// next tick boundary; a tick missed by more than one period is not
    /// caught up, only logged, rate-limited (§4.6).
    pub fn run(&self, epoch: Instant, shutdown: &AtomicBool) {
        let period = self.tick_period();
        let mut next = Instant::now();
        while !shutdown.load(Ordering::Acquire) {
            let now = Instant::now();
            if now > next + period {
                self.log_missed_tick();
                next = now;
            }
            let now_ms = now.duration_since(epoch).as_millis() as u64;
            self.tick(now_ms);
            next += period;
            let sleep_for = next.saturating_duration_since(Instant::now());
            if !sleep_for.is_zero() {
                std::thread::sleep(sleep_for);
            }
        }
    }

    fn log_missed_tick(&self) {
        let mut last = self.last_missed_tick_log.lock();
        let now = Instant::now();
        let should_log = match *last {
            Some(prev) => now.duration_since(prev) >= MISSED_TICK_LOG_INTERVAL,
            None => true,
        };
        if should_log {
            warn!("engine tick missed by more than one period; skipping ahead rather than catching up");
            *last = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BrightnessObserver;
    use stairled_i2c::RecordingBus;
    use stairled_types::{
        AnimationConfig, Brightness, ChipAddress, Easing, LedstripTimelineConfig, PinMapConfig,
        PinMapEntry, Step, TimelineItemConfig,
    };

    fn pin_mapper() -> Arc<PinMapper> {
        let bus = Arc::new(RecordingBus::new());
        bus.mark_responsive(ChipAddress(0x40));
        Arc::new(PinMapper::initialize(
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
        ))
    }

    fn fade1() -> NamedAnimationConfig {
        NamedAnimationConfig {
            name: "fade1".to_string(),
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

    #[test]
    fn scenario_a_fade_in_single_step() {
        let mapper = pin_mapper();
        let engine = AnimationEngine::new(mapper.clone(), 60);
        let cfg = fade1();
        engine.start("fade1", &cfg, 0).unwrap();

        engine.tick(250);
        let v = mapper.current_brightness(Step(1)).get();
        assert!((900..=1100).contains(&v), "got {v}");

        engine.tick(1000);
        assert_eq!(mapper.current_brightness(Step(1)).get(), 4000);

        engine.tick(1050);
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(mapper.current_brightness(Step(1)).get(), 0);
    }

    #[test]
    fn start_while_running_is_busy() {
        let mapper = pin_mapper();
        let engine = AnimationEngine::new(mapper, 60);
        let cfg = fade1();
        engine.start("fade1", &cfg, 0).unwrap();
        assert!(matches!(engine.start("fade1", &cfg, 1), Err(Error::Busy)));
    }

    #[test]
    fn stop_is_cooperative_effective_next_tick() {
        let mapper = pin_mapper();
        let engine = AnimationEngine::new(mapper, 60);
        let cfg = fade1();
        engine.start("fade1", &cfg, 0).unwrap();
        engine.tick(10);
        assert_eq!(engine.state(), EngineState::Running);

        engine.stop();
        assert_eq!(engine.state(), EngineState::Running); // not yet
        engine.tick(20);
        assert_eq!(engine.state(), EngineState::Idle);
    }
}
