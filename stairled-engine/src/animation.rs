//! C4 — runtime timeline animation state machine. One `AnimationInstance`
//! per timeline item, wrapping the pure `AnimationConfig` from
//! `stairled-types` with the mutable lifecycle state of §3/§4.4.

use std::collections::BTreeMap;

use stairled_types::{AnimationConfig, Brightness, Step};

use crate::context::BrightnessObserver;
use crate::easing;
use crate::timeline::LedstripTimeline;

/// Internal progress resolution, per SPEC_FULL §9: fractional progress in
/// units of 1/65535 is tracked internally so short-duration animations
/// (< ~200ms at 60Hz) don't lose precision to integer-percent rounding;
/// the 0-100 integer is still what callers observe via `progress()`.
const PROGRESS_UNITS: u32 = 65_535;

pub struct AnimationInstance {
    config: AnimationConfig,
    duration_ms: u64,
    absolute_start: u64,
    absolute_end: u64,
    started: bool,
    active: bool,
    ended: bool,
    progress_units: u32,
    snapshot: BTreeMap<Step, Brightness>,
    /// Populated only for the `Sequence` variant; composition happens
    /// through this inner timeline rather than through inheritance (§9).
    inner: Option<LedstripTimeline>,
}

impl AnimationInstance {
    pub fn new(config: AnimationConfig) -> Self {
        let duration_ms = config.duration_ms();
        let inner = match &config {
            AnimationConfig::Sequence { inner } => Some(LedstripTimeline::new(inner.clone())),
            _ => None,
        };
        Self {
            config,
            duration_ms,
            absolute_start: 0,
            absolute_end: 0,
            started: false,
            active: false,
            ended: false,
            progress_units: 0,
            snapshot: BTreeMap::new(),
            inner,
        }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn absolute_end(&self) -> u64 {
        self.absolute_end
    }

    /// 0-100 integer percent, rounded from the internal fractional
    /// progress.
    pub fn progress(&self) -> u8 {
        let pct = (self.progress_units as f64 / PROGRESS_UNITS as f64) * 100.0;
        pct.round().clamp(0.0, 100.0) as u8
    }

    pub fn set_absolute_start(&mut self, t0_ms: u64) {
        self.absolute_start = t0_ms;
        self.absolute_end = t0_ms.saturating_add(self.duration_ms);
        if let Some(inner) = &mut self.inner {
            inner.set_absolute_start(t0_ms);
        }
    }

    fn on_start(&mut self, observer: &dyn BrightnessObserver) {
        if let AnimationConfig::FadeTo { leds, .. } = &self.config {
            for step in leds {
                self.snapshot.insert(*step, observer.current_brightness(*step));
            }
        }
    }

    /// Advances lifecycle state for `now_ms`, per the active-interval
    /// policy of §4.4 (inclusive `[start, end]`).
    pub fn tick(&mut self, now_ms: u64, observer: &dyn BrightnessObserver) {
        if now_ms < self.absolute_start {
            self.active = false;
            self.progress_units = 0;
        } else if now_ms <= self.absolute_end {
            if !self.started {
                self.started = true;
                self.on_start(observer);
            }
            self.active = true;
            self.progress_units = if self.duration_ms == 0 {
                PROGRESS_UNITS
            } else {
                let elapsed = now_ms - self.absolute_start;
                let fraction = elapsed as f64 / self.duration_ms as f64;
                (fraction * PROGRESS_UNITS as f64).round().min(PROGRESS_UNITS as f64) as u32
            };
        } else {
            self.progress_units = PROGRESS_UNITS;
            self.active = false;
            self.ended = true;
        }

        if let Some(inner) = &mut self.inner {
            inner.set_current(now_ms, observer);
        }
    }

    fn fraction(&self) -> f64 {
        self.progress_units as f64 / PROGRESS_UNITS as f64
    }

    /// Pure in `progress`/stored configuration (plus any `on_start`
    /// snapshot); must not mutate external state (§4.4).
    pub fn render(&self) -> BTreeMap<Step, Brightness> {
        let mut out = BTreeMap::new();
        match &self.config {
            AnimationConfig::FadeIn {
                leds,
                start_brightness,
                end_brightness,
                easing: ease,
                ..
            } => {
                let t = easing::apply(*ease, self.fraction());
                let value = lerp(start_brightness.get(), end_brightness.get(), t);
                for led in leds {
                    out.insert(*led, value);
                }
            }
            AnimationConfig::FadeOut {
                leds,
                start_brightness,
                easing: ease,
                ..
            } => {
                let t = easing::apply(*ease, self.fraction());
                let value = lerp(start_brightness.get(), 0, t);
                for led in leds {
                    out.insert(*led, value);
                }
            }
            AnimationConfig::FadeTo {
                leds,
                target_brightness,
                easing: ease,
                ..
            } => {
                let t = easing::apply(*ease, self.fraction());
                for led in leds {
                    // Per §9's open question: a step with no recorded
                    // snapshot (never seen by `on_start`, e.g. this
                    // instance was never ticked while active) reads as
                    // zero, matching the preserved source behavior.
                    let from = self
                        .snapshot
                        .get(led)
                        .copied()
                        .unwrap_or(Brightness::ZERO)
                        .get();
                    let value = lerp(from, target_brightness.get(), t);
                    out.insert(*led, value);
                }
            }
            AnimationConfig::Immediate { leds, brightness, .. } => {
                for led in leds {
                    out.insert(*led, *brightness);
                }
            }
            AnimationConfig::Sequence { .. } => {
                if let Some(inner) = &self.inner {
                    return inner.render_active();
                }
            }
            AnimationConfig::Shifting {
                leds,
                pattern,
                step_ms,
                bounce,
            } => {
                if !leds.is_empty() && !pattern.is_empty() {
                    let elapsed = self.current_elapsed();
                    let raw_index = elapsed / step_ms;
                    let index = bounced_index(raw_index, pattern.len() as u64, *bounce) as usize;
                    for (j, value) in pattern.iter().enumerate() {
                        let led_idx = (index + j) % leds.len();
                        out.insert(leds[led_idx], *value);
                    }
                }
            }
        }
        out
    }

    fn current_elapsed(&self) -> u64 {
        (self.fraction() * self.duration_ms as f64).round() as u64
    }
}

fn lerp(start: u16, end: u16, t: f64) -> Brightness {
    let value = start as f64 + (end as f64 - start as f64) * t;
    Brightness::clamped(value.round() as i64)
}

/// Reflects `raw_index` into `[0, pattern_len)` via a triangular wave when
/// `bounce` is set (§4.4's "Shifting" rendering rule).
fn bounced_index(raw_index: u64, pattern_len: u64, bounce: bool) -> u64 {
    if pattern_len <= 1 {
        return 0;
    }
    if !bounce {
        return raw_index.min(pattern_len - 1);
    }
    let period = 2 * (pattern_len - 1);
    let pos = raw_index % period;
    if pos < pattern_len {
        pos
    } else {
        period - pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ZeroObserver;
    use stairled_types::Easing;

    fn fade_in(duration_ms: u64) -> AnimationConfig {
        AnimationConfig::FadeIn {
            leds: vec![Step(1)],
            start_brightness: Brightness::clamped(0),
            end_brightness: Brightness::clamped(4095),
            duration_ms,
            easing: Easing::Linear,
        }
    }

    #[test]
    fn before_start_inactive_and_zero_progress() {
        let mut a = AnimationInstance::new(fade_in(1000));
        a.set_absolute_start(1000);
        a.tick(500, &ZeroObserver);
        assert!(!a.is_active());
        assert_eq!(a.progress(), 0);
    }

    #[test]
    fn after_end_ended_full_progress_inactive() {
        let mut a = AnimationInstance::new(fade_in(1000));
        a.set_absolute_start(0);
        a.tick(1001, &ZeroObserver);
        assert!(a.is_ended());
        assert!(!a.is_active());
        assert_eq!(a.progress(), 100);
    }

    #[test]
    fn fade_in_boundary_values() {
        let mut a = AnimationInstance::new(fade_in(1000));
        a.set_absolute_start(0);

        a.tick(0, &ZeroObserver);
        assert_eq!(a.render()[&Step(1)].get(), 0);

        a.tick(1000, &ZeroObserver);
        assert_eq!(a.render()[&Step(1)].get(), 4095);

        a.tick(500, &ZeroObserver);
        let mid = a.render()[&Step(1)].get();
        assert!((2047..=2048).contains(&mid), "mid was {mid}");
    }

    #[test]
    fn immediate_zero_duration_ends_next_tick() {
        let cfg = AnimationConfig::Immediate {
            leds: vec![Step(1)],
            brightness: Brightness::clamped(3000),
            duration_ms: 0,
        };
        let mut a = AnimationInstance::new(cfg);
        a.set_absolute_start(10);
        a.tick(10, &ZeroObserver);
        assert!(a.is_active());
        assert_eq!(a.render()[&Step(1)].get(), 3000);

        a.tick(11, &ZeroObserver);
        assert!(a.is_ended());
        assert!(!a.is_active());
    }

    #[test]
    fn shifting_bounce_indices_match_spec_example() {
        assert_eq!(bounced_index(0, 3, true), 0);
        assert_eq!(bounced_index(1, 3, true), 1);
        assert_eq!(bounced_index(2, 3, true), 2);
        assert_eq!(bounced_index(3, 3, true), 1);
        assert_eq!(bounced_index(4, 3, true), 0);
        assert_eq!(bounced_index(5, 3, true), 1);
    }

    #[test]
    fn fade_to_reads_snapshot_captured_at_on_start() {
        struct Fixed(u16);
        impl BrightnessObserver for Fixed {
            fn current_brightness(&self, _step: Step) -> Brightness {
                Brightness::clamped(self.0 as i64)
            }
        }

        let cfg = AnimationConfig::FadeTo {
            leds: vec![Step(1)],
            target_brightness: Brightness::clamped(4000),
            duration_ms: 100,
            easing: Easing::Linear,
        };
        let mut a = AnimationInstance::new(cfg);
        a.set_absolute_start(0);
        a.tick(0, &Fixed(1000));
        assert_eq!(a.render()[&Step(1)].get(), 1000);
        a.tick(100, &Fixed(9999)); // observer value must not affect later ticks
        assert_eq!(a.render()[&Step(1)].get(), 4000);
    }

    #[test]
    fn fade_to_defaults_to_zero_without_a_snapshot() {
        // Constructed but never ticked while active: on_start never ran.
        let cfg = AnimationConfig::FadeTo {
            leds: vec![Step(9)],
            target_brightness: Brightness::clamped(4000),
            duration_ms: 100,
            easing: Easing::Linear,
        };
        let a = AnimationInstance::new(cfg);
        assert_eq!(a.render()[&Step(9)].get(), 0);
    }
}
