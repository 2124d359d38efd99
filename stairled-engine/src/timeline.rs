//! C5 — Ledstrip animation / timeline container: an ordered collection of
//! sub-animations with start offsets, sharing one absolute start time.

use std::collections::BTreeMap;

use stairled_types::{Brightness, LedstripTimelineConfig, Step};

use crate::animation::AnimationInstance;
use crate::context::BrightnessObserver;

pub struct TimelineItem {
    pub offset_ms: u64,
    pub animation: AnimationInstance,
}

/// Holds `[TimelineItem]` keyed by insertion order (§4.5). Used both as
/// the top-level timeline of a `NamedAnimation` and as the inner timeline
/// of a `Sequence` variant.
pub struct LedstripTimeline {
    items: Vec<TimelineItem>,
    started_at: u64,
    duration_ms: u64,
    active_indices: Vec<usize>,
}

impl LedstripTimeline {
    pub fn new(config: LedstripTimelineConfig) -> Self {
        let duration_ms = config.duration_ms();
        let items = config
            .items
            .into_iter()
            .map(|item| TimelineItem {
                offset_ms: item.offset_ms,
                animation: AnimationInstance::new(item.animation),
            })
            .collect();
        Self {
            items,
            started_at: 0,
            duration_ms,
            active_indices: Vec::new(),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn absolute_end(&self) -> u64 {
        self.started_at + self.duration_ms
    }

    /// Assigns `t0 + offset_ms` to every item (§4.5).
    pub fn set_absolute_start(&mut self, t0: u64) {
        self.started_at = t0;
        for item in &mut self.items {
            item.animation.set_absolute_start(t0 + item.offset_ms);
        }
    }

    /// Ticks every item and caches the set of currently-active indices,
    /// in insertion order, for `active_items`/`render_active`.
    pub fn set_current(&mut self, now_ms: u64, observer: &dyn BrightnessObserver) {
        self.active_indices.clear();
        for (idx, item) in self.items.iter_mut().enumerate() {
            item.animation.tick(now_ms, observer);
            if item.animation.is_active() {
                self.active_indices.push(idx);
            }
        }
    }

    pub fn active_items(&self) -> impl Iterator<Item = &TimelineItem> {
        self.active_indices.iter().map(move |&idx| &self.items[idx])
    }

    /// Merges active items' `render()` output in insertion order; later
    /// writes win for the same step (§4.5).
    pub fn render_active(&self) -> BTreeMap<Step, Brightness> {
        let mut out = BTreeMap::new();
        for item in self.active_items() {
            for (step, brightness) in item.animation.render() {
                out.insert(step, brightness);
            }
        }
        out
    }

    /// Clears absolute times and per-item lifecycle flags, preserving
    /// configuration (§4.5), by rebuilding fresh `AnimationInstance`s from
    /// each item's own configuration.
    pub fn reset(&mut self) {
        self.started_at = 0;
        self.active_indices.clear();
        for item in &mut self.items {
            let config = item.animation.config().clone();
            item.animation = AnimationInstance::new(config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ZeroObserver;
    use stairled_types::{AnimationConfig, Brightness, Easing, TimelineItemConfig};

    fn fade_to(led: u32, target: u16, duration_ms: u64) -> AnimationConfig {
        AnimationConfig::FadeTo {
            leds: vec![Step(led)],
            target_brightness: Brightness::clamped(target as i64),
            duration_ms,
            easing: Easing::Linear,
        }
    }

    #[test]
    fn duration_is_max_offset_plus_item_duration() {
        let cfg = LedstripTimelineConfig {
            items: vec![
                TimelineItemConfig {
                    offset_ms: 0,
                    animation: fade_to(1, 4000, 100),
                },
                TimelineItemConfig {
                    offset_ms: 200,
                    animation: fade_to(3, 4000, 100),
                },
            ],
        };
        let timeline = LedstripTimeline::new(cfg);
        assert_eq!(timeline.duration_ms(), 300);
    }

    #[test]
    fn sequence_scenario_f_merge_at_t150() {
        // Three FadeTo items at offsets 0, 100, 200ms (each 100ms) on
        // leds 1, 2, 3. At t=150 only led 2 is in the active set.
        let cfg = LedstripTimelineConfig {
            items: vec![
                TimelineItemConfig {
                    offset_ms: 0,
                    animation: fade_to(1, 4000, 100),
                },
                TimelineItemConfig {
                    offset_ms: 100,
                    animation: fade_to(2, 4000, 100),
                },
                TimelineItemConfig {
                    offset_ms: 200,
                    animation: fade_to(3, 4000, 100),
                },
            ],
        };
        let mut timeline = LedstripTimeline::new(cfg);
        timeline.set_absolute_start(0);
        timeline.set_current(150, &ZeroObserver);
        let merged = timeline.render_active();
        assert!(!merged.contains_key(&Step(1)));
        assert!(merged.contains_key(&Step(2)));
        assert!(!merged.contains_key(&Step(3)));
    }

    #[test]
    fn reset_clears_lifecycle_but_keeps_config() {
        let cfg = LedstripTimelineConfig {
            items: vec![TimelineItemConfig {
                offset_ms: 0,
                animation: fade_to(1, 4000, 100),
            }],
        };
        let mut timeline = LedstripTimeline::new(cfg);
        timeline.set_absolute_start(0);
        timeline.set_current(50, &ZeroObserver);
        assert!(!timeline.active_indices.is_empty());

        timeline.reset();
        assert_eq!(timeline.duration_ms(), 100);
        assert!(timeline.active_indices.is_empty());
    }
}
