use serde::{Deserialize, Serialize};

use crate::ids::{Brightness, Step};

/// Easing functions required by §4.4. `Shifting` never accepts an easing
/// (its index arithmetic is discrete), enforced at validation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseInBack,
    EaseOutBack,
    EaseInOutBack,
    EaseInElastic,
    EaseOutElastic,
    EaseInOutElastic,
    EaseInBounce,
    EaseOutBounce,
    EaseInOutBounce,
}

impl Default for Easing {
    fn default() -> Self {
        Easing::Linear
    }
}

/// One animation variant's configuration, tagged by `kind` in serialized
/// form so config files name a variant by string while the in-memory value
/// stays a plain enum (§9 "dynamic lookup of animation classes by name").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AnimationConfig {
    FadeIn {
        leds: Vec<Step>,
        start_brightness: Brightness,
        end_brightness: Brightness,
        duration_ms: u64,
        #[serde(default)]
        easing: Easing,
    },
    FadeOut {
        leds: Vec<Step>,
        start_brightness: Brightness,
        duration_ms: u64,
        #[serde(default)]
        easing: Easing,
    },
    FadeTo {
        leds: Vec<Step>,
        target_brightness: Brightness,
        duration_ms: u64,
        #[serde(default)]
        easing: Easing,
    },
    Immediate {
        leds: Vec<Step>,
        brightness: Brightness,
        #[serde(default)]
        duration_ms: u64,
    },
    Sequence {
        inner: LedstripTimelineConfig,
    },
    Shifting {
        leds: Vec<Step>,
        pattern: Vec<Brightness>,
        step_ms: u64,
        #[serde(default)]
        bounce: bool,
    },
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AnimationValidationError {
    #[error("{variant}: leds must be a non-empty sequence of positive step ids")]
    EmptyLeds { variant: &'static str },
    #[error("{variant}: pattern must be a non-empty sequence of brightness values")]
    EmptyPattern { variant: &'static str },
    #[error("{variant}.step_ms must be > 0")]
    ZeroStepMs { variant: &'static str },
    #[error("{variant}: sequence inner timeline has no items")]
    EmptySequence { variant: &'static str },
}

impl AnimationConfig {
    pub fn variant_name(&self) -> &'static str {
        match self {
            AnimationConfig::FadeIn { .. } => "FadeIn",
            AnimationConfig::FadeOut { .. } => "FadeOut",
            AnimationConfig::FadeTo { .. } => "FadeTo",
            AnimationConfig::Immediate { .. } => "Immediate",
            AnimationConfig::Sequence { .. } => "Sequence",
            AnimationConfig::Shifting { .. } => "Shifting",
        }
    }

    /// Validate configuration-level invariants required by §4.4. Duration
    /// non-negativity and brightness-range clamping are enforced by the
    /// `u64`/`Brightness` types themselves; this covers the remaining
    /// rules (non-empty `leds`/`pattern`, positive `step_ms`).
    pub fn validate(&self) -> Result<(), AnimationValidationError> {
        let variant = self.variant_name();
        match self {
            AnimationConfig::FadeIn { leds, .. }
            | AnimationConfig::FadeOut { leds, .. }
            | AnimationConfig::FadeTo { leds, .. }
            | AnimationConfig::Immediate { leds, .. }
            | AnimationConfig::Shifting { leds, .. } => {
                if leds.is_empty() {
                    return Err(AnimationValidationError::EmptyLeds { variant });
                }
            }
            AnimationConfig::Sequence { inner } => {
                if inner.items.is_empty() {
                    return Err(AnimationValidationError::EmptySequence { variant });
                }
                for item in &inner.items {
                    item.animation.validate()?;
                }
            }
        }
        if let AnimationConfig::Shifting {
            pattern, step_ms, ..
        } = self
        {
            if pattern.is_empty() {
                return Err(AnimationValidationError::EmptyPattern { variant });
            }
            if *step_ms == 0 {
                return Err(AnimationValidationError::ZeroStepMs { variant });
            }
        }
        Ok(())
    }

    /// Deterministic duration computed from configuration alone, per
    /// §4.4. Computed once by the caller and cached; this function itself
    /// is pure and may be called any number of times.
    pub fn duration_ms(&self) -> u64 {
        match self {
            AnimationConfig::FadeIn { duration_ms, .. }
            | AnimationConfig::FadeOut { duration_ms, .. }
            | AnimationConfig::FadeTo { duration_ms, .. } => *duration_ms,
            AnimationConfig::Immediate { duration_ms, .. } => *duration_ms,
            AnimationConfig::Sequence { inner } => inner.duration_ms(),
            AnimationConfig::Shifting {
                pattern,
                step_ms,
                bounce,
                ..
            } => {
                let base = pattern.len() as u64 * *step_ms;
                if *bounce {
                    base * 2
                } else {
                    base
                }
            }
        }
    }
}

/// One `{offset_ms, animation}` entry in a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineItemConfig {
    pub offset_ms: u64,
    pub animation: AnimationConfig,
}

/// An ordered collection of timeline items sharing one absolute start time
/// once armed (§4.5). Used both as the container for a `NamedAnimation`
/// and as the inner timeline of a `Sequence` variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedstripTimelineConfig {
    pub items: Vec<TimelineItemConfig>,
}

impl LedstripTimelineConfig {
    /// `max(offset + animation.duration)` over items, per the invariant in
    /// §8.1.
    pub fn duration_ms(&self) -> u64 {
        self.items
            .iter()
            .map(|item| item.offset_ms + item.animation.duration_ms())
            .max()
            .unwrap_or(0)
    }
}

/// A registry entry: a named, described timeline plus optional symbolic
/// step groupings used by external validators/UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedAnimationConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub timeline: LedstripTimelineConfig,
    #[serde(default)]
    pub step_groups: std::collections::BTreeMap<String, Vec<Step>>,
}

impl NamedAnimationConfig {
    pub fn validate(&self) -> Result<(), AnimationValidationError> {
        for item in &self.timeline.items {
            item.animation.validate()?;
        }
        Ok(())
    }
}
