//! Data model and configuration types shared by the stairled animation
//! core. No I/O lives here: this crate only defines the wire/config shape
//! of pin maps, animations, sensors and trigger events, and the pure
//! validation/duration arithmetic that follows directly from that shape.

pub mod animation;
pub mod config;
pub mod ids;
pub mod pinmap;
pub mod sensor;

pub use animation::{
    AnimationConfig, AnimationValidationError, Easing, LedstripTimelineConfig,
    NamedAnimationConfig, TimelineItemConfig,
};
pub use config::{CoreConfig, DispatcherConfig, EngineConfig, PinMapperConfig};
pub use ids::{Brightness, Channel, ChipAddress, PhysicalPin, Step};
pub use pinmap::{PinMapConfig, PinMapEntry, PinMapValidationError};
pub use sensor::{Operator, SensorConfig, SensorReading, TriggerEvent};
