//! Timeline animation model (C4/C5), pin mapper (C3), animation engine
//! (C6), sensor dispatcher (C7) and animation registry (C8).

pub mod animation;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod easing;
pub mod engine;
pub mod error;
pub mod pinmap;
pub mod registry;
pub mod timeline;

pub use animation::AnimationInstance;
pub use config::{ConfigError, ConfigSink, ConfigSource};
pub use context::{BrightnessObserver, ZeroObserver};
pub use dispatch::{
    ChannelSensorSource, LoggingTriggerSink, SensorDispatcher, SensorSource, TriggerSink,
};
pub use engine::{AnimationEngine, EngineState};
pub use error::{Error, Result};
pub use pinmap::{discover, PinMapper};
pub use registry::AnimationRegistry;
pub use timeline::{LedstripTimeline, TimelineItem};
