use stairled_types::{Brightness, Step};

/// The read-only view of live output state that `on_start()` may consult,
/// e.g. `FadeTo` snapshotting the current brightness of its target leds
/// (§4.4). Implemented by `PinMapper`.
pub trait BrightnessObserver {
    fn current_brightness(&self, step: Step) -> Brightness;
}

/// A `BrightnessObserver` that always reports zero, useful for unit tests
/// of animation variants in isolation from a real pin mapper.
pub struct ZeroObserver;

impl BrightnessObserver for ZeroObserver {
    fn current_brightness(&self, _step: Step) -> Brightness {
        Brightness::ZERO
    }
}
