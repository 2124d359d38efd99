//! I²C bus gateway (C1) and PCA9685 device driver (C2).

pub mod bus;
pub mod device;
pub mod error;
pub mod recording;
pub mod registers;

pub use bus::{I2cTransport, LinuxI2cBus};
pub use device::Pca9685;
pub use error::{Error, Result};
pub use recording::RecordingBus;
