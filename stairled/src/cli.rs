use std::path::PathBuf;

use clap::Parser;

/// Stairled animation core: reads its configuration, brings up the
/// PCA9685 fleet, and runs the engine/dispatcher loop.
#[derive(Debug, Parser)]
#[command(name = "stairled", version)]
pub struct Cli {
    /// Path to the TOML configuration file (§6).
    #[arg(long, env = "STAIRLED_CONFIG")]
    pub config: PathBuf,

    /// Linux I2C bus device node.
    #[arg(long, env = "STAIRLED_I2C_BUS", default_value = "/dev/i2c-1")]
    pub i2c_bus: String,

    /// PCA9685 internal oscillator frequency in Hz (§4.2 Open Question:
    /// the datasheet nominal value is 25MHz; boards with an external
    /// oscillator should override this).
    #[arg(long, default_value_t = stairled_i2c::registers::DEFAULT_OSCILLATOR_HZ)]
    pub oscillator_hz: u32,

    /// Run the startup self-test ramp across every mapped step.
    #[arg(long)]
    pub self_test: bool,
}
