//! C2 — PCA9685 device abstraction: reset/initialize, per-channel duty
//! programming, and the degraded-chip failure model of §4.2.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{error, warn};

use stairled_types::{Brightness, Channel, ChipAddress};

use crate::bus::I2cTransport;
use crate::error::Result;
use crate::registers;

/// Minimum spacing between repeated degraded-chip warnings for the same
/// chip, per §4.2/§7's "per-chip rate-limited error log".
const DEGRADED_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// One physical PCA9685 chip. Writes are synchronous and go through the
/// shared `I2cTransport`; a chip that starts failing is marked degraded
/// and further `set_channel`/`set_brightness` calls become no-ops rather
/// than propagating errors up into the render loop (§4.2, §7 `BusIo`).
pub struct Pca9685 {
    bus: Arc<dyn I2cTransport>,
    chip: ChipAddress,
    oscillator_hz: u32,
    degraded: AtomicBool,
    last_degraded_log: Mutex<Option<Instant>>,
}

impl Pca9685 {
    pub fn new(bus: Arc<dyn I2cTransport>, chip: ChipAddress, oscillator_hz: u32) -> Self {
        Self {
            bus,
            chip,
            oscillator_hz,
            degraded: AtomicBool::new(false),
            last_degraded_log: Mutex::new(None),
        }
    }

    pub fn chip_address(&self) -> ChipAddress {
        self.chip
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Resets MODE1, sleeps, programs `PRE_SCALE` from the oscillator
    /// and target frequency, restarts, and enables register
    /// auto-increment (§4.2).
    pub fn initialize(&self, target_pwm_hz: u32) -> Result<()> {
        self.write(registers::MODE1, &[0x00])?;

        self.write(registers::MODE1, &[registers::MODE1_SLEEP])?;

        let prescale = registers::prescale_for(self.oscillator_hz, target_pwm_hz);
        self.write(registers::PRE_SCALE, &[prescale])?;

        self.write(
            registers::MODE1,
            &[registers::MODE1_RESTART | registers::MODE1_AUTO_INCREMENT],
        )?;

        self.clear_degraded();
        Ok(())
    }

    /// Raw register form: `on_count`/`off_count` are written verbatim as
    /// 12-bit values with no full-on/full-off special bits (§4.2).
    pub fn set_channel(&self, channel: Channel, on_count: u16, off_count: u16) -> Result<()> {
        self.write_channel(channel, on_count, off_count, false, false)
    }

    /// The common "brightness" form: `on=0, off=brightness`, with
    /// full-on/full-off special-case bits when `brightness` is `0` or
    /// `4095` (§4.2). No-ops (after one rate-limited log) while the chip
    /// is degraded.
    pub fn set_brightness(&self, channel: Channel, brightness: Brightness) -> Result<()> {
        if self.is_degraded() {
            self.log_degraded_once();
            return Ok(());
        }
        let value = brightness.get();
        let (on, off, full_on, full_off) = if value == 0 {
            (0, 0, false, true)
        } else if value == Brightness::MAX {
            (0, 0, true, false)
        } else {
            (0, value, false, false)
        };
        self.write_channel(channel, on, off, full_on, full_off)
    }

    fn write_channel(
        &self,
        channel: Channel,
        on_count: u16,
        off_count: u16,
        full_on: bool,
        full_off: bool,
    ) -> Result<()> {
        let on_h = ((on_count >> 8) as u8 & 0x0F) | if full_on { registers::LED_FULL_BIT } else { 0 };
        let off_h =
            ((off_count >> 8) as u8 & 0x0F) | if full_off { registers::LED_FULL_BIT } else { 0 };
        let bytes = [
            (on_count & 0xFF) as u8,
            on_h,
            (off_count & 0xFF) as u8,
            off_h,
        ];
        self.write(registers::led_on_l(channel.0), &bytes)
    }

    /// Writes the `ALL_LED_OFF` registers, forcing every channel off
    /// regardless of its individual programming (§4.2).
    pub fn all_off(&self) -> Result<()> {
        self.write(
            registers::ALL_LED_ON_L,
            &[0x00, 0x00, 0x00, registers::LED_FULL_BIT],
        )
    }

    pub fn close(&self) -> Result<()> {
        self.all_off()
    }

    fn write(&self, register: u8, bytes: &[u8]) -> Result<()> {
        match self.bus.write_bytes(self.chip, register, bytes) {
            Ok(()) => {
                self.clear_degraded();
                Ok(())
            }
            Err(e) => {
                self.mark_degraded();
                Err(e)
            }
        }
    }

    fn mark_degraded(&self) {
        let was_degraded = self.degraded.swap(true, Ordering::AcqRel);
        if !was_degraded {
            error!(chip = %self.chip, "chip marked degraded after i2c write failure");
        } else {
            self.log_degraded_once();
        }
    }

    fn clear_degraded(&self) {
        if self.degraded.swap(false, Ordering::AcqRel) {
            tracing::info!(chip = %self.chip, "chip recovered after successful i2c access");
        }
    }

    fn log_degraded_once(&self) {
        let mut last = self.last_degraded_log.lock();
        let now = Instant::now();
        let should_log = match *last {
            Some(prev) => now.duration_since(prev) >= DEGRADED_LOG_INTERVAL,
            None => true,
        };
        if should_log {
            warn!(chip = %self.chip, "chip is degraded; writes are being suppressed");
            *last = Some(now);
        }
    }

    /// Re-probes the chip; a successful probe clears the degraded flag
    /// so subsequent writes resume (§4.2).
    pub fn reprobe(&self) -> bool {
        let ok = self.bus.probe(self.chip);
        if ok {
            self.clear_degraded();
        }
        ok
    }
}
