//! PCA9685 register map and timing constants (§4.2).

pub const MODE1: u8 = 0x00;
pub const MODE2: u8 = 0x01;
pub const PRE_SCALE: u8 = 0xFE;

pub const LED0_ON_L: u8 = 0x06;
pub const LED0_ON_H: u8 = 0x07;
pub const LED0_OFF_L: u8 = 0x08;
pub const LED0_OFF_H: u8 = 0x09;
/// Register stride per channel in the LEDn_* block.
pub const LED_REG_STRIDE: u8 = 4;

pub const ALL_LED_ON_L: u8 = 0xFA;
pub const ALL_LED_ON_H: u8 = 0xFB;
pub const ALL_LED_OFF_L: u8 = 0xFC;
pub const ALL_LED_OFF_H: u8 = 0xFD;

/// MODE1 bits.
pub const MODE1_SLEEP: u8 = 0x10;
pub const MODE1_AUTO_INCREMENT: u8 = 0x20;
pub const MODE1_RESTART: u8 = 0x80;

/// Set on the `_H` byte of an ON/OFF pair to force the channel fully on
/// or fully off, per §4.2's "special-case bits" note.
pub const LED_FULL_BIT: u8 = 0x10;

/// PCA9685's own internal RC oscillator frequency. Configurable per
/// device (SPEC_FULL §4.2) for boards wired to an external oscillator.
pub const DEFAULT_OSCILLATOR_HZ: u32 = 25_000_000;

pub fn led_on_l(channel: u8) -> u8 {
    LED0_ON_L + channel * LED_REG_STRIDE
}

pub fn led_off_l(channel: u8) -> u8 {
    LED0_OFF_L + channel * LED_REG_STRIDE
}

/// `round(oscillator_hz / (4096 * target_pwm_hz)) - 1`, per §4.2.
pub fn prescale_for(oscillator_hz: u32, target_pwm_hz: u32) -> u8 {
    let exact = oscillator_hz as f64 / (4096.0 * target_pwm_hz as f64);
    let rounded = exact.round() as i64 - 1;
    rounded.clamp(3, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prescale_matches_datasheet_example() {
        // 25MHz oscillator, 200Hz target: round(25e6/(4096*200)) - 1 = 30.
        assert_eq!(prescale_for(25_000_000, 200), 30);
    }

    #[test]
    fn led_register_offsets_follow_stride() {
        assert_eq!(led_on_l(0), LED0_ON_L);
        assert_eq!(led_off_l(0), LED0_OFF_L);
        assert_eq!(led_on_l(1), LED0_ON_L + 4);
        assert_eq!(led_off_l(15), LED0_OFF_L + 15 * 4);
    }
}
