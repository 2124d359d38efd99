use serde::{Deserialize, Serialize};

use crate::ids::{ChipAddress, Channel, Step};

/// One `{step, chip_address, channel}` triple from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMapEntry {
    pub step: Step,
    pub chip: ChipAddress,
    pub channel: Channel,
}

/// The authoritative, validated `step -> (chip, channel)` map as loaded
/// from configuration. `PinMapper` (in `stairled-engine`) is the runtime
/// structure built from this; this type is the serde-facing shape of
/// `pinmapper.mapping`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMapConfig {
    pub entries: Vec<PinMapEntry>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PinMapValidationError {
    #[error("duplicate step {0}")]
    DuplicateStep(Step),
    #[error("duplicate physical pin {chip}/{channel:?}")]
    DuplicatePin { chip: ChipAddress, channel: Channel },
    #[error("step must be positive, got {0:?}")]
    NonPositiveStep(Step),
    #[error("chip address {0} is out of range 0x40..=0x7F")]
    ChipOutOfRange(ChipAddress),
    #[error("channel {0:?} is out of range 0..=15")]
    ChannelOutOfRange(Channel),
}

impl PinMapConfig {
    /// Structural validation only (uniqueness, range). Whether each
    /// `chip` is actually a discovered, responsive device is checked by
    /// the pin mapper against live discovery results, not here.
    pub fn validate(&self) -> Result<(), PinMapValidationError> {
        use std::collections::HashSet;

        let mut seen_steps = HashSet::new();
        let mut seen_pins = HashSet::new();

        for entry in &self.entries {
            if entry.step.0 == 0 {
                return Err(PinMapValidationError::NonPositiveStep(entry.step));
            }
            if !entry.chip.is_valid_range() {
                return Err(PinMapValidationError::ChipOutOfRange(entry.chip));
            }
            if !entry.channel.is_valid_range() {
                return Err(PinMapValidationError::ChannelOutOfRange(entry.channel));
            }
            if !seen_steps.insert(entry.step) {
                return Err(PinMapValidationError::DuplicateStep(entry.step));
            }
            if !seen_pins.insert((entry.chip, entry.channel)) {
                return Err(PinMapValidationError::DuplicatePin {
                    chip: entry.chip,
                    channel: entry.channel,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(step: u32, chip: u8, channel: u8) -> PinMapEntry {
        PinMapEntry {
            step: Step(step),
            chip: ChipAddress(chip),
            channel: Channel(channel),
        }
    }

    #[test]
    fn rejects_duplicate_step() {
        let cfg = PinMapConfig {
            entries: vec![entry(1, 0x40, 0), entry(1, 0x40, 1)],
        };
        assert_eq!(
            cfg.validate(),
            Err(PinMapValidationError::DuplicateStep(Step(1)))
        );
    }

    #[test]
    fn rejects_duplicate_pin() {
        let cfg = PinMapConfig {
            entries: vec![entry(1, 0x40, 0), entry(2, 0x40, 0)],
        };
        assert!(matches!(
            cfg.validate(),
            Err(PinMapValidationError::DuplicatePin { .. })
        ));
    }

    #[test]
    fn accepts_well_formed_map() {
        let cfg = PinMapConfig {
            entries: vec![entry(1, 0x40, 0), entry(2, 0x40, 1), entry(3, 0x41, 0)],
        };
        assert!(cfg.validate().is_ok());
    }
}
