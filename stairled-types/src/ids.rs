use serde::{Deserialize, Serialize};

/// A logical stair tread's LED group identifier. Dense but not required to
/// be contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Step(pub u32);

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "step#{}", self.0)
    }
}

/// A PCA9685 I²C slave address, `0x40..=0x7F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChipAddress(pub u8);

impl ChipAddress {
    pub const MIN: u8 = 0x40;
    pub const MAX: u8 = 0x7F;

    pub fn is_valid_range(self) -> bool {
        (Self::MIN..=Self::MAX).contains(&self.0)
    }
}

impl std::fmt::Display for ChipAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// One of the 16 PWM channels on a PCA9685 chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(pub u8);

impl Channel {
    pub const COUNT: u8 = 16;

    pub fn is_valid_range(self) -> bool {
        self.0 < Self::COUNT
    }
}

/// Physical PWM output: one chip address plus one channel on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhysicalPin {
    pub chip: ChipAddress,
    pub channel: Channel,
}

impl std::fmt::Display for PhysicalPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/ch{}", self.chip, self.channel.0)
    }
}

/// 12-bit PWM duty value, `0..=4095`. Out-of-range values are clamped at
/// construction, matching the writer-boundary clamp rule in the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Brightness(u16);

impl Brightness {
    pub const MAX: u16 = 4095;
    pub const ZERO: Brightness = Brightness(0);

    pub fn clamped(value: i64) -> Self {
        let v = value.clamp(0, Self::MAX as i64);
        Brightness(v as u16)
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl From<u16> for Brightness {
    fn from(value: u16) -> Self {
        Self::clamped(value as i64)
    }
}
