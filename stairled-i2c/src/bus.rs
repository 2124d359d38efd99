//! C1 — I²C Bus Gateway. Serialized byte-level access to one I²C bus.
//! Concurrent callers queue on the gateway's internal lock in arrival
//! order; no retries happen at this layer (§4.1).

use std::collections::BTreeMap;

use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use parking_lot::Mutex;

use stairled_types::ChipAddress;

use crate::error::{Error, Result};

/// The blocking, serialized byte-level contract every bus implementation
/// (real Linux device or in-memory test double) must provide.
pub trait I2cTransport: Send + Sync {
    fn write_bytes(&self, chip: ChipAddress, register: u8, bytes: &[u8]) -> Result<()>;
    fn read_bytes(&self, chip: ChipAddress, register: u8, len: usize) -> Result<Vec<u8>>;

    /// Attempts a MODE1 read and returns whether it succeeded.
    fn probe(&self, chip: ChipAddress) -> bool {
        self.read_bytes(chip, crate::registers::MODE1, 1).is_ok()
    }
}

/// Linux `/dev/i2c-N` backed gateway. Each chip address gets its own
/// `LinuxI2CDevice` handle (the ioctl `I2C_SLAVE` binds one handle to one
/// address); all handles for this bus live behind a single mutex so every
/// operation — regardless of which chip it targets — is serialized
/// across callers in arrival order, matching §4.1's contract.
pub struct LinuxI2cBus {
    bus_path: String,
    handles: Mutex<BTreeMap<ChipAddress, LinuxI2CDevice>>,
}

impl LinuxI2cBus {
    pub fn open(bus_path: impl Into<String>) -> Self {
        Self {
            bus_path: bus_path.into(),
            handles: Mutex::new(BTreeMap::new()),
        }
    }

    fn with_device<T>(
        &self,
        chip: ChipAddress,
        f: impl FnOnce(&mut LinuxI2CDevice) -> std::result::Result<T, i2cdev::linux::LinuxI2CError>,
    ) -> Result<T> {
        let mut handles = self.handles.lock();
        let dev = match handles.entry(chip) {
            std::collections::btree_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::btree_map::Entry::Vacant(e) => {
                let dev = LinuxI2CDevice::new(&self.bus_path, chip.0 as u16)
                    .map_err(|source| Error::Bus { chip, source })?;
                e.insert(dev)
            }
        };
        f(dev).map_err(|source| Error::Bus { chip, source })
    }
}

impl I2cTransport for LinuxI2cBus {
    fn write_bytes(&self, chip: ChipAddress, register: u8, bytes: &[u8]) -> Result<()> {
        self.with_device(chip, |dev| {
            let mut payload = Vec::with_capacity(bytes.len() + 1);
            payload.push(register);
            payload.extend_from_slice(bytes);
            dev.write(&payload)
        })
    }

    fn read_bytes(&self, chip: ChipAddress, register: u8, len: usize) -> Result<Vec<u8>> {
        self.with_device(chip, |dev| {
            dev.write(&[register])?;
            let mut buf = vec![0u8; len];
            dev.read(&mut buf)?;
            Ok(buf)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBus;

    #[test]
    fn probe_reflects_responsiveness() {
        let bus = RecordingBus::new();
        bus.mark_responsive(ChipAddress(0x40));
        assert!(bus.probe(ChipAddress(0x40)));
        assert!(!bus.probe(ChipAddress(0x41)));
    }
}
