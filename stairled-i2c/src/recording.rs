//! An in-memory `I2cTransport` double used by tests in this crate and by
//! `stairled-engine`'s integration tests, so the end-to-end scenarios of
//! spec.md §8 can run without real I²C hardware.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use stairled_types::ChipAddress;

use crate::bus::I2cTransport;
use crate::error::{Error, Result};

#[derive(Default)]
struct Inner {
    registers: BTreeMap<(ChipAddress, u8), Vec<u8>>,
    failing: std::collections::BTreeSet<ChipAddress>,
    responsive: std::collections::BTreeSet<ChipAddress>,
}

/// Records every write for later assertions and can be told to fail all
/// access to a given chip address, simulating a degraded chip (Scenario
/// E) or an unresponsive one during discovery.
pub struct RecordingBus {
    inner: Mutex<Inner>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Marks a chip as present and responsive to `probe`/discovery reads.
    pub fn mark_responsive(&self, chip: ChipAddress) {
        self.inner.lock().responsive.insert(chip);
    }

    pub fn fail_chip(&self, chip: ChipAddress) {
        self.inner.lock().failing.insert(chip);
    }

    pub fn unfail_chip(&self, chip: ChipAddress) {
        self.inner.lock().failing.remove(&chip);
    }

    pub fn seed(&self, chip: ChipAddress, register: u8, bytes: Vec<u8>) {
        self.inner.lock().registers.insert((chip, register), bytes);
    }

    pub fn last_write(&self, chip: ChipAddress, register: u8) -> Option<Vec<u8>> {
        self.inner.lock().registers.get(&(chip, register)).cloned()
    }
}

impl I2cTransport for RecordingBus {
    fn write_bytes(&self, chip: ChipAddress, register: u8, bytes: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.failing.contains(&chip) {
            return Err(Error::ChipNotOpen(chip));
        }
        inner
            .registers
            .insert((chip, register), bytes.to_vec());
        Ok(())
    }

    fn read_bytes(&self, chip: ChipAddress, register: u8, len: usize) -> Result<Vec<u8>> {
        let inner = self.inner.lock();
        if inner.failing.contains(&chip) {
            return Err(Error::ChipNotOpen(chip));
        }
        if let Some(bytes) = inner.registers.get(&(chip, register)) {
            let mut out = bytes.clone();
            out.resize(len, 0);
            return Ok(out);
        }
        if inner.responsive.contains(&chip) {
            return Ok(vec![0u8; len]);
        }
        // No device acked this address: simulate a real bus NACK so
        // discovery scans don't find chips nobody ever marked present.
        Err(Error::ChipNotOpen(chip))
    }

    fn probe(&self, chip: ChipAddress) -> bool {
        let inner = self.inner.lock();
        if inner.failing.contains(&chip) {
            return false;
        }
        inner.responsive.contains(&chip)
    }
}
