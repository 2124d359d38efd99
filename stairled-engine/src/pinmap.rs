//! C3 — Pin Mapper: the authoritative `step -> (chip, channel)` map and
//! the last-written brightness per step.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use stairled_i2c::{registers, I2cTransport, Pca9685};
use stairled_types::{Brightness, Channel, ChipAddress, PhysicalPin, PinMapConfig, Step};

use crate::context::BrightnessObserver;

/// Excluded during discovery: a known false positive on the Raspberry
/// Pi's onboard bus (§4.3).
const DISCOVERY_EXCLUDED: u8 = 0x70;

struct Inner {
    devices: BTreeMap<ChipAddress, Arc<Pca9685>>,
    map: BTreeMap<Step, PhysicalPin>,
    brightness: HashMap<Step, Brightness>,
    lookup_cache: Option<HashMap<Step, PhysicalPin>>,
    logged_unknown: BTreeSet<Step>,
}

/// Scans `0x40..=0x7F` (excluding `0x70`), validating each candidate by
/// reading `MODE1` and accepting values `<= 0x7F` (§4.3).
pub fn discover(bus: &dyn I2cTransport) -> Vec<ChipAddress> {
    let mut found = Vec::new();
    for addr in ChipAddress::MIN..=ChipAddress::MAX {
        if addr == DISCOVERY_EXCLUDED {
            continue;
        }
        let chip = ChipAddress(addr);
        if let Ok(bytes) = bus.read_bytes(chip, registers::MODE1, 1) {
            if bytes.first().copied().unwrap_or(0xFF) <= 0x7F {
                found.push(chip);
            }
        }
    }
    found
}

pub struct PinMapper {
    bus: Arc<dyn I2cTransport>,
    oscillator_hz: u32,
    pwm_hz: u32,
    inner: RwLock<Inner>,
}

impl PinMapper {
    /// Constructs devices for `discovered` addresses; if `stored_map` is
    /// empty, generates a sequential default mapping: ascending step
    /// index across each device's 16 channels in discovery order (§4.3).
    pub fn initialize(
        bus: Arc<dyn I2cTransport>,
        discovered: &[ChipAddress],
        stored_map: PinMapConfig,
        pwm_hz: u32,
        oscillator_hz: u32,
    ) -> Self {
        let mut devices = BTreeMap::new();
        for &chip in discovered {
            let device = Arc::new(Pca9685::new(bus.clone(), chip, oscillator_hz));
            if let Err(e) = device.initialize(pwm_hz) {
                warn!(%chip, error = %e, "failed to initialize discovered chip");
            }
            devices.insert(chip, device);
        }

        let map = if stored_map.entries.is_empty() {
            let mut map = BTreeMap::new();
            let mut step = 1u32;
            for &chip in discovered {
                for ch in 0..Channel::COUNT {
                    map.insert(
                        Step(step),
                        PhysicalPin {
                            chip,
                            channel: Channel(ch),
                        },
                    );
                    step += 1;
                }
            }
            map
        } else {
            stored_map
                .entries
                .into_iter()
                .map(|e| {
                    (
                        e.step,
                        PhysicalPin {
                            chip: e.chip,
                            channel: e.channel,
                        },
                    )
                })
                .collect()
        };

        Self {
            bus,
            oscillator_hz,
            pwm_hz,
            inner: RwLock::new(Inner {
                devices,
                map,
                brightness: HashMap::new(),
                lookup_cache: None,
                logged_unknown: BTreeSet::new(),
            }),
        }
    }

    /// Atomic replacement: zero every channel in the current map, swap,
    /// zero every channel in the new map, invalidate caches (§4.3). No
    /// channel from the previous mapping is left lit once this returns.
    pub fn set_mapping(&self, new_map: BTreeMap<Step, PhysicalPin>) {
        let old_pins: Vec<PhysicalPin> = {
            let inner = self.inner.read();
            inner.map.values().copied().collect()
        };
        for pin in &old_pins {
            self.write_pin(*pin, Brightness::ZERO);
        }

        {
            let mut inner = self.inner.write();
            inner.map = new_map;
            inner.lookup_cache = None;
            inner.brightness.clear();
        }

        let new_pins: Vec<PhysicalPin> = {
            let inner = self.inner.read();
            inner.map.values().copied().collect()
        };
        for pin in &new_pins {
            self.write_pin(*pin, Brightness::ZERO);
        }
    }

    pub fn get_mapped_pin(&self, step: Step) -> Option<PhysicalPin> {
        {
            let inner = self.inner.read();
            if let Some(cache) = &inner.lookup_cache {
                return cache.get(&step).copied();
            }
        }
        let mut inner = self.inner.write();
        if inner.lookup_cache.is_none() {
            inner.lookup_cache = Some(inner.map.clone().into_iter().collect());
        }
        inner.lookup_cache.as_ref().unwrap().get(&step).copied()
    }

    /// Clamps to `[0, 4095]`, records in the per-step cache, writes to
    /// the device. Unknown steps are dropped with a log once per unique
    /// step (§4.3).
    pub fn set_brightness(&self, step: Step, value: Brightness) {
        let Some(pin) = self.get_mapped_pin(step) else {
            let mut inner = self.inner.write();
            if inner.logged_unknown.insert(step) {
                warn!(%step, "set_brightness on unmapped step; dropping");
            }
            return;
        };
        self.inner.write().brightness.insert(step, value);
        self.write_pin(pin, value);
    }

    pub fn set_all(&self, value: Brightness) {
        let steps: Vec<Step> = self.inner.read().map.keys().copied().collect();
        for step in steps {
            self.set_brightness(step, value);
        }
    }

    /// Sequentially ramps each mapped step to a visible value then back
    /// to zero, used as a startup self-test (§4.3). `delay` is injected
    /// so tests can use a zero sleep.
    pub fn test_ramp(&self, visible: Brightness, delay: std::time::Duration) {
        let steps: Vec<Step> = self.inner.read().map.keys().copied().collect();
        for step in steps {
            self.set_brightness(step, visible);
            std::thread::sleep(delay);
            self.set_brightness(step, Brightness::ZERO);
        }
    }

    /// The discovered chip list, part of the "self-describing discovery
    /// artefact" pull interface external UIs read from (§6).
    pub fn discovered_chips(&self) -> Vec<ChipAddress> {
        self.inner.read().devices.keys().copied().collect()
    }

    /// Read-only view for the external UI: `chip -> [(channel, step) x 16]`.
    pub fn driver_mappings(&self) -> BTreeMap<ChipAddress, [Option<Step>; 16]> {
        let inner = self.inner.read();
        let mut out: BTreeMap<ChipAddress, [Option<Step>; 16]> = inner
            .devices
            .keys()
            .map(|&chip| (chip, [None; 16]))
            .collect();
        for (&step, pin) in &inner.map {
            if let Some(row) = out.get_mut(&pin.chip) {
                row[pin.channel.0 as usize] = Some(step);
            }
        }
        out
    }

    fn write_pin(&self, pin: PhysicalPin, value: Brightness) {
        let device = { self.inner.read().devices.get(&pin.chip).cloned() };
        match device {
            Some(device) => {
                if let Err(e) = device.set_brightness(pin.channel, value) {
                    warn!(chip = %pin.chip, error = %e, "pin write failed");
                }
            }
            None => warn!(chip = %pin.chip, "no device for chip in pin map"),
        }
    }

    pub fn bus(&self) -> &Arc<dyn I2cTransport> {
        &self.bus
    }

    pub fn pwm_hz(&self) -> u32 {
        self.pwm_hz
    }

    pub fn oscillator_hz(&self) -> u32 {
        self.oscillator_hz
    }

    /// Re-probes every known device, clearing the degraded flag on any
    /// that now respond. A device stays degraded (writes are suppressed)
    /// until a successful probe, not merely until the bus recovers
    /// (§4.2). Returns the chips that recovered.
    pub fn reprobe_all(&self) -> Vec<ChipAddress> {
        let devices: Vec<Arc<Pca9685>> = self.inner.read().devices.values().cloned().collect();
        devices
            .into_iter()
            .filter(|d| d.is_degraded() && d.reprobe())
            .map(|d| d.chip_address())
            .collect()
    }

    /// Best-effort cleanup: `all_off()` on every known device, retried
    /// up to three times at 100ms intervals (§4.3). Idempotent: a second
    /// call after the first succeeded is a harmless no-op.
    pub fn shutdown_all_off(&self) {
        let devices: Vec<Arc<Pca9685>> = self.inner.read().devices.values().cloned().collect();
        for device in devices {
            let mut attempts = 0;
            loop {
                attempts += 1;
                match device.all_off() {
                    Ok(()) => break,
                    Err(e) if attempts < 3 => {
                        warn!(chip = %device.chip_address(), error = %e, attempt = attempts, "all_off failed, retrying");
                        std::thread::sleep(std::time::Duration::from_millis(100));
                    }
                    Err(e) => {
                        warn!(chip = %device.chip_address(), error = %e, "all_off failed after 3 attempts");
                        break;
                    }
                }
            }
        }
        info!("shutdown all_off complete");
        self.inner.write().brightness.clear();
    }
}

impl BrightnessObserver for PinMapper {
    fn current_brightness(&self, step: Step) -> Brightness {
        self.inner
            .read()
            .brightness
            .get(&step)
            .copied()
            .unwrap_or(Brightness::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stairled_i2c::RecordingBus;
    use stairled_types::PinMapEntry;

    fn bus_with_chips(chips: &[u8]) -> Arc<RecordingBus> {
        let bus = Arc::new(RecordingBus::new());
        for &c in chips {
            bus.mark_responsive(ChipAddress(c));
        }
        bus
    }

    #[test]
    fn discover_excludes_known_false_positive() {
        let bus = bus_with_chips(&[0x40, 0x70, 0x41]);
        let found = discover(bus.as_ref());
        assert_eq!(found, vec![ChipAddress(0x40), ChipAddress(0x41)]);
    }

    #[test]
    fn default_mapping_is_sequential_across_discovered_chips() {
        let bus = bus_with_chips(&[0x40, 0x41]);
        let mapper = PinMapper::initialize(
            bus.clone(),
            &[ChipAddress(0x40), ChipAddress(0x41)],
            PinMapConfig::default(),
            52_000,
            25_000_000,
        );
        assert_eq!(
            mapper.get_mapped_pin(Step(1)),
            Some(PhysicalPin {
                chip: ChipAddress(0x40),
                channel: Channel(0)
            })
        );
        assert_eq!(
            mapper.get_mapped_pin(Step(17)),
            Some(PhysicalPin {
                chip: ChipAddress(0x41),
                channel: Channel(0)
            })
        );
    }

    #[test]
    fn set_mapping_zeroes_old_channels_before_and_after_swap() {
        let bus = bus_with_chips(&[0x40]);
        let mapper = PinMapper::initialize(
            bus.clone(),
            &[ChipAddress(0x40)],
            PinMapConfig {
                entries: vec![PinMapEntry {
                    step: Step(1),
                    chip: ChipAddress(0x40),
                    channel: Channel(0),
                }],
            },
            52_000,
            25_000_000,
        );
        mapper.set_brightness(Step(1), Brightness::clamped(2000));

        let mut new_map = BTreeMap::new();
        new_map.insert(
            Step(1),
            PhysicalPin {
                chip: ChipAddress(0x40),
                channel: Channel(5),
            },
        );
        mapper.set_mapping(new_map);

        let old_channel_bytes = bus
            .last_write(ChipAddress(0x40), stairled_i2c::registers::led_on_l(0))
            .unwrap();
        assert_eq!(old_channel_bytes, vec![0, 0, 0, stairled_i2c::registers::LED_FULL_BIT]);

        mapper.set_brightness(Step(1), Brightness::clamped(1234));
        assert_eq!(
            mapper.get_mapped_pin(Step(1)).unwrap().channel,
            Channel(5)
        );
    }

    #[test]
    fn unknown_step_is_dropped_not_panicking() {
        let bus = bus_with_chips(&[0x40]);
        let mapper = PinMapper::initialize(
            bus,
            &[ChipAddress(0x40)],
            PinMapConfig::default(),
            52_000,
            25_000_000,
        );
        mapper.set_brightness(Step(999), Brightness::clamped(100));
        assert_eq!(mapper.get_mapped_pin(Step(999)), None);
    }

    #[test]
    fn shutdown_leaves_cached_brightness_at_zero() {
        let bus = bus_with_chips(&[0x40]);
        let mapper = PinMapper::initialize(
            bus,
            &[ChipAddress(0x40)],
            PinMapConfig {
                entries: vec![PinMapEntry {
                    step: Step(1),
                    chip: ChipAddress(0x40),
                    channel: Channel(0),
                }],
            },
            52_000,
            25_000_000,
        );
        mapper.set_brightness(Step(1), Brightness::clamped(3000));
        mapper.shutdown_all_off();
        assert_eq!(mapper.current_brightness(Step(1)).get(), 0);
    }
}
