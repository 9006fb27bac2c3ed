//! Register-level model of a TCN75A on a simulated I2C bus.
//!
//! The model keeps the pointer register, configuration, limits and the last
//! conversion result, and evaluates the alert output after every conversion
//! the way the part does: fault queue, comparator or interrupt behaviour,
//! and output polarity. High-to-low transitions of the ALERT line are
//! counted so the caller can forward them as falling-edge interrupts.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use embedded_hal::i2c::{self, ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use log::{debug, trace};

use tcn75a_core::registers::{
    AlertMode, AlertPolarity, OneShot, ShutdownMode, decode_temperature, encode_limit,
};
use tcn75a_core::{Celsius, ConfigRegister, Register};

/// Power-on `T_HYST`.
pub const POWER_ON_HYSTERESIS: u8 = 75;
/// Power-on `T_SET`.
pub const POWER_ON_SET: u8 = 80;

/// Highest temperature the unsigned register encoding can carry.
const MAX_ENCODED: f32 = 255.9375;

#[derive(Debug)]
pub struct SimulatedTcn75a {
    pointer: Register,
    config: ConfigRegister,
    temperature: [u8; 2],
    hysteresis: [u8; 2],
    set: [u8; 2],
    alert: bool,
    // Interrupt mode only: the next event is a crossing of T_SET
    armed_high: bool,
    faults: u8,
    line_low: bool,
    falling_edges: u32,
}

impl Default for SimulatedTcn75a {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTcn75a {
    pub fn new() -> Self {
        let mut device = Self {
            pointer: Register::Temperature,
            config: ConfigRegister::default(),
            temperature: [0; 2],
            hysteresis: encode_limit(POWER_ON_HYSTERESIS, false),
            set: encode_limit(POWER_ON_SET, false),
            alert: false,
            armed_high: true,
            faults: 0,
            line_low: false,
            falling_edges: 0,
        };
        device.line_low = device.line_level_low();
        device
    }

    pub fn config(&self) -> ConfigRegister {
        self.config
    }

    pub fn temperature(&self) -> Celsius {
        Celsius::from_raw(self.temperature)
    }

    pub fn alert_active(&self) -> bool {
        self.alert
    }

    pub fn line_is_low(&self) -> bool {
        self.line_low
    }

    /// Falling edges on the ALERT line since the last call.
    pub fn take_falling_edges(&mut self) -> u32 {
        std::mem::take(&mut self.falling_edges)
    }

    /// Run one conversion at `ambient` °C. Returns `false` when the device
    /// is shut down and no one-shot was requested.
    pub fn convert(&mut self, ambient: f32) -> bool {
        if self.config.shutdown() == ShutdownMode::Shutdown {
            if self.config.one_shot() != OneShot::Single {
                return false;
            }
            // One-shot bit clears itself once the conversion completes
            self.config = self.config.with(OneShot::Continuous);
        }

        let fixed = (ambient.clamp(0.0, MAX_ENCODED) * 256.0) as u16;
        let mut bytes = fixed.to_be_bytes();
        bytes[1] &= self.config.resolution().fraction_mask();
        self.temperature = bytes;
        trace!(
            "Conversion {:.4} -> {:.4} ({}-bit)",
            ambient,
            decode_temperature(bytes[0], bytes[1]),
            self.config.resolution().bits_of_precision()
        );

        self.evaluate(u16::from_be_bytes(bytes));
        true
    }

    fn evaluate(&mut self, reading: u16) {
        let set = u16::from_be_bytes(self.set);
        let hysteresis = u16::from_be_bytes(self.hysteresis);

        match self.config.alert_mode() {
            AlertMode::Comparator => {
                let toward = if self.alert {
                    reading < hysteresis
                } else {
                    reading > set
                };
                if self.count_fault(toward) {
                    self.alert = !self.alert;
                    debug!("Comparator alert -> {}", self.alert);
                }
            }
            AlertMode::Interrupt => {
                let toward = if self.armed_high {
                    reading > set
                } else {
                    reading < hysteresis
                };
                if self.count_fault(toward) {
                    self.alert = true;
                    self.armed_high = !self.armed_high;
                    debug!("Interrupt alert latched");
                }
            }
        }
        self.refresh_line();
    }

    /// Track consecutive out-of-limit conversions. True once the fault queue
    /// is satisfied.
    fn count_fault(&mut self, out_of_limit: bool) -> bool {
        if !out_of_limit {
            self.faults = 0;
            return false;
        }
        self.faults += 1;
        if self.faults >= self.config.fault_queue().count() {
            self.faults = 0;
            true
        } else {
            false
        }
    }

    fn line_level_low(&self) -> bool {
        match self.config.alert_polarity() {
            AlertPolarity::ActiveLow => self.alert,
            AlertPolarity::ActiveHigh => !self.alert,
        }
    }

    fn refresh_line(&mut self) {
        let low = self.line_level_low();
        if low && !self.line_low {
            self.falling_edges += 1;
        }
        self.line_low = low;
    }

    fn register_bytes(&self, register: Register) -> &[u8] {
        match register {
            Register::Temperature => &self.temperature,
            Register::Config => core::slice::from_ref(&self.config.0),
            Register::Hysteresis => &self.hysteresis,
            Register::Set => &self.set,
        }
    }

    /// Bus write: pointer byte, then optional data for that register.
    pub fn write(&mut self, bytes: &[u8]) {
        let Some((&pointer, data)) = bytes.split_first() else {
            return;
        };
        self.pointer = Register::from_pointer(pointer);
        if data.is_empty() {
            return;
        }

        match self.pointer {
            // Read-only
            Register::Temperature => {}
            Register::Config => {
                self.config = ConfigRegister(data[0]);
                self.refresh_line();
            }
            Register::Hysteresis => Self::store_limit(&mut self.hysteresis, data),
            Register::Set => Self::store_limit(&mut self.set, data),
        }
    }

    fn store_limit(target: &mut [u8; 2], data: &[u8]) {
        for (dst, src) in target.iter_mut().zip(data) {
            *dst = *src;
        }
        // Only the half-degree bit exists in the low byte
        target[1] &= 0x80;
    }

    /// Bus read from the register the pointer selects. Bytes beyond the
    /// register width read as 0xFF.
    pub fn read(&mut self, buf: &mut [u8]) {
        let source = self.register_bytes(self.pointer);
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = source.get(i).copied().unwrap_or(0xFF);
        }

        if self.config.alert_mode() == AlertMode::Interrupt && self.alert {
            self.alert = false;
            debug!("Interrupt alert cleared by register read");
            self.refresh_line();
        }
    }
}

/// A simulated device plus the address its pins are strapped to.
#[derive(Debug, Clone)]
pub struct SharedDevice {
    device: Arc<Mutex<SimulatedTcn75a>>,
    strap: Arc<AtomicU8>,
}

impl SharedDevice {
    pub fn new(address: u8) -> Self {
        Self {
            device: Arc::new(Mutex::new(SimulatedTcn75a::new())),
            strap: Arc::new(AtomicU8::new(address)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SimulatedTcn75a) -> R) -> R {
        let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut device)
    }

    pub fn address(&self) -> u8 {
        self.strap.load(Ordering::Acquire)
    }

    /// Move the device to another bus address, as if its A2..A0 pins changed.
    pub fn restrap(&self, address: u8) {
        self.strap.store(address, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimBusError {
    NoAcknowledge,
}

impl i2c::Error for SimBusError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NoAcknowledge => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
        }
    }
}

/// I2C bus with a single TCN75A on it.
#[derive(Debug, Clone)]
pub struct SimBus {
    device: SharedDevice,
}

impl SimBus {
    pub fn new(device: SharedDevice) -> Self {
        Self { device }
    }
}

impl ErrorType for SimBus {
    type Error = SimBusError;
}

impl I2c for SimBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.device.address() {
            trace!("NACK at {:#04x}", address);
            return Err(SimBusError::NoAcknowledge);
        }

        self.device.with(|device| {
            for op in operations.iter_mut() {
                match op {
                    Operation::Write(bytes) => device.write(*bytes),
                    Operation::Read(buf) => device.read(buf),
                }
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcn75a_core::registers::{FaultQueue, FieldSetting, Resolution};

    fn with_config(config: ConfigRegister) -> SimulatedTcn75a {
        let mut device = SimulatedTcn75a::new();
        device.write(&[0x01, config.raw()]);
        device
    }

    fn read_register(device: &mut SimulatedTcn75a, pointer: u8, len: usize) -> Vec<u8> {
        device.write(&[pointer]);
        let mut buf = vec![0; len];
        device.read(&mut buf);
        buf
    }

    #[test]
    fn test_power_on_limits() {
        let mut device = SimulatedTcn75a::new();
        assert_eq!(read_register(&mut device, 0x02, 2), [75, 0]);
        assert_eq!(read_register(&mut device, 0x03, 2), [80, 0]);
        assert_eq!(read_register(&mut device, 0x01, 1), [0]);
    }

    #[test]
    fn test_pointer_persists_between_reads() {
        let mut device = SimulatedTcn75a::new();
        device.convert(21.5);
        device.write(&[0x00]);

        let mut buf = [0u8; 2];
        device.read(&mut buf);
        assert_eq!(buf, [21, 0x80]);
        device.read(&mut buf);
        assert_eq!(buf, [21, 0x80]);
    }

    #[test]
    fn test_limit_write_keeps_half_bit_only() {
        let mut device = SimulatedTcn75a::new();
        device.write(&[0x03, 30, 0xFF]);
        assert_eq!(read_register(&mut device, 0x03, 2), [30, 0x80]);
    }

    #[test]
    fn test_temperature_is_read_only() {
        let mut device = SimulatedTcn75a::new();
        device.convert(20.0);
        device.write(&[0x00, 99, 99]);
        assert_eq!(read_register(&mut device, 0x00, 2), [20, 0]);
    }

    #[test]
    fn test_resolution_quantizes() {
        let mut device = SimulatedTcn75a::new();
        device.convert(25.3);
        // 9-bit power-on resolution, 0.5 steps
        assert_eq!(device.temperature().degrees(), 25.0);

        let mut device = with_config(ConfigRegister::default().with(Resolution::Bits12));
        device.convert(25.3);
        assert_eq!(device.temperature().degrees(), 25.25);
    }

    #[test]
    fn test_shutdown_stops_conversions() {
        let mut device = SimulatedTcn75a::new();
        device.convert(22.0);
        device.write(&[0x01, ShutdownMode::Shutdown.bits()]);

        assert!(!device.convert(30.0));
        assert_eq!(device.temperature().degrees(), 22.0);
    }

    #[test]
    fn test_one_shot_converts_once() {
        let config = ConfigRegister::default()
            .with(ShutdownMode::Shutdown)
            .with(OneShot::Single);
        let mut device = with_config(config);

        assert!(device.convert(30.0));
        assert_eq!(device.config().one_shot(), OneShot::Continuous);
        assert!(!device.convert(40.0));
        assert_eq!(device.temperature().degrees(), 30.0);
    }

    #[test]
    fn test_comparator_asserts_and_releases() {
        let mut device = SimulatedTcn75a::new();
        device.convert(81.0);
        assert!(device.alert_active());
        assert!(device.line_is_low());
        assert_eq!(device.take_falling_edges(), 1);

        // Between the limits the output holds
        device.convert(77.0);
        assert!(device.alert_active());

        device.convert(74.0);
        assert!(!device.alert_active());
        assert!(!device.line_is_low());
        assert_eq!(device.take_falling_edges(), 0);
    }

    #[test]
    fn test_fault_queue_needs_consecutive_faults() {
        let mut device = with_config(ConfigRegister::default().with(FaultQueue::Four));
        for _ in 0..3 {
            device.convert(85.0);
        }
        assert!(!device.alert_active());

        // A reading back in range resets the count
        device.convert(70.0);
        for _ in 0..3 {
            device.convert(85.0);
        }
        assert!(!device.alert_active());

        device.convert(85.0);
        assert!(device.alert_active());
    }

    #[test]
    fn test_interrupt_cleared_by_any_read() {
        let mut device = with_config(ConfigRegister::default().with(AlertMode::Interrupt));
        device.convert(81.0);
        assert!(device.alert_active());
        assert_eq!(device.take_falling_edges(), 1);

        read_register(&mut device, 0x01, 1);
        assert!(!device.alert_active());

        // Still above T_SET, but now armed for the hysteresis crossing
        device.convert(82.0);
        assert!(!device.alert_active());

        device.convert(70.0);
        assert!(device.alert_active());
        assert_eq!(device.take_falling_edges(), 1);
    }

    #[test]
    fn test_active_high_polarity_inverts_line() {
        let mut device = SimulatedTcn75a::new();
        device.write(&[0x01, AlertPolarity::ActiveHigh.bits()]);
        // Idle active-high output sits low
        assert!(device.line_is_low());
        assert_eq!(device.take_falling_edges(), 1);

        device.convert(81.0);
        assert!(device.alert_active());
        assert!(!device.line_is_low());
        assert_eq!(device.take_falling_edges(), 0);
    }

    #[test]
    fn test_bus_nacks_other_addresses() {
        let shared = SharedDevice::new(0x48);
        let mut bus = SimBus::new(shared.clone());
        let mut buf = [0u8; 2];

        assert_eq!(
            bus.write_read(0x49, &[0x00], &mut buf),
            Err(SimBusError::NoAcknowledge)
        );
        assert!(bus.write_read(0x48, &[0x03], &mut buf).is_ok());
        assert_eq!(buf, [80, 0]);

        shared.restrap(0x49);
        assert!(bus.write_read(0x48, &[0x00], &mut buf).is_err());
        assert!(bus.write_read(0x49, &[0x00], &mut buf).is_ok());
    }

    #[test]
    fn test_driver_against_model() {
        let shared = SharedDevice::new(0x48);
        shared.with(|device| device.convert(23.5));

        let mut tcn = tcn75a_core::Tcn75a::new(SimBus::new(shared.clone()), 0x48);
        assert_eq!(tcn.read_temperature().unwrap().degrees(), 23.5);
        assert!(tcn.apply_setting(Resolution::Bits10).unwrap());
        tcn.set_limit(tcn75a_core::LimitRegister::Set, 24, true).unwrap();
        assert_eq!(
            tcn.read_limit(tcn75a_core::LimitRegister::Set).unwrap().degrees(),
            24.5
        );

        shared.restrap(0x4D);
        assert!(tcn.reassign_address(0x4E).is_err());
        assert_eq!(tcn.address(), 0x48);
        tcn.reassign_address(0x4D).unwrap();
        assert_eq!(tcn.address(), 0x4D);
    }
}
