//! Semantic operations on the TCN75A.
//!
//! Every call is a fresh bus transaction; nothing read from the device is
//! cached here. Configuration changes are read-modify-write and report
//! success only through the verification re-read, leaving feedback to the
//! caller.

use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::address;
use crate::error::SensorError;
use crate::registers::{
    Celsius, ConfigRegister, FieldSetting, LimitRegister, Register, apply_field, encode_limit,
};
use crate::transport::RegisterBus;

pub struct Tcn75a<I> {
    bus: RegisterBus<I>,
}

impl<I: I2c> Tcn75a<I> {
    pub const fn new(i2c: I, address: u8) -> Self {
        Self {
            bus: RegisterBus::new(i2c, address),
        }
    }

    pub fn address(&self) -> u8 {
        self.bus.address().get()
    }

    pub fn bus(&mut self) -> &mut RegisterBus<I> {
        &mut self.bus
    }

    /// Read the ambient temperature.
    pub fn read_temperature(&mut self) -> Result<Celsius, SensorError> {
        let mut raw = [0u8; 2];
        self.bus.read_register(Register::Temperature, &mut raw)?;
        Ok(Celsius::from_raw(raw))
    }

    pub fn read_config(&mut self) -> Result<ConfigRegister, SensorError> {
        let mut raw = [0u8; 1];
        self.bus.read_register(Register::Config, &mut raw)?;
        Ok(ConfigRegister(raw[0]))
    }

    /// Read-modify-write one configuration field. Bits outside `mask` are
    /// written back exactly as read.
    pub fn set_config_field(&mut self, mask: u8, value: u8) -> Result<(), SensorError> {
        let current = self.read_config()?.raw();
        let updated = apply_field(current, mask, value);
        self.bus.write_register(Register::Config, &[updated])?;
        info!(
            "Config {:#010b} -> {:#010b} (mask {:#010b})",
            current, updated, mask
        );
        Ok(())
    }

    /// Re-read the configuration and compare only the masked bits.
    pub fn verify_config_field(&mut self, mask: u8, expected: u8) -> Result<bool, SensorError> {
        let current = self.read_config()?.raw();
        let matches = current & mask == expected & mask;
        if !matches {
            warn!(
                "Config verify failed: {:#010b} & {:#010b} != {:#010b}",
                current, mask, expected
            );
        }
        Ok(matches)
    }

    /// Write a typed setting and verify it took effect.
    pub fn apply_setting<S: FieldSetting>(&mut self, setting: S) -> Result<bool, SensorError> {
        let mask = S::FIELD.mask();
        let bits = setting.bits();
        self.set_config_field(mask, bits)?;
        self.verify_config_field(mask, bits)
    }

    /// Program a limit register with half-degree granularity.
    ///
    /// The two bytes go out in one transaction, but a concurrent reader of
    /// the same register may still see the old value until it completes.
    pub fn set_limit(
        &mut self,
        which: LimitRegister,
        whole_degrees: u8,
        half: bool,
    ) -> Result<(), SensorError> {
        let bytes = encode_limit(whole_degrees, half);
        self.bus.write_register(which.register(), &bytes)?;
        info!(
            "{} limit set to {}.{}",
            which.label(),
            whole_degrees,
            if half { 5 } else { 0 }
        );
        Ok(())
    }

    pub fn read_limit(&mut self, which: LimitRegister) -> Result<Celsius, SensorError> {
        let mut raw = [0u8; 2];
        self.bus.read_register(which.register(), &mut raw)?;
        Ok(Celsius::from_raw(raw))
    }

    /// Confirm the device now answers at `new_address` and adopt it.
    ///
    /// The device must already have been moved by other means; this only
    /// probes. On failure the previous address stays in effect.
    pub fn reassign_address(&mut self, new_address: u8) -> Result<(), SensorError> {
        if !address::is_valid(new_address) {
            return Err(SensorError::InvalidAddress {
                address: new_address,
            });
        }

        match self.bus.probe(new_address) {
            Ok(()) => {
                let previous = self.address();
                self.bus.set_address(new_address);
                info!("Sensor address {:#04x} -> {:#04x}", previous, new_address);
                Ok(())
            }
            Err(e) => {
                warn!(
                    "No answer at {:#04x} ({}), keeping {:#04x}",
                    new_address,
                    e,
                    self.address()
                );
                Err(SensorError::AddressNotResponding {
                    address: new_address,
                })
            }
        }
    }

    pub fn release(self) -> I {
        self.bus.release()
    }
}
