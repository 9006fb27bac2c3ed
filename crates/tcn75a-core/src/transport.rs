//! Addressed register transactions over a blocking I2C bus.
//!
//! Reads send the register pointer and read the payload in one
//! write-then-read transaction. Writes put the pointer in front of the data
//! and send both in a single framed write, because the sensor latches the
//! pointer from the first byte of the same transaction.

use embedded_hal::i2c::I2c;
use log::{debug, error};

use crate::address::SensorAddress;
use crate::error::TransportError;
use crate::registers::Register;

/// Largest register payload (temperature and limit registers).
pub const MAX_PAYLOAD: usize = 2;

/// Owns the bus handle and the sensor's current address.
pub struct RegisterBus<I> {
    i2c: I,
    address: SensorAddress,
}

impl<I: I2c> RegisterBus<I> {
    pub const fn new(i2c: I, address: u8) -> Self {
        Self {
            i2c,
            address: SensorAddress::new(address),
        }
    }

    /// Address every transaction goes to.
    pub fn address(&self) -> &SensorAddress {
        &self.address
    }

    /// Read `buf.len()` bytes from `register` at the current address.
    pub fn read_register(
        &mut self,
        register: Register,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        let address = self.address.get();
        self.read_register_at(address, register, buf)
    }

    pub fn read_register_at(
        &mut self,
        address: u8,
        register: Register,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        if buf.is_empty() {
            return Err(TransportError::EmptyRequest);
        }
        if buf.len() > register.width() {
            return Err(TransportError::ShortRead {
                register,
                requested: buf.len(),
                available: register.width(),
            });
        }

        self.i2c
            .write_read(address, &[register.pointer()], buf)
            .map_err(|e| {
                let err = TransportError::from_bus(&e);
                error!("Read of {:?} at {:#04x} failed: {}", register, address, err);
                err
            })?;

        debug!("Read {:?} at {:#04x}: {:02x?}", register, address, buf);
        Ok(buf.len())
    }

    /// Write `data` to `register` at the current address.
    ///
    /// Returns the number of bytes put on the bus, pointer included.
    pub fn write_register(
        &mut self,
        register: Register,
        data: &[u8],
    ) -> Result<usize, TransportError> {
        let address = self.address.get();
        self.write_register_at(address, register, data)
    }

    pub fn write_register_at(
        &mut self,
        address: u8,
        register: Register,
        data: &[u8],
    ) -> Result<usize, TransportError> {
        if data.is_empty() {
            return Err(TransportError::EmptyRequest);
        }
        if data.len() > MAX_PAYLOAD {
            return Err(TransportError::PayloadTooLong {
                len: data.len(),
                max: MAX_PAYLOAD,
            });
        }

        let mut frame = [0u8; MAX_PAYLOAD + 1];
        frame[0] = register.pointer();
        frame[1..=data.len()].copy_from_slice(data);
        let frame = &frame[..=data.len()];

        self.i2c.write(address, frame).map_err(|e| {
            let err = TransportError::from_bus(&e);
            error!("Write to {:?} at {:#04x} failed: {}", register, address, err);
            err
        })?;

        debug!("Wrote {:?} at {:#04x}: {:02x?}", register, address, data);
        Ok(frame.len())
    }

    /// One-byte dummy read to check whether anything acknowledges `address`.
    pub fn probe(&mut self, address: u8) -> Result<(), TransportError> {
        let mut scratch = [0u8; 1];
        self.i2c
            .read(address, &mut scratch)
            .map_err(|e| TransportError::from_bus(&e))
    }

    pub(crate) fn set_address(&self, address: u8) {
        self.address.replace(address);
    }

    /// Give the bus handle back.
    pub fn release(self) -> I {
        self.i2c
    }
}
