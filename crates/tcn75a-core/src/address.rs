//! The sensor's current bus address.
//!
//! The device can be re-strapped at runtime, so the address is a shared cell
//! rather than a constant. Readers take one snapshot per transaction; the only
//! writer is the reassignment path in the sensor facade, which stores a new
//! value after the device has answered there.

use core::sync::atomic::{AtomicU8, Ordering};

/// Largest 7-bit address.
pub const MAX_ADDRESS: u8 = 0x7F;

/// Addresses reserved on every I2C bus (`0000xxx` and `1111xxx`).
pub const fn is_reserved(address: u8) -> bool {
    (address & 0x78) == 0 || (address & 0x78) == 0x78
}

pub const fn is_valid(address: u8) -> bool {
    address <= MAX_ADDRESS
}

/// Single-writer, multi-reader address cell.
#[derive(Debug)]
pub struct SensorAddress {
    current: AtomicU8,
}

impl SensorAddress {
    pub const fn new(address: u8) -> Self {
        Self {
            current: AtomicU8::new(address),
        }
    }

    /// Snapshot of the address in effect.
    #[inline]
    pub fn get(&self) -> u8 {
        self.current.load(Ordering::Acquire)
    }

    /// Replace the address in one store. Callers must have verified that the
    /// device answers at `address`.
    #[inline]
    pub(crate) fn replace(&self, address: u8) {
        self.current.store(address, Ordering::Release);
    }
}
