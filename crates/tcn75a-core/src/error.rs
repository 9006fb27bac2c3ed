//! Error types for bus transactions and sensor operations.
//!
//! None of these are fatal: every operation hands its error back to the
//! caller, and the menu shell turns it into user feedback.

use embedded_hal::i2c::ErrorKind;
use thiserror_no_std::Error;

use crate::registers::Register;

/// Failures of a single addressed register transaction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("Zero-length register request")]
    EmptyRequest,

    #[error("Read of {requested} bytes from {register:?} exceeds its {available} byte width")]
    ShortRead {
        register: Register,
        requested: usize,
        available: usize,
    },

    #[error("Write payload of {len} bytes exceeds the {max} byte register width")]
    PayloadTooLong { len: usize, max: usize },

    #[error("No device acknowledged the transaction")]
    BusNack,

    #[error("I2C bus error: {0:?}")]
    Bus(ErrorKind),
}

impl TransportError {
    /// Map a HAL bus error onto the transport taxonomy.
    pub fn from_bus<E: embedded_hal::i2c::Error>(err: &E) -> Self {
        match err.kind() {
            ErrorKind::NoAcknowledge(_) => Self::BusNack,
            kind => Self::Bus(kind),
        }
    }
}

/// Failures of the semantic sensor operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("Transport error: {0}")]
    Transport(TransportError),

    #[error("No device answered at address {address:#04x}")]
    AddressNotResponding { address: u8 },

    #[error("Address {address:#04x} is not a 7-bit bus address")]
    InvalidAddress { address: u8 },
}

impl From<TransportError> for SensorError {
    fn from(err: TransportError) -> Self {
        SensorError::Transport(err)
    }
}
