//! Hardware-independent core for the TCN75A temperature sensor console.
//!
//! This crate holds the register protocol and the sensor facade, plus the
//! alert latch, edge handling and the menu shell logic. Everything runs over
//! blocking `embedded-hal` 1.0 traits, so the same code drives real boards
//! and the desktop simulator.
//!
//! It is `#![no_std]` without `alloc`. Tests run on the host with std.

#![cfg_attr(not(test), no_std)]

pub mod address;
pub mod alert;
pub mod config;
pub mod edges;
pub mod error;
pub mod indicator;
pub mod limit_input;
pub mod registers;
pub mod sensor;
pub mod shell;
pub mod transport;

pub use alert::{AlertLatch, LatchState};
pub use edges::{EdgeEvent, EdgeHandler, EdgeOutcome, EdgeSource, MenuDispatch};
pub use error::{SensorError, TransportError};
pub use indicator::Indicator;
pub use registers::{Celsius, ConfigRegister, LimitRegister, Register};
pub use sensor::Tcn75a;
pub use shell::{Console, Feedback, MenuShell, ReadStatus};
