//! Simulated board LEDs.

use std::convert::Infallible;
use std::thread;
use std::time::Duration;

use embedded_hal::digital::{ErrorType, OutputPin};
use log::{debug, info};

use tcn75a_core::Feedback;
use tcn75a_core::config::{STATUS_GREEN_LED_PIN, STATUS_RED_LED_PIN};

/// Length of each half of a status pulse.
const PULSE_HALF_PERIOD: Duration = Duration::from_millis(100);

/// Output pin that logs its level changes.
#[derive(Debug)]
pub struct LogLed {
    name: &'static str,
    gpio: u8,
    lit: bool,
}

impl LogLed {
    pub const fn new(name: &'static str, gpio: u8) -> Self {
        Self {
            name,
            gpio,
            lit: false,
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    fn drive(&mut self, lit: bool) {
        if self.lit != lit {
            let level = if lit { "on" } else { "off" };
            debug!("{} LED (GPIO {}) {}", self.name, self.gpio, level);
        }
        self.lit = lit;
    }
}

impl ErrorType for LogLed {
    type Error = Infallible;
}

impl OutputPin for LogLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

/// Red and green status LEDs pulsed after configuration changes.
#[derive(Debug)]
pub struct StatusLeds {
    green: LogLed,
    red: LogLed,
    half_period: Duration,
}

impl StatusLeds {
    pub fn new() -> Self {
        Self::with_half_period(PULSE_HALF_PERIOD)
    }

    pub fn with_half_period(half_period: Duration) -> Self {
        Self {
            green: LogLed::new("Green", STATUS_GREEN_LED_PIN),
            red: LogLed::new("Red", STATUS_RED_LED_PIN),
            half_period,
        }
    }

    fn pulse(led: &mut LogLed, blinks: u8, half_period: Duration) {
        for _ in 0..blinks {
            led.drive(true);
            thread::sleep(half_period);
            led.drive(false);
            thread::sleep(half_period);
        }
    }
}

impl Default for StatusLeds {
    fn default() -> Self {
        Self::new()
    }
}

impl Feedback for StatusLeds {
    fn success(&mut self, blinks: u8) {
        info!("Green LED x{}", blinks);
        Self::pulse(&mut self.green, blinks, self.half_period);
    }

    fn failure(&mut self, blinks: u8) {
        info!("Red LED x{}", blinks);
        Self::pulse(&mut self.red, blinks, self.half_period);
    }
}
