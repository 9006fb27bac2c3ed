//! Board wiring, timing and protocol constants.
//!
//! Pin numbers are logical GPIO numbers; the platform layer maps them to real
//! peripherals.

use embassy_time::Duration;

/// Minimum spacing between two accepted button edges.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(250);

/// Number of menu buttons wired from `FIRST_BUTTON_PIN` upwards.
pub const BUTTON_COUNT: u8 = 6;

/// Button that also forces the alert indicator off.
pub const MANUAL_CLEAR_BUTTON: u8 = 5;

/// GPIO of button 0; button `n` sits on `FIRST_BUTTON_PIN + n`.
pub const FIRST_BUTTON_PIN: u8 = 2;

/// GPIO wired to the sensor's ALERT output (falling edge).
pub const ALERT_PIN: u8 = 0;

/// GPIO driving the alert indicator LED.
pub const ALERT_LED_PIN: u8 = 17;

pub const STATUS_GREEN_LED_PIN: u8 = 16;
pub const STATUS_RED_LED_PIN: u8 = 17;

/// I2C fast mode.
pub const I2C_FREQUENCY_HZ: u32 = 400_000;

/// Address used until a reassignment is confirmed (A2..A0 tied low).
pub const DEFAULT_ADDRESS: u8 = 0x48;

/// Addresses selectable from the device address menu, indexed by menu digit.
pub const ADDRESS_CHOICES: [u8; 8] = [0x48, 0x49, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F];

/// Menu digits that can wait for the foreground loop.
pub const MENU_QUEUE_CAPACITY: usize = 8;

/// Sleep between indicator refreshes.
pub const INDICATOR_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Longest limit entry line kept, in characters.
pub const LIMIT_LINE_CAPACITY: usize = 16;

/// Status LED pulses after a configuration change is verified.
pub const VERIFY_BLINKS: u8 = 3;

/// Status LED pulses after an address reassignment.
pub const ADDRESS_BLINKS: u8 = 4;

/// How the debounce clock is shared between buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceScope {
    /// One clock for all buttons: a press on any button suppresses every
    /// button for the window.
    SharedClock,
    /// Each button keeps its own last-accepted timestamp.
    PerButton,
}

/// Wiring and timing used by the edge handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeConfig {
    pub alert_pin: u8,
    pub first_button_pin: u8,
    pub debounce_window: Duration,
    pub debounce: DebounceScope,
}

impl EdgeConfig {
    pub const fn new() -> Self {
        Self {
            alert_pin: ALERT_PIN,
            first_button_pin: FIRST_BUTTON_PIN,
            debounce_window: DEBOUNCE_WINDOW,
            debounce: DebounceScope::SharedClock,
        }
    }

    pub const fn with_debounce(mut self, debounce: DebounceScope) -> Self {
        self.debounce = debounce;
        self
    }
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self::new()
    }
}
