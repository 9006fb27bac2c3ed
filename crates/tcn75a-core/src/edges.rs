//! Alert and button edge handling.
//!
//! Edge notifications arrive from whatever context the platform delivers
//! them on (a GPIO interrupt, a polling task, a reader thread). The handler
//! does only non-blocking work there:
//!
//! - alert-line edges step the [`AlertLatch`];
//! - button edges pass a debounce check, button 5 clears the latch, and the
//!   button's menu digit is queued.
//!
//! The foreground loop drains queued digits into the same entry point that
//! handles typed menu choices ([`MenuDispatch`]), so any blocking console
//! reads a menu performs happen there and never in the notifying context.
//!
//! By default one debounce clock is shared by all buttons: a press on one
//! button suppresses presses on every button for the debounce window.

use core::cell::Cell;

use critical_section::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_time::Instant;
use log::{debug, info, warn};

use crate::alert::{AlertLatch, LatchState};
use crate::config::{
    BUTTON_COUNT, DebounceScope, EdgeConfig, MANUAL_CLEAR_BUTTON, MENU_QUEUE_CAPACITY,
};

/// Zero-based index of a menu button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonId(u8);

impl ButtonId {
    pub const fn new(index: u8) -> Option<Self> {
        if index < BUTTON_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    /// Menu digit this button stands for.
    pub const fn digit(self) -> char {
        (b'0' + self.0) as char
    }

    pub const fn is_manual_clear(self) -> bool {
        self.0 == MANUAL_CLEAR_BUTTON
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSource {
    AlertLine,
    Button(ButtonId),
}

impl EdgeSource {
    /// Classify a GPIO number. Lines that are neither the alert pin nor one
    /// of the button pins yield `None`.
    pub fn from_pin(pin: u8, config: &EdgeConfig) -> Option<Self> {
        if pin == config.alert_pin {
            return Some(Self::AlertLine);
        }
        pin.checked_sub(config.first_button_pin)
            .and_then(ButtonId::new)
            .map(Self::Button)
    }
}

/// A timestamped edge notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    pub source: EdgeSource,
    pub at: Instant,
}

impl EdgeEvent {
    pub const fn new(source: EdgeSource, at: Instant) -> Self {
        Self { source, at }
    }

    pub const fn alert(at: Instant) -> Self {
        Self::new(EdgeSource::AlertLine, at)
    }

    pub fn button(index: u8, at: Instant) -> Option<Self> {
        ButtonId::new(index).map(|id| Self::new(EdgeSource::Button(id), at))
    }
}

/// What an edge did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// Alert edge applied; carries the latch state after it.
    Alert(LatchState),
    /// Button accepted and its digit queued.
    Dispatched(char),
    /// Button edge inside the debounce window, dropped.
    Debounced,
    /// Button accepted but the menu queue was full, digit dropped.
    QueueFull(char),
    /// Edge on a line that is not wired to anything.
    Ignored,
}

/// Entry point for menu choices, shared by typed keys and button presses.
pub trait MenuDispatch {
    fn dispatch_menu_digit(&mut self, digit: char);
}

/// Timestamps of the last accepted button edge.
#[derive(Debug, Clone, Copy)]
struct DebounceClock {
    shared: Option<Instant>,
    per_button: [Option<Instant>; BUTTON_COUNT as usize],
}

impl DebounceClock {
    const fn new() -> Self {
        Self {
            shared: None,
            per_button: [None; BUTTON_COUNT as usize],
        }
    }

    fn slot(&mut self, scope: DebounceScope, id: ButtonId) -> &mut Option<Instant> {
        match scope {
            DebounceScope::SharedClock => &mut self.shared,
            DebounceScope::PerButton => &mut self.per_button[usize::from(id.index())],
        }
    }
}

/// Alert/debounce state machine.
///
/// All methods take `&self`, so one handler can sit in a `static` and be
/// fed from interrupt handlers while the foreground loop drains it.
pub struct EdgeHandler {
    config: EdgeConfig,
    latch: AlertLatch,
    clock: Mutex<Cell<DebounceClock>>,
    digits: Channel<CriticalSectionRawMutex, char, MENU_QUEUE_CAPACITY>,
}

impl EdgeHandler {
    pub const fn new(config: EdgeConfig) -> Self {
        Self {
            config,
            latch: AlertLatch::new(),
            clock: Mutex::new(Cell::new(DebounceClock::new())),
            digits: Channel::new(),
        }
    }

    pub const fn config(&self) -> &EdgeConfig {
        &self.config
    }

    pub const fn latch(&self) -> &AlertLatch {
        &self.latch
    }

    /// Handle an edge on a raw GPIO number.
    pub fn on_pin_edge(&self, pin: u8, at: Instant) -> EdgeOutcome {
        match EdgeSource::from_pin(pin, &self.config) {
            Some(source) => self.on_edge(EdgeEvent::new(source, at)),
            None => {
                debug!("Edge on unused GPIO {} ignored", pin);
                EdgeOutcome::Ignored
            }
        }
    }

    /// Handle one edge notification. Never blocks.
    pub fn on_edge(&self, event: EdgeEvent) -> EdgeOutcome {
        match event.source {
            EdgeSource::AlertLine => {
                let snapshot = self.latch.on_alert_edge();
                info!("Alert edge -> {:?} (phase {:?})", snapshot.state, snapshot.phase);
                EdgeOutcome::Alert(snapshot.state)
            }
            EdgeSource::Button(id) => self.on_button(id, event.at),
        }
    }

    fn on_button(&self, id: ButtonId, at: Instant) -> EdgeOutcome {
        if !self.accept(id, at) {
            debug!("Button {} debounced", id.index());
            return EdgeOutcome::Debounced;
        }

        if id.is_manual_clear() {
            self.latch.clear();
            info!("Button {} cleared the alert latch", id.index());
        }

        let digit = id.digit();
        match self.digits.try_send(digit) {
            Ok(()) => {
                debug!("Button {} queued menu digit '{}'", id.index(), digit);
                EdgeOutcome::Dispatched(digit)
            }
            Err(TrySendError::Full(dropped)) => {
                warn!("Menu queue full, dropping digit '{}'", dropped);
                EdgeOutcome::QueueFull(dropped)
            }
        }
    }

    /// Debounce check. Records `at` as the new reference when accepted.
    fn accept(&self, id: ButtonId, at: Instant) -> bool {
        let scope = self.config.debounce;
        let window = self.config.debounce_window;

        critical_section::with(|cs| {
            let cell = self.clock.borrow(cs);
            let mut clock = cell.get();
            let slot = clock.slot(scope, id);

            let accepted = match *slot {
                None => true,
                // An edge stamped before the reference counts as inside the window
                Some(last) => at
                    .checked_duration_since(last)
                    .is_some_and(|elapsed| elapsed >= window),
            };

            if accepted {
                *slot = Some(at);
                cell.set(clock);
            }
            accepted
        })
    }

    /// Next queued menu digit, if any.
    pub fn next_menu_digit(&self) -> Option<char> {
        self.digits.try_receive().ok()
    }

    /// Feed every queued digit to `target`, returning how many were handled.
    pub fn drain_into<D: MenuDispatch>(&self, target: &mut D) -> usize {
        let mut handled = 0;
        while let Some(digit) = self.next_menu_digit() {
            target.dispatch_menu_digit(digit);
            handled += 1;
        }
        handled
    }

    pub fn pending_digits(&self) -> usize {
        self.digits.len()
    }
}

impl Default for EdgeHandler {
    fn default() -> Self {
        Self::new(EdgeConfig::new())
    }
}
