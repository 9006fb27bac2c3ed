//! Shared alert latch.
//!
//! The latch records whether the sensor's alert is considered asserted, plus
//! a two-valued phase counter that tracks where the alert line is in its
//! assert/de-assert alternation. Both values live in one critical-section
//! protected cell so readers on other execution contexts always see them
//! change together.
//!
//! The phase counter assumes strict alternation: if an alert edge is lost the
//! latch stays inverted relative to the hardware until [`AlertLatch::resync`]
//! is called with a sampled line level.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchState {
    Idle,
    Asserted,
}

impl LatchState {
    pub const fn is_asserted(self) -> bool {
        matches!(self, Self::Asserted)
    }
}

/// Position in the assert/de-assert alternation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPhase {
    /// Next alert edge is expected to assert
    Zero,
    /// Next alert edge is expected to de-assert
    One,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatchSnapshot {
    pub state: LatchState,
    pub phase: AlertPhase,
}

impl LatchSnapshot {
    const IDLE: Self = Self {
        state: LatchState::Idle,
        phase: AlertPhase::Zero,
    };
}

pub struct AlertLatch {
    inner: Mutex<CriticalSectionRawMutex, Cell<LatchSnapshot>>,
}

impl AlertLatch {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(LatchSnapshot::IDLE)),
        }
    }

    pub fn get(&self) -> LatchState {
        self.snapshot().state
    }

    pub fn is_asserted(&self) -> bool {
        self.get().is_asserted()
    }

    pub fn snapshot(&self) -> LatchSnapshot {
        self.inner.lock(|cell| cell.get())
    }

    /// Assert the latch without touching the phase counter.
    pub fn set(&self) {
        self.update(|s| LatchSnapshot {
            state: LatchState::Asserted,
            ..s
        });
    }

    /// Manual clear: force `Idle` without touching the phase counter.
    pub fn clear(&self) {
        self.update(|s| LatchSnapshot {
            state: LatchState::Idle,
            ..s
        });
    }

    /// Apply one alert-line edge and return the resulting state.
    ///
    /// The phase picks the transition. At zero the latch asserts and the
    /// phase moves to one. At one the latch goes idle and the phase rewinds,
    /// which also absorbs the de-assert edge that follows a manual clear.
    /// `Asserted` with the phase at zero can only follow an external `set`,
    /// and is left alone.
    pub(crate) fn on_alert_edge(&self) -> LatchSnapshot {
        self.update(|s| match (s.state, s.phase) {
            (LatchState::Idle, AlertPhase::Zero) => LatchSnapshot {
                state: LatchState::Asserted,
                phase: AlertPhase::One,
            },
            (_, AlertPhase::One) => LatchSnapshot::IDLE,
            (LatchState::Asserted, AlertPhase::Zero) => s,
        })
    }

    /// Re-align state and phase with a sampled alert line level.
    pub fn resync(&self, line_asserted: bool) {
        let snapshot = if line_asserted {
            LatchSnapshot {
                state: LatchState::Asserted,
                phase: AlertPhase::One,
            }
        } else {
            LatchSnapshot::IDLE
        };
        self.inner.lock(|cell| cell.set(snapshot));
    }

    fn update(&self, f: impl FnOnce(LatchSnapshot) -> LatchSnapshot) -> LatchSnapshot {
        self.inner.lock(|cell| {
            let next = f(cell.get());
            cell.set(next);
            next
        })
    }
}

impl Default for AlertLatch {
    fn default() -> Self {
        Self::new()
    }
}
