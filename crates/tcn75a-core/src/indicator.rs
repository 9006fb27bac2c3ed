//! Alert indicator output.
//!
//! Mirrors the alert latch onto an output pin. The level is written on every
//! refresh, not only on change, so a glitched pin is corrected on the next
//! pass.

use core::convert::Infallible;

use embassy_time::{Duration, Timer};
use embedded_hal::digital::OutputPin;
use log::debug;

use crate::alert::{AlertLatch, LatchState};

pub struct Indicator<P> {
    pin: P,
    shown: Option<LatchState>,
}

impl<P: OutputPin> Indicator<P> {
    pub const fn new(pin: P) -> Self {
        Self { pin, shown: None }
    }

    /// Drive the pin from the current latch state once.
    pub fn refresh(&mut self, latch: &AlertLatch) -> Result<LatchState, P::Error> {
        let state = latch.get();
        match state {
            LatchState::Asserted => self.pin.set_high()?,
            LatchState::Idle => self.pin.set_low()?,
        }

        if self.shown != Some(state) {
            debug!("Alert indicator -> {:?}", state);
            self.shown = Some(state);
        }
        Ok(state)
    }

    /// Blocking refresh loop. `pause` runs between refreshes. Only returns on
    /// a pin error.
    pub fn run(
        mut self,
        latch: &AlertLatch,
        mut pause: impl FnMut(),
    ) -> Result<Infallible, P::Error> {
        loop {
            self.refresh(latch)?;
            pause();
        }
    }

    /// Refresh loop for an async executor, sleeping `interval` between passes.
    pub async fn run_async(
        mut self,
        latch: &AlertLatch,
        interval: Duration,
    ) -> Result<Infallible, P::Error> {
        loop {
            self.refresh(latch)?;
            Timer::after(interval).await;
        }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::{block_on, join::join};
    use embedded_hal_mock::eh1::MockError;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};

    #[test]
    fn test_refresh_follows_latch() {
        let latch = AlertLatch::new();
        let expectations = [
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
            PinTransaction::set(State::High),
            PinTransaction::set(State::Low),
        ];
        let mut indicator = Indicator::new(PinMock::new(&expectations));

        assert_eq!(indicator.refresh(&latch).unwrap(), LatchState::Idle);
        latch.set();
        assert_eq!(indicator.refresh(&latch).unwrap(), LatchState::Asserted);
        // Unchanged state is written again
        assert_eq!(indicator.refresh(&latch).unwrap(), LatchState::Asserted);
        latch.clear();
        assert_eq!(indicator.refresh(&latch).unwrap(), LatchState::Idle);

        indicator.release().done();
    }

    #[test]
    fn test_run_stops_on_pin_error() {
        let latch = AlertLatch::new();
        let expectations = [
            PinTransaction::set(State::Low),
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High)
                .with_error(MockError::Io(std::io::ErrorKind::NotConnected)),
        ];
        let mut pin = PinMock::new(&expectations);
        let indicator = Indicator::new(pin.clone());

        let mut passes = 0;
        let result = indicator.run(&latch, || {
            passes += 1;
            if passes == 2 {
                latch.set();
            }
        });

        assert!(result.is_err());
        assert_eq!(passes, 2);
        pin.done();
    }

    #[test]
    fn test_run_async_follows_latch_between_timer_passes() {
        let latch = AlertLatch::new();
        let expectations = [
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
            PinTransaction::set(State::High)
                .with_error(MockError::Io(std::io::ErrorKind::NotConnected)),
        ];
        let mut pin = PinMock::new(&expectations);
        let indicator = Indicator::new(pin.clone());

        // The setter runs while the first pass sleeps on its timer
        let (result, ()) = block_on(join(
            indicator.run_async(&latch, Duration::from_millis(1)),
            async { latch.set() },
        ));

        assert!(result.is_err());
        assert!(latch.is_asserted());
        pin.done();
    }
}
