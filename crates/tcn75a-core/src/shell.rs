//! Interactive menu over a character console.
//!
//! Menus are single-character choices. Typed characters and queued button
//! digits reach the same main-menu handler; submenus read their follow-up
//! choice from the console and block while doing so.

use core::fmt::Write;

use embedded_hal::i2c::I2c;
use log::{debug, info, warn};

use crate::address;
use crate::config::{ADDRESS_BLINKS, ADDRESS_CHOICES, VERIFY_BLINKS};
use crate::edges::{EdgeHandler, MenuDispatch};
use crate::limit_input::{LimitEntry, LimitParser, is_line_end};
use crate::registers::{
    AlertMode, AlertPolarity, FaultQueue, FieldSetting, LimitRegister, OneShot, Resolution,
    ShutdownMode,
};
use crate::sensor::Tcn75a;

/// Result of a timed console read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    Char(char),
    /// Nothing arrived within the poll interval.
    Idle,
    /// Input is gone for good.
    Closed,
}

/// Character console the shell talks to.
pub trait Console: Write {
    /// Wait for the next character. `None` once input is closed.
    fn read_char(&mut self) -> Option<char>;

    /// Wait a short, platform-defined time for a character.
    fn poll_char(&mut self) -> ReadStatus;
}

/// Status-LED pulses signalling the outcome of a change.
pub trait Feedback {
    fn success(&mut self, blinks: u8);
    fn failure(&mut self, blinks: u8);
}

/// Feedback sink for boards without status LEDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn success(&mut self, _blinks: u8) {}
    fn failure(&mut self, _blinks: u8) {}
}

// Console write failures have nowhere to be reported
macro_rules! say {
    ($shell:expr, $($arg:tt)*) => {{
        let _ = writeln!($shell.console, $($arg)*);
    }};
}

const fn is_return(c: char) -> bool {
    matches!(c, 'x' | 'X')
}

pub struct MenuShell<'a, I, C, F> {
    sensor: Tcn75a<I>,
    console: C,
    feedback: F,
    edges: &'a EdgeHandler,
}

impl<'a, I, C, F> MenuShell<'a, I, C, F>
where
    I: I2c,
    C: Console,
    F: Feedback,
{
    pub fn new(sensor: Tcn75a<I>, console: C, feedback: F, edges: &'a EdgeHandler) -> Self {
        Self {
            sensor,
            console,
            feedback,
            edges,
        }
    }

    pub fn sensor(&mut self) -> &mut Tcn75a<I> {
        &mut self.sensor
    }

    pub fn console(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn into_parts(self) -> (Tcn75a<I>, C, F) {
        (self.sensor, self.console, self.feedback)
    }

    /// Foreground loop. Handles queued button digits between console polls
    /// and returns once the console closes.
    pub fn run(&mut self) {
        self.show_main_menu();
        let edges = self.edges;

        loop {
            let drained = edges.drain_into(self);
            if drained > 0 {
                debug!("Handled {} button digit(s)", drained);
            }

            match self.console.poll_char() {
                ReadStatus::Char(c) if c.is_whitespace() => {}
                ReadStatus::Char(c) => self.handle_main(c),
                ReadStatus::Idle => {}
                ReadStatus::Closed => {
                    info!("Console closed, leaving menu loop");
                    return;
                }
            }
        }
    }

    pub fn show_main_menu(&mut self) {
        say!(self, "        |       MAIN MENU      |");
        say!(self, "    [0] |    Scan addresses    |");
        say!(self, "    [1] |      CONFIG Menu     |");
        say!(self, "    [2] |       Device ID      |");
        say!(self, "    [3] |      Alert Menu      |");
        say!(self, "    [4] |       Temp Menu      |");
        say!(self, "    [5] |     Alert Status     |");
        say!(self, "Enter your choice: ");
    }

    /// Main-menu entry point for a typed choice or a button digit.
    pub fn handle_main(&mut self, choice: char) {
        match choice {
            '0' => {
                self.bus_scan();
            }
            '1' => self.config_menu(),
            '2' => self.address_menu(),
            '3' => self.limits_menu(),
            '4' => self.temperature_readout(),
            '5' => self.alert_status(),
            c if is_return(c) => self.show_main_menu(),
            _ => say!(self, "Invalid choice. Please try again."),
        }
    }

    /// Next non-whitespace character, or `None` if the console closed.
    fn read_choice(&mut self) -> Option<char> {
        loop {
            match self.console.read_char() {
                Some(c) if c.is_whitespace() => continue,
                other => return other,
            }
        }
    }

    /// Probe every non-reserved address and list the ones that answer.
    pub fn bus_scan(&mut self) -> usize {
        say!(self, "Scanning I2C bus...");
        let mut found = 0;
        for addr in 0..=address::MAX_ADDRESS {
            if address::is_reserved(addr) {
                continue;
            }
            if self.sensor.bus().probe(addr).is_ok() {
                say!(self, "Device found at {:#04x}", addr);
                found += 1;
            }
        }
        if found == 0 {
            say!(self, "No devices found");
        }
        info!("Bus scan found {} device(s)", found);
        found
    }

    fn config_menu(&mut self) {
        say!(self, "[0] SHUTDOWN Setting");
        say!(self, "[1] Comparator/Interrupt Select");
        say!(self, "[2] ALERT POLARITY");
        say!(self, "[3] FAULT QUEUE");
        say!(self, "[4] ADC RES");
        say!(self, "[5] ONE-SHOT");
        say!(self, "[x] Return to Main Menu");
        say!(self, "Enter your choice: ");

        match self.read_choice() {
            Some('0') => self.setting_menu::<ShutdownMode>(),
            Some('1') => self.setting_menu::<AlertMode>(),
            Some('2') => self.setting_menu::<AlertPolarity>(),
            Some('3') => self.setting_menu::<FaultQueue>(),
            Some('4') => self.setting_menu::<Resolution>(),
            Some('5') => self.setting_menu::<OneShot>(),
            Some(c) if is_return(c) => self.show_main_menu(),
            Some(_) => say!(self, "Invalid choice. Please try again."),
            None => {}
        }
    }

    fn setting_menu<S: FieldSetting>(&mut self) {
        say!(self, "{} Setting", S::FIELD.label());
        for choice in '0'..='9' {
            let Some(setting) = S::from_choice(choice) else {
                break;
            };
            say!(self, "[{}] {}", choice, setting.describe());
        }
        say!(self, "[x] Return to Main Menu");
        say!(self, "Enter your choice: ");

        let Some(choice) = self.read_choice() else {
            return;
        };
        if is_return(choice) {
            self.show_main_menu();
            return;
        }
        match S::from_choice(choice) {
            Some(setting) => self.apply(setting),
            None => say!(self, "Invalid choice. Please try again."),
        }
    }

    fn apply<S: FieldSetting>(&mut self, setting: S) {
        match self.sensor.apply_setting(setting) {
            Ok(true) => {
                say!(self, "{}: verified", setting.describe());
                self.feedback.success(VERIFY_BLINKS);
            }
            Ok(false) => {
                say!(self, "{}: not applied", setting.describe());
                self.feedback.failure(VERIFY_BLINKS);
            }
            Err(e) => {
                say!(self, "Configuration failed: {}", e);
                self.feedback.failure(VERIFY_BLINKS);
            }
        }
    }

    fn address_menu(&mut self) {
        say!(self, "Change Device ID");
        for (digit, addr) in ('0'..='7').zip(ADDRESS_CHOICES) {
            say!(self, "[{}] {:#04X}", digit, addr);
        }
        say!(self, "[x] Return to Main Menu");
        say!(self, "Enter your choice: ");

        let choice = match self.read_choice() {
            Some(c) if is_return(c) => {
                self.show_main_menu();
                return;
            }
            Some(c) => c,
            None => return,
        };

        let Some(new_address) = choice
            .to_digit(10)
            .and_then(|d| ADDRESS_CHOICES.get(d as usize).copied())
        else {
            say!(self, "Invalid choice. Please try again.");
            return;
        };

        match self.sensor.reassign_address(new_address) {
            Ok(()) => {
                say!(self, "Device ID changed to {:#04X}", new_address);
                self.feedback.success(ADDRESS_BLINKS);
            }
            Err(e) => {
                say!(self, "{}", e);
                say!(self, "Still using {:#04X}", self.sensor.address());
                self.feedback.failure(ADDRESS_BLINKS);
            }
        }
    }

    fn limits_menu(&mut self) {
        say!(self, "[1] Set MAX Limit");
        say!(self, "[2] Set MIN Limit");
        say!(self, "[3] Show MAX Limit");
        say!(self, "[4] Show MIN Limit");
        say!(self, "[x] Return to Main Menu");
        say!(self, "Enter your choice: ");

        match self.read_choice() {
            Some('1') => self.enter_limit(LimitRegister::Set),
            Some('2') => self.enter_limit(LimitRegister::Hysteresis),
            Some('3') => self.show_limit(LimitRegister::Set),
            Some('4') => self.show_limit(LimitRegister::Hysteresis),
            Some(c) if is_return(c) => self.show_main_menu(),
            Some(_) => say!(self, "Invalid choice. Please try again."),
            None => {}
        }
    }

    /// Read one line of limit text. Line ends left over from the menu
    /// choice are skipped.
    fn read_limit_line(&mut self) -> Option<LimitEntry> {
        let mut parser = LimitParser::new();
        let mut started = false;

        loop {
            let c = self.console.read_char()?;
            if is_line_end(c) {
                if started {
                    break;
                }
                continue;
            }
            started = true;
            if !parser.push(c) {
                say!(self, "Invalid input! Please try again");
            }
        }
        Some(parser.finish())
    }

    fn enter_limit(&mut self, which: LimitRegister) {
        say!(
            self,
            "Enter a {} Temp limit of up to 1 decimal place",
            which.label()
        );
        let Some(entry) = self.read_limit_line() else {
            return;
        };
        if entry.has_invalid() {
            warn!("{} invalid character(s) in limit entry", entry.invalid);
        }

        say!(self, "Limit set to: {}", entry.text);
        if let Err(e) = self
            .sensor
            .set_limit(which, entry.whole_degrees, entry.half)
        {
            say!(self, "Writing {} limit failed: {}", which.label(), e);
        }
    }

    fn show_limit(&mut self, which: LimitRegister) {
        match self.sensor.read_limit(which) {
            Ok(limit) => say!(self, "{} limit: {:.1} C", which.label(), limit.degrees()),
            Err(e) => say!(self, "Reading {} limit failed: {}", which.label(), e),
        }
    }

    fn temperature_readout(&mut self) {
        say!(self, "REAL TIME TEMPERATURE");
        say!(self, "   Temp C    |    Temp F   ");
        say!(self, "-------------+-------------");
        match self.sensor.read_temperature() {
            Ok(t) => say!(self, "   {:.4}   |    {:.4}    ", t.degrees(), t.fahrenheit()),
            Err(e) => say!(self, "Temperature read failed: {}", e),
        }
    }

    fn alert_status(&mut self) {
        let asserted = self.edges.latch().is_asserted();
        say!(
            self,
            "Alert indicator: {}",
            if asserted { "ON" } else { "OFF" }
        );
    }
}

impl<I, C, F> MenuDispatch for MenuShell<'_, I, C, F>
where
    I: I2c,
    C: Console,
    F: Feedback,
{
    fn dispatch_menu_digit(&mut self, digit: char) {
        debug!("Button digit '{}'", digit);
        self.handle_main(digit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use core::fmt;
    use std::collections::VecDeque;

    use embassy_time::Instant;
    use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    use crate::edges::EdgeEvent;

    const NACK: ErrorKind = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);

    #[derive(Default)]
    struct Script {
        input: VecDeque<char>,
        output: String,
    }

    impl Script {
        fn new(input: &str) -> Self {
            Self {
                input: input.chars().collect(),
                output: String::new(),
            }
        }
    }

    impl Write for Script {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.output.push_str(s);
            Ok(())
        }
    }

    impl Console for Script {
        fn read_char(&mut self) -> Option<char> {
            self.input.pop_front()
        }

        fn poll_char(&mut self) -> ReadStatus {
            match self.input.pop_front() {
                Some(c) => ReadStatus::Char(c),
                None => ReadStatus::Closed,
            }
        }
    }

    #[derive(Default)]
    struct Blinks {
        events: Vec<(bool, u8)>,
    }

    impl Feedback for Blinks {
        fn success(&mut self, blinks: u8) {
            self.events.push((true, blinks));
        }

        fn failure(&mut self, blinks: u8) {
            self.events.push((false, blinks));
        }
    }

    fn shell<'a>(
        expectations: &[I2cTransaction],
        input: &str,
        edges: &'a EdgeHandler,
    ) -> MenuShell<'a, I2cMock, Script, Blinks> {
        MenuShell::new(
            Tcn75a::new(I2cMock::new(expectations), 0x48),
            Script::new(input),
            Blinks::default(),
            edges,
        )
    }

    fn finish(shell: MenuShell<'_, I2cMock, Script, Blinks>) -> (String, Vec<(bool, u8)>) {
        let (sensor, console, feedback) = shell.into_parts();
        sensor.release().done();
        (console.output, feedback.events)
    }

    #[test]
    fn test_temperature_readout() {
        let edges = EdgeHandler::default();
        let mut shell = shell(
            &[I2cTransaction::write_read(0x48, vec![0x00], vec![25, 0x80])],
            "4\n",
            &edges,
        );
        shell.run();

        let (output, _) = finish(shell);
        assert!(output.contains("25.5000"), "{output}");
        assert!(output.contains("77.9000"), "{output}");
    }

    #[test]
    fn test_invalid_main_choice() {
        let edges = EdgeHandler::default();
        let mut shell = shell(&[], "q", &edges);
        shell.run();
        let (output, _) = finish(shell);
        assert!(output.contains("Invalid choice"));
    }

    #[test]
    fn test_config_setting_verified() {
        let edges = EdgeHandler::default();
        let expectations = [
            I2cTransaction::write_read(0x48, vec![0x01], vec![0b0000_0000]),
            I2cTransaction::write(0x48, vec![0x01, 0b0110_0000]),
            I2cTransaction::write_read(0x48, vec![0x01], vec![0b0110_0000]),
        ];
        // Config menu, ADC resolution, 12 bits
        let mut shell = shell(&expectations, "1\n4\n3\n", &edges);
        shell.run();

        let (output, blinks) = finish(shell);
        assert!(output.contains("Resolution: 12 bits: verified"), "{output}");
        assert_eq!(blinks, [(true, VERIFY_BLINKS)]);
    }

    #[test]
    fn test_config_setting_not_verified() {
        let edges = EdgeHandler::default();
        let expectations = [
            I2cTransaction::write_read(0x48, vec![0x01], vec![0b0000_0000]),
            I2cTransaction::write(0x48, vec![0x01, 0b0000_0001]),
            I2cTransaction::write_read(0x48, vec![0x01], vec![0b0000_0000]),
        ];
        let mut shell = shell(&expectations, "1\n0\n1\n", &edges);
        shell.run();

        let (output, blinks) = finish(shell);
        assert!(output.contains("not applied"), "{output}");
        assert_eq!(blinks, [(false, VERIFY_BLINKS)]);
    }

    #[test]
    fn test_config_bus_failure_is_reported() {
        let edges = EdgeHandler::default();
        let expectations =
            [I2cTransaction::write_read(0x48, vec![0x01], vec![0]).with_error(NACK)];
        let mut shell = shell(&expectations, "1\n1\n1\n", &edges);
        shell.run();

        let (output, blinks) = finish(shell);
        assert!(output.contains("Configuration failed"), "{output}");
        assert_eq!(blinks, [(false, VERIFY_BLINKS)]);
    }

    #[test]
    fn test_address_change_success() {
        let edges = EdgeHandler::default();
        let expectations = [
            I2cTransaction::read(0x4B, vec![0]),
            I2cTransaction::write_read(0x4B, vec![0x00], vec![20, 0]),
        ];
        let mut shell = shell(&expectations, "2\n3\n4\n", &edges);
        shell.run();
        assert_eq!(shell.sensor().address(), 0x4B);

        let (output, blinks) = finish(shell);
        assert!(output.contains("Device ID changed to 0x4B"), "{output}");
        assert_eq!(blinks, [(true, ADDRESS_BLINKS)]);
    }

    #[test]
    fn test_address_change_failure_keeps_old() {
        let edges = EdgeHandler::default();
        let expectations = [I2cTransaction::read(0x4F, vec![0]).with_error(NACK)];
        let mut shell = shell(&expectations, "2\n7\n", &edges);
        shell.run();
        assert_eq!(shell.sensor().address(), 0x48);

        let (output, blinks) = finish(shell);
        assert!(output.contains("Still using 0x48"), "{output}");
        assert_eq!(blinks, [(false, ADDRESS_BLINKS)]);
    }

    #[test]
    fn test_address_choice_out_of_range() {
        let edges = EdgeHandler::default();
        let mut shell = shell(&[], "2\n9\n", &edges);
        shell.run();
        let (output, blinks) = finish(shell);
        assert!(output.contains("Invalid choice"));
        assert!(blinks.is_empty());
    }

    #[test]
    fn test_set_max_limit() {
        let edges = EdgeHandler::default();
        let expectations = [I2cTransaction::write(0x48, vec![0x03, 23, 0x80])];
        let mut shell = shell(&expectations, "3\n1\n23.5\n", &edges);
        shell.run();

        let (output, _) = finish(shell);
        assert!(output.contains("Limit set to: 23.5"), "{output}");
    }

    #[test]
    fn test_set_min_limit_with_invalid_characters() {
        let edges = EdgeHandler::default();
        let expectations = [I2cTransaction::write(0x48, vec![0x02, 21, 0x00])];
        let mut shell = shell(&expectations, "3\n2\n2a1.0\n", &edges);
        shell.run();

        let (output, _) = finish(shell);
        assert_eq!(output.matches("Invalid input! Please try again").count(), 1);
        assert!(output.contains("Limit set to: 2a1.0"), "{output}");
    }

    #[test]
    fn test_show_limits() {
        let edges = EdgeHandler::default();
        let expectations = [
            I2cTransaction::write_read(0x48, vec![0x03], vec![80, 0]),
            I2cTransaction::write_read(0x48, vec![0x02], vec![75, 0x80]),
        ];
        let mut shell = shell(&expectations, "3\n3\n3\n4\n", &edges);
        shell.run();

        let (output, _) = finish(shell);
        assert!(output.contains("MAX limit: 80.0 C"), "{output}");
        assert!(output.contains("MIN limit: 75.5 C"), "{output}");
    }

    #[test]
    fn test_bus_scan_lists_responders() {
        let edges = EdgeHandler::default();
        let expectations: Vec<I2cTransaction> = (0..=address::MAX_ADDRESS)
            .filter(|a| !address::is_reserved(*a))
            .map(|a| {
                let t = I2cTransaction::read(a, vec![0]);
                if a == 0x48 || a == 0x4C { t } else { t.with_error(NACK) }
            })
            .collect();
        let mut shell = shell(&expectations, "", &edges);
        assert_eq!(shell.bus_scan(), 2);

        let (output, _) = finish(shell);
        assert!(output.contains("Device found at 0x48"));
        assert!(output.contains("Device found at 0x4c"));
    }

    #[test]
    fn test_button_digits_reach_main_menu() {
        let edges = EdgeHandler::default();
        edges.on_edge(EdgeEvent::alert(Instant::from_millis(0)));
        edges.on_edge(EdgeEvent::button(5, Instant::from_millis(10)).unwrap());

        let mut shell = shell(&[], "", &edges);
        shell.run();

        let (output, _) = finish(shell);
        // Cleared in the edge handler before the digit was shown
        assert!(output.contains("Alert indicator: OFF"), "{output}");
        assert_eq!(edges.pending_digits(), 0);
    }

    #[test]
    fn test_alert_status_on() {
        let edges = EdgeHandler::default();
        edges.on_edge(EdgeEvent::alert(Instant::from_millis(0)));
        let mut shell = shell(&[], "5", &edges);
        shell.run();
        let (output, _) = finish(shell);
        assert!(output.contains("Alert indicator: ON"));
    }

    #[test]
    fn test_return_redisplays_main_menu() {
        let edges = EdgeHandler::default();
        let mut shell = shell(&[], "x", &edges);
        shell.run();
        let (output, _) = finish(shell);
        assert_eq!(output.matches("MAIN MENU").count(), 2);
    }
}
