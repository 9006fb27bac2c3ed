//! Stdin/stdout console and the `!` commands that drive simulated hardware.
//!
//! A reader thread owns stdin. Lines starting with `!` are simulator
//! commands and go to the command handler straight from that thread, which
//! plays the part of the GPIO interrupt context. Every other line is handed
//! to the menu as characters followed by `'\n'`.

use std::fmt;
use std::io::{self, BufRead, Write as _};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use thiserror_no_std::Error;

use tcn75a_core::config::{ADDRESS_CHOICES, BUTTON_COUNT};
use tcn75a_core::{Console, ReadStatus};

/// Simulator command typed on the console.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimCommand {
    /// `!b<n>`: press button `n`
    PressButton(u8),
    /// `!a<n>`: re-strap the device to `0x48 + n`
    Restrap(u8),
    /// `!t<deg>`: pin the ambient temperature
    PinAmbient(f32),
    /// `!t`: return to the modelled ambient temperature
    ReleaseAmbient,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command '!{0}'")]
    Unknown(char),

    #[error("Missing command after '!'")]
    Empty,

    #[error("Button must be 0..{max}")]
    BadButton { max: u8 },

    #[error("Address strap must be 0..=7")]
    BadStrap,

    #[error("Temperature is not a number")]
    BadTemperature,
}

impl SimCommand {
    /// Parse a console line. Returns `None` for lines that are not commands.
    pub fn parse(line: &str) -> Option<Result<Self, CommandError>> {
        let body = line.trim().strip_prefix('!')?;
        let mut chars = body.chars();
        let Some(kind) = chars.next() else {
            return Some(Err(CommandError::Empty));
        };
        let arg = chars.as_str().trim();

        let parsed = match kind {
            'b' | 'B' => arg
                .parse::<u8>()
                .ok()
                .filter(|n| *n < BUTTON_COUNT)
                .map(Self::PressButton)
                .ok_or(CommandError::BadButton { max: BUTTON_COUNT }),
            'a' | 'A' => arg
                .parse::<usize>()
                .ok()
                .and_then(|n| ADDRESS_CHOICES.get(n).copied())
                .map(Self::Restrap)
                .ok_or(CommandError::BadStrap),
            't' | 'T' if arg.is_empty() => Ok(Self::ReleaseAmbient),
            't' | 'T' => arg
                .parse::<f32>()
                .ok()
                .filter(|t| t.is_finite())
                .map(Self::PinAmbient)
                .ok_or(CommandError::BadTemperature),
            other => Err(CommandError::Unknown(other)),
        };
        Some(parsed)
    }
}

/// Menu console backed by the stdin reader thread.
pub struct StdinConsole {
    input: Receiver<char>,
    poll: Duration,
}

impl StdinConsole {
    pub fn new(input: Receiver<char>, poll: Duration) -> Self {
        Self { input, poll }
    }
}

impl fmt::Write for StdinConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut out = io::stdout().lock();
        out.write_all(s.as_bytes()).map_err(|_| fmt::Error)?;
        out.flush().map_err(|_| fmt::Error)
    }
}

impl Console for StdinConsole {
    fn read_char(&mut self) -> Option<char> {
        self.input.recv().ok()
    }

    fn poll_char(&mut self) -> ReadStatus {
        match self.input.recv_timeout(self.poll) {
            Ok(c) => ReadStatus::Char(c),
            Err(RecvTimeoutError::Timeout) => ReadStatus::Idle,
            Err(RecvTimeoutError::Disconnected) => ReadStatus::Closed,
        }
    }
}

/// Route one input line: commands to `on_command`, everything else to the
/// menu. Returns `false` once the menu side has gone away.
pub fn route_line(
    line: &str,
    menu: &Sender<char>,
    on_command: &mut impl FnMut(SimCommand),
) -> bool {
    match SimCommand::parse(line) {
        Some(Ok(command)) => {
            debug!("Simulator command {:?}", command);
            on_command(command);
            true
        }
        Some(Err(e)) => {
            warn!("{}", e);
            true
        }
        None => line
            .chars()
            .chain(std::iter::once('\n'))
            .all(|c| menu.send(c).is_ok()),
    }
}

/// Spawn the stdin reader. The returned console reports `Closed` at EOF.
pub fn spawn_stdin(
    poll: Duration,
    mut on_command: impl FnMut(SimCommand) + Send + 'static,
) -> io::Result<StdinConsole> {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("stdin read failed: {}", e);
                        break;
                    }
                };
                if !route_line(&line, &tx, &mut on_command) {
                    break;
                }
            }
            debug!("stdin closed");
        })?;

    Ok(StdinConsole::new(rx, poll))
}
