//! Text entry for the alert limits.
//!
//! A limit is typed as whole degrees with at most one decimal place. The
//! limit registers can only hold `.0` or `.5`, so a tenths digit of 5 selects
//! the half degree and any other tenths digit is taken as `.0`. Characters
//! other than digits and the decimal point are counted as invalid and
//! skipped; they never abort the entry.

use heapless::String;

use crate::config::LIMIT_LINE_CAPACITY;

/// Parsed limit entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LimitEntry {
    pub whole_degrees: u8,
    pub half: bool,
    /// Characters that were neither digits nor a decimal point.
    pub invalid: u8,
    /// Echo of the accepted line, truncated to `LIMIT_LINE_CAPACITY`.
    pub text: String<LIMIT_LINE_CAPACITY>,
}

impl LimitEntry {
    pub fn has_invalid(&self) -> bool {
        self.invalid > 0
    }
}

/// Incremental parser fed one character at a time.
#[derive(Debug, Default)]
pub struct LimitParser {
    whole: u16,
    tenths: Option<u8>,
    seen_point: bool,
    entry: LimitEntry,
}

impl LimitParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one character. Returns `false` for an invalid character.
    pub fn push(&mut self, c: char) -> bool {
        // Overlong input is still parsed, only the echo is cut short
        let _ = self.entry.text.push(c);

        match c {
            '0'..='9' => {
                let digit = c as u8 - b'0';
                if !self.seen_point {
                    self.whole = (self.whole * 10 + u16::from(digit)).min(u16::from(u8::MAX));
                } else if self.tenths.is_none() {
                    self.tenths = Some(digit);
                }
                true
            }
            '.' => {
                self.seen_point = true;
                true
            }
            _ => {
                self.entry.invalid = self.entry.invalid.saturating_add(1);
                false
            }
        }
    }

    pub fn finish(mut self) -> LimitEntry {
        self.entry.whole_degrees = self.whole as u8;
        self.entry.half = self.tenths == Some(5);
        self.entry
    }
}

/// Parse a complete line.
pub fn parse_limit(line: &str) -> LimitEntry {
    let mut parser = LimitParser::new();
    for c in line.chars() {
        parser.push(c);
    }
    parser.finish()
}

/// Is `c` a line terminator for limit entry?
pub const fn is_line_end(c: char) -> bool {
    matches!(c, '\n' | '\r')
}
