//! # Terminal output for progress renderers.
//!
//! A renderer needs three things from its output: the column count (for
//! [`Width::Auto`]), whether ANSI styling is welcome, and a byte sink.
//!
//! - [`StdoutTerminal`]: the process's standard output
//! - [`FileTerminal`]: any file with a fixed column count (logs, tests)

use std::env;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::os::fd::AsFd;

/// Output target of a progress renderer.
pub trait Terminal {
    /// Current number of columns.
    fn columns(&self) -> u16;

    /// Whether colors and weights may be emitted.
    ///
    /// Cursor movement is always emitted; fancy styles fall back to plain
    /// formatting when this returns `false`.
    fn supports_ansi(&self) -> bool;

    /// Byte sink for whole frames.
    fn writer(&mut self) -> &mut dyn Write;
}

/// Line width policy of a progress bar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Width {
    /// Follow the terminal's column count at every tick.
    #[default]
    Auto,
    /// Clip or pad lines to this many columns.
    Fixed(u16),
}

impl Width {
    /// Resolves to a column count against `terminal`.
    pub fn resolve(self, terminal: &dyn Terminal) -> usize {
        match self {
            Width::Auto => usize::from(terminal.columns()),
            Width::Fixed(cols) => usize::from(cols),
        }
    }

    /// Returns `true` for fixed widths, whose lines are padded.
    pub fn pads(self) -> bool {
        matches!(self, Width::Fixed(_))
    }
}

/// Columns assumed when the terminal size cannot be queried.
pub const FALLBACK_COLUMNS: u16 = 80;

/// Standard output.
///
/// Writes go to a duplicate of fd 1, not through the process-wide `Stdout`
/// handle and its lock.
#[derive(Debug)]
pub struct StdoutTerminal {
    out: File,
    ansi: bool,
}

impl StdoutTerminal {
    /// Duplicates the standard output descriptor.
    pub fn new() -> io::Result<Self> {
        let stdout = io::stdout();
        let ansi = stdout.is_terminal() && env::var("TERM").map_or(true, |t| t != "dumb");
        let fd = stdout.as_fd().try_clone_to_owned()?;
        Ok(Self {
            out: File::from(fd),
            ansi,
        })
    }
}

impl Terminal for StdoutTerminal {
    fn columns(&self) -> u16 {
        crossterm::terminal::size().map_or(FALLBACK_COLUMNS, |(cols, _)| cols)
    }

    fn supports_ansi(&self) -> bool {
        self.ansi
    }

    fn writer(&mut self) -> &mut dyn Write {
        &mut self.out
    }
}

/// File output with a fixed column count.
///
/// Styling is off unless enabled with [`with_ansi`](Self::with_ansi).
#[derive(Debug)]
pub struct FileTerminal {
    file: File,
    columns: u16,
    ansi: bool,
}

impl FileTerminal {
    /// Wraps `file`, reporting `columns` columns.
    pub fn new(file: File, columns: u16) -> Self {
        Self {
            file,
            columns,
            ansi: false,
        }
    }

    /// Returns the terminal with styling switched on or off.
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

impl Terminal for FileTerminal {
    fn columns(&self) -> u16 {
        self.columns
    }

    fn supports_ansi(&self) -> bool {
        self.ansi
    }

    fn writer(&mut self) -> &mut dyn Write {
        &mut self.file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_resolution() {
        let term = FileTerminal::new(tempfile::tempfile().unwrap(), 42);
        assert_eq!(Width::Auto.resolve(&term), 42);
        assert_eq!(Width::Fixed(7).resolve(&term), 7);
        assert!(Width::Fixed(7).pads());
        assert!(!Width::default().pads());
        assert!(!term.supports_ansi());
        assert!(term.with_ansi(true).supports_ansi());
    }
}
