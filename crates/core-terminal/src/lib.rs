//! Terminal backend abstraction and crossterm implementation (§6).
//!
//! `CrosstermBackend` is the host side of two interfaces: [`TerminalBackend`]
//! (raw-mode lifecycle, title, size, key input) and `core_render::Sink`
//! (the differ's output side). Keeping them separate traits lets tests swap
//! in a `Sink`-only stub without dragging in a real terminal.

pub mod capabilities;
pub mod key;

pub use capabilities::TerminalCapabilities;
pub use key::{ExtendedKey, KeyMod, canonicalize_ascii, from_crossterm};

use std::io::{Write, stdout};
use std::time::Duration;

use anyhow::Result;
use core_render::Sink;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event};
use crossterm::style::{Attribute, SetAttribute};
use crossterm::terminal::{
    Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
};
use crossterm::{execute, queue};

pub trait TerminalBackend {
    fn enter(&mut self) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
    fn set_title(&mut self, title: &str) -> Result<()>;
    fn size(&self) -> Result<(u16, u16)>;
    fn bell(&mut self) -> Result<()>;
    /// Blocks until a key is available, decoding it to an `ExtendedKey`.
    /// Returns `Ok(None)` for an event this backend has no encoding for
    /// (e.g. a resize or a bare modifier press), so the caller can poll
    /// again rather than treating it as an error.
    fn read_key(&mut self) -> Result<Option<ExtendedKey>>;
    /// Non-blocking count of keys waiting to be read.
    fn keys_pending(&self) -> Result<usize>;
}

pub struct CrosstermBackend {
    entered: bool,
}

/// RAII guard ensuring terminal state restoration even if caller early-returns or panics.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
    active: bool,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { entered: false }
    }

    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.enter()?;
        Ok(TerminalGuard { backend: self, active: true })
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide)?;
            self.entered = true;
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.entered {
            execute!(stdout(), LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.entered = false;
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        execute!(stdout(), SetTitle(title))?;
        Ok(())
    }

    fn size(&self) -> Result<(u16, u16)> {
        let (cols, rows) = crossterm::terminal::size()?;
        Ok((cols, rows))
    }

    fn bell(&mut self) -> Result<()> {
        stdout().write_all(b"\x07")?;
        stdout().flush()?;
        Ok(())
    }

    fn read_key(&mut self) -> Result<Option<ExtendedKey>> {
        loop {
            match event::read()? {
                Event::Key(key_event) => return Ok(from_crossterm(&key_event)),
                _ => return Ok(None),
            }
        }
    }

    fn keys_pending(&self) -> Result<usize> {
        Ok(if event::poll(Duration::from_millis(0))? { 1 } else { 0 })
    }
}

impl Sink for CrosstermBackend {
    fn move_cursor(&mut self, row: u16, col: u16) {
        let _ = queue!(stdout(), MoveTo(col, row));
    }

    fn write(&mut self, bytes: &[u8]) {
        let _ = stdout().write_all(bytes);
    }

    fn erase_to_eol(&mut self) {
        let _ = queue!(stdout(), Clear(ClearType::UntilNewLine));
    }

    fn set_reverse(&mut self, on: bool) {
        let attr = if on { Attribute::Reverse } else { Attribute::NoReverse };
        let _ = queue!(stdout(), SetAttribute(attr));
    }

    fn clear_screen(&mut self) {
        let _ = queue!(stdout(), Clear(ClearType::All));
    }

    fn flush(&mut self) {
        let _ = stdout().flush();
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.backend.leave();
        }
    }
}
