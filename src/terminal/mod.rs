//! Terminal capability provider.
//!
//! The render loop only talks to a [`Terminal`]; key reading goes through a
//! separate [`KeySource`] so it can block on its own thread. Rows handed to
//! `print_at` are display strings from [`crate::line`]: `{name}` placeholders
//! and doubled braces that the provider expands through its [`StyleSheet`].

mod backend;
mod memory;
mod style;

use std::time::Duration;

use crate::error::Result;
use crate::geometry::Size;

pub use backend::{CrosstermKeys, CrosstermTerminal};
pub use memory::{MemoryKeys, MemoryTerminal};
pub use style::StyleSheet;

/// Output surface owned by the render loop.
pub trait Terminal: Send {
    fn size(&self) -> Result<Size>;
    /// Switch to full screen with the cursor hidden.
    fn enter(&mut self) -> Result<()>;
    /// Undo [`Terminal::enter`].
    fn leave(&mut self) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
    /// Write one display row starting at column `x`, row `y`.
    fn print_at(&mut self, x: u16, y: u16, display: &str) -> Result<()>;
    fn flush(&mut self) -> Result<()>;

    /// Keys that must be read while this terminal owns the input mode.
    ///
    /// A terminal in raw mode swallows Ctrl-C as a plain byte, so the runner
    /// reads from this source when it was given no other, turning Ctrl-C
    /// into [`Key::Interrupt`]. Called at most once, on start.
    fn raw_keys(&mut self) -> Option<Box<dyn KeySource>> {
        None
    }
}

impl Terminal for Box<dyn Terminal> {
    fn size(&self) -> Result<Size> {
        (**self).size()
    }

    fn enter(&mut self) -> Result<()> {
        (**self).enter()
    }

    fn leave(&mut self) -> Result<()> {
        (**self).leave()
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }

    fn print_at(&mut self, x: u16, y: u16, display: &str) -> Result<()> {
        (**self).print_at(x, y, display)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn raw_keys(&mut self) -> Option<Box<dyn KeySource>> {
        (**self).raw_keys()
    }
}

/// Blocking key input with a bounded wait.
pub trait KeySource: Send {
    /// `Ok(None)` when nothing arrived within `timeout`.
    fn read_key(&mut self, timeout: Duration) -> Result<Option<Key>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Delete,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    /// A control chord other than Ctrl-C, e.g. `Control('d')`.
    Control(char),
    /// The surface changed size.
    Resize(Size),
    /// Ctrl-C while raw mode swallows the signal.
    Interrupt,
}
