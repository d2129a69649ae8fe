use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

use crate::error::{BlocksError, Result};
use crate::geometry::Size;
use crate::terminal::{Key, KeySource, StyleSheet, Terminal};

/// Real terminal on stdout: alternate screen, hidden cursor, raw input.
pub struct CrosstermTerminal {
    stdout: Stdout,
    styles: StyleSheet,
    raw_mode: bool,
    entered: bool,
}

impl CrosstermTerminal {
    pub fn new(styles: StyleSheet) -> Self {
        Self {
            stdout: io::stdout(),
            styles,
            raw_mode: true,
            entered: false,
        }
    }

    /// Leave line discipline alone, so Ctrl-C reaches the process as a signal.
    pub fn without_raw_mode(mut self) -> Self {
        self.raw_mode = false;
        self
    }
}

impl Default for CrosstermTerminal {
    fn default() -> Self {
        Self::new(StyleSheet::standard())
    }
}

impl Terminal for CrosstermTerminal {
    fn size(&self) -> Result<Size> {
        let (width, height) = terminal::size()?;
        Ok(Size::new(width, height))
    }

    fn enter(&mut self) -> Result<()> {
        if self.raw_mode {
            terminal::enable_raw_mode().map_err(|err| BlocksError::Terminal(err.to_string()))?;
        }
        execute!(self.stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        self.entered = true;
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if !self.entered {
            return Ok(());
        }
        self.entered = false;
        execute!(self.stdout, Show, LeaveAlternateScreen)?;
        if self.raw_mode {
            terminal::disable_raw_mode().map_err(|err| BlocksError::Terminal(err.to_string()))?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        execute!(self.stdout, Clear(ClearType::All))?;
        Ok(())
    }

    fn print_at(&mut self, x: u16, y: u16, display: &str) -> Result<()> {
        let output = self.styles.expand(display);
        queue!(self.stdout, MoveTo(x, y), Print(output))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.stdout.flush()?;
        Ok(())
    }

    fn raw_keys(&mut self) -> Option<Box<dyn KeySource>> {
        self.raw_mode
            .then(|| Box::new(CrosstermKeys::new()) as Box<dyn KeySource>)
    }
}

impl Drop for CrosstermTerminal {
    fn drop(&mut self) {
        self.leave().ok();
    }
}

/// Keys from crossterm's event queue.
#[derive(Debug, Default)]
pub struct CrosstermKeys;

impl CrosstermKeys {
    pub fn new() -> Self {
        Self
    }
}

impl KeySource for CrosstermKeys {
    fn read_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        Ok(match event::read()? {
            Event::Key(key) => map_key(key),
            Event::Resize(width, height) => Some(Key::Resize(Size::new(width, height))),
            _ => None,
        })
    }
}

fn map_key(key: KeyEvent) -> Option<Key> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    let mapped = match key.code {
        KeyCode::Char('c') if control => Key::Interrupt,
        KeyCode::Char(ch) if control => Key::Control(ch),
        KeyCode::Char(ch) => Key::Char(ch),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Tab => Key::Tab,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        _ => return None,
    };
    Some(mapped)
}
