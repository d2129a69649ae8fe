use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;

use crate::error::{BlocksError, Result};
use crate::geometry::Size;
use crate::terminal::{Key, KeySource, StyleSheet, Terminal};
use crate::width::char_width;

#[derive(Debug)]
struct Screen {
    size: Size,
    cells: Vec<Vec<char>>,
    writes: Vec<(u16, u16, String)>,
    entered: bool,
    clears: usize,
    flushes: usize,
    fail_prints: bool,
    raw_keys: Option<MemoryKeys>,
}

impl Screen {
    fn blank(size: Size) -> Vec<Vec<char>> {
        vec![vec![' '; usize::from(size.width)]; usize::from(size.height)]
    }
}

/// Character grid standing in for a terminal.
///
/// Clones share the same screen, so a test can hand one clone to a runner
/// and inspect or resize through another.
#[derive(Debug, Clone)]
pub struct MemoryTerminal {
    screen: Arc<Mutex<Screen>>,
}

impl MemoryTerminal {
    pub fn new(width: u16, height: u16) -> Self {
        let size = Size::new(width, height);
        Self {
            screen: Arc::new(Mutex::new(Screen {
                size,
                cells: Screen::blank(size),
                writes: Vec::new(),
                entered: false,
                clears: 0,
                flushes: 0,
                fail_prints: false,
                raw_keys: None,
            })),
        }
    }

    /// Change the reported size. Existing content is discarded.
    pub fn resize(&self, width: u16, height: u16) {
        let mut screen = self.screen.lock();
        screen.size = Size::new(width, height);
        screen.cells = Screen::blank(screen.size);
    }

    pub fn rows(&self) -> Vec<String> {
        self.screen
            .lock()
            .cells
            .iter()
            .map(|row| row.iter().collect())
            .collect()
    }

    pub fn row(&self, y: u16) -> Option<String> {
        self.screen
            .lock()
            .cells
            .get(usize::from(y))
            .map(|row| row.iter().collect())
    }

    /// Every `print_at` call as (x, y, display), oldest first.
    pub fn writes(&self) -> Vec<(u16, u16, String)> {
        self.screen.lock().writes.clone()
    }

    pub fn take_writes(&self) -> Vec<(u16, u16, String)> {
        std::mem::take(&mut self.screen.lock().writes)
    }

    pub fn is_entered(&self) -> bool {
        self.screen.lock().entered
    }

    pub fn clear_count(&self) -> usize {
        self.screen.lock().clears
    }

    pub fn flush_count(&self) -> usize {
        self.screen.lock().flushes
    }

    /// Act like a raw-mode terminal whose own key reader is `keys`.
    pub fn with_raw_keys(self, keys: MemoryKeys) -> Self {
        self.screen.lock().raw_keys = Some(keys);
        self
    }

    /// Make every following `print_at` fail.
    pub fn fail_prints(&self, fail: bool) {
        self.screen.lock().fail_prints = fail;
    }
}

impl Terminal for MemoryTerminal {
    fn size(&self) -> Result<Size> {
        Ok(self.screen.lock().size)
    }

    fn enter(&mut self) -> Result<()> {
        self.screen.lock().entered = true;
        self.clear()
    }

    fn leave(&mut self) -> Result<()> {
        self.screen.lock().entered = false;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let mut screen = self.screen.lock();
        screen.cells = Screen::blank(screen.size);
        screen.clears += 1;
        Ok(())
    }

    fn print_at(&mut self, x: u16, y: u16, display: &str) -> Result<()> {
        let mut screen = self.screen.lock();
        if screen.fail_prints {
            return Err(BlocksError::Terminal("print rejected by memory terminal".into()));
        }
        screen.writes.push((x, y, display.to_string()));
        let Some(row) = screen.cells.get_mut(usize::from(y)) else {
            return Ok(());
        };
        let mut col = usize::from(x);
        for ch in StyleSheet::strip(display).chars() {
            if col >= row.len() {
                break;
            }
            row[col] = ch;
            col += char_width(ch).max(1);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.screen.lock().flushes += 1;
        Ok(())
    }

    fn raw_keys(&mut self) -> Option<Box<dyn KeySource>> {
        let keys = self.screen.lock().raw_keys.take()?;
        Some(Box::new(keys))
    }
}

/// Keys fed through a channel, for tests and scripted input.
#[derive(Debug)]
pub struct MemoryKeys {
    keys: Receiver<Key>,
}

impl MemoryKeys {
    /// A key source and the sender that feeds it.
    pub fn channel() -> (Sender<Key>, Self) {
        let (tx, rx) = unbounded();
        (tx, Self { keys: rx })
    }

    pub fn scripted(keys: impl IntoIterator<Item = Key>) -> Self {
        let (tx, source) = Self::channel();
        for key in keys {
            let _ = tx.send(key);
        }
        source
    }
}

impl KeySource for MemoryKeys {
    fn read_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        match self.keys.recv_timeout(timeout) {
            Ok(key) => Ok(Some(key)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}
