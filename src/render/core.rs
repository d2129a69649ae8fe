use crate::error::Result;
use crate::layout::Frame;
use crate::registry::FrameRegistry;
use crate::terminal::Terminal;

/// How much of the tree a cycle writes to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepaintMode {
    /// Every frame, every cycle.
    #[default]
    Full,
    /// Only frames whose rectangle or rows changed since the last cycle.
    Changed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaintStats {
    pub painted: usize,
    pub skipped: usize,
}

/// Writes rendered frames to a terminal, one `print_at` per row.
#[derive(Debug, Default)]
pub struct Painter {
    mode: RepaintMode,
    registry: FrameRegistry,
}

impl Painter {
    pub fn new(mode: RepaintMode) -> Self {
        Self {
            mode,
            registry: FrameRegistry::new(),
        }
    }

    pub fn mode(&self) -> RepaintMode {
        self.mode
    }

    /// Forget what was painted; the next paint writes every frame. Call
    /// after the surface was cleared.
    pub fn invalidate(&mut self) {
        self.registry.clear();
    }

    pub fn paint(&mut self, terminal: &mut dyn Terminal, frames: &[Frame]) -> Result<PaintStats> {
        let changed = self.registry.sync(frames);
        let mut stats = PaintStats::default();
        for (frame, changed) in frames.iter().zip(changed) {
            if self.mode == RepaintMode::Changed && !changed {
                stats.skipped += 1;
                continue;
            }
            for (offset, row) in frame.rows.iter().enumerate() {
                let y = frame.rect.y.saturating_add(offset as u16);
                terminal.print_at(frame.rect.x, y, row)?;
            }
            stats.painted += 1;
        }
        terminal.flush()?;
        Ok(stats)
    }
}
