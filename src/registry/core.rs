use std::collections::{HashMap, HashSet};

use blake3::Hash;

use crate::geometry::Rect;
use crate::layout::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameState {
    rect: Rect,
    hash: Hash,
}

impl FrameState {
    fn of(frame: &Frame) -> Self {
        let mut hasher = blake3::Hasher::new();
        for row in &frame.rows {
            hasher.update(row.as_bytes());
            hasher.update(b"\n");
        }
        Self {
            rect: frame.rect,
            hash: hasher.finalize(),
        }
    }
}

/// Last painted rectangle and row digest per leaf path.
#[derive(Debug, Default)]
pub struct FrameRegistry {
    entries: HashMap<String, FrameState>,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `frames` as painted and report, per frame, whether it differs
    /// from what was painted last under the same path. Paths that are no
    /// longer present are forgotten.
    pub fn sync(&mut self, frames: &[Frame]) -> Vec<bool> {
        let mut changed = Vec::with_capacity(frames.len());
        for frame in frames {
            let state = FrameState::of(frame);
            let previous = self.entries.insert(frame.path.clone(), state);
            changed.push(previous != Some(state));
        }

        let live: HashSet<&str> = frames.iter().map(|frame| frame.path.as_str()).collect();
        self.entries.retain(|path, _| live.contains(path.as_str()));
        changed
    }

    pub fn rect_of(&self, path: &str) -> Option<Rect> {
        self.entries.get(path).map(|state| state.rect)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
