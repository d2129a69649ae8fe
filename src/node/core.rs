use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::arrangement::Arrangement;
use crate::bus::DirtyBus;
use crate::error::ConfigurationError;
use crate::justify::{HJust, VJust};
use crate::layout::{Resolved, SizePref};
use crate::line::{Line, Markup};

/// What a node displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Rows of marked-up text.
    Text,
    /// One row tiled with a pattern, used for horizontal borders.
    HorizontalFill,
    /// A pattern repeated on every row, used for vertical borders.
    VerticalFill,
    /// A region laid out by a nested arrangement.
    Composite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafKind {
    Text,
    HorizontalFill,
    VerticalFill,
}

impl From<LeafKind> for NodeKind {
    fn from(kind: LeafKind) -> Self {
        match kind {
            LeafKind::Text => Self::Text,
            LeafKind::HorizontalFill => Self::HorizontalFill,
            LeafKind::VerticalFill => Self::VerticalFill,
        }
    }
}

#[derive(Clone)]
enum Body {
    Leaf { kind: LeafKind, text: String },
    Composite(Arrangement),
}

#[derive(Clone)]
struct NodeState {
    body: Body,
    hjust: HJust,
    vjust: VJust,
    width: SizePref,
    height: SizePref,
}

/// A rectangular screen region.
///
/// A node is either a leaf that renders its own rows or a composite that
/// delegates to an [`Arrangement`]; the kind is fixed at construction. Every
/// mutator updates the node under its own lock and publishes a dirty
/// notification on the node's bus before the lock is released.
pub struct Node {
    state: Mutex<NodeState>,
    bus: DirtyBus,
}

/// Point-in-time view of a node, taken under its lock, used by the plot
/// builder.
pub(crate) enum Snapshot {
    Leaf { width: Resolved, height: Resolved },
    Composite {
        arrangement: Arrangement,
        width: SizePref,
        height: SizePref,
    },
}

/// Builder returned by the [`Node`] constructors.
#[must_use]
pub struct NodeBuilder {
    state: NodeState,
    bus: Option<DirtyBus>,
}

impl NodeBuilder {
    fn new(body: Body) -> Self {
        Self {
            state: NodeState {
                body,
                hjust: HJust::default(),
                vjust: VJust::default(),
                width: SizePref::default(),
                height: SizePref::default(),
            },
            bus: None,
        }
    }

    pub fn hjust(mut self, hjust: HJust) -> Self {
        self.state.hjust = hjust;
        self
    }

    pub fn vjust(mut self, vjust: VJust) -> Self {
        self.state.vjust = vjust;
        self
    }

    pub fn width(mut self, pref: SizePref) -> Self {
        self.state.width = pref;
        self
    }

    pub fn height(mut self, pref: SizePref) -> Self {
        self.state.height = pref;
        self
    }

    /// Publish dirty notifications on `bus` instead of the global bus.
    pub fn bus(mut self, bus: DirtyBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn build(self) -> Arc<Node> {
        Arc::new(Node {
            state: Mutex::new(self.state),
            bus: self.bus.unwrap_or_else(DirtyBus::global),
        })
    }
}

impl Node {
    /// A text leaf. Rows are separated by `\n`.
    pub fn text(text: impl Into<String>) -> NodeBuilder {
        NodeBuilder::new(Body::Leaf {
            kind: LeafKind::Text,
            text: text.into(),
        })
    }

    /// A leaf with no content that fills whatever space it is given.
    pub fn blank() -> NodeBuilder {
        Self::text("")
    }

    /// A single row tiled with `pattern`. Its height grows to one row, or
    /// stays at zero while the pattern is empty. Rows beyond the first are
    /// blank when the layout hands it more.
    pub fn hfill(pattern: impl Into<String>) -> NodeBuilder {
        NodeBuilder::new(Body::Leaf {
            kind: LeafKind::HorizontalFill,
            text: pattern.into(),
        })
        .height(SizePref::natural(0))
    }

    /// A column as wide as `pattern`, repeating it on every row.
    pub fn vfill(pattern: impl Into<String>) -> NodeBuilder {
        let pattern = pattern.into();
        let width = fill_width(&pattern);
        NodeBuilder::new(Body::Leaf {
            kind: LeafKind::VerticalFill,
            text: pattern,
        })
        .width(SizePref::fixed(width))
    }

    pub fn composite(arrangement: Arrangement) -> NodeBuilder {
        NodeBuilder::new(Body::Composite(arrangement))
    }

    pub fn kind(&self) -> NodeKind {
        match &self.state.lock().body {
            Body::Leaf { kind, .. } => NodeKind::from(*kind),
            Body::Composite(_) => NodeKind::Composite,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind() != NodeKind::Composite
    }

    pub fn bus(&self) -> &DirtyBus {
        &self.bus
    }

    /// The leaf text, or `None` for composites.
    pub fn text_content(&self) -> Option<String> {
        match &self.state.lock().body {
            Body::Leaf { text, .. } => Some(text.clone()),
            Body::Composite(_) => None,
        }
    }

    pub fn arrangement(&self) -> Option<Arrangement> {
        match &self.state.lock().body {
            Body::Composite(arrangement) => Some(arrangement.clone()),
            Body::Leaf { .. } => None,
        }
    }

    pub fn hjust(&self) -> HJust {
        self.state.lock().hjust
    }

    pub fn vjust(&self) -> VJust {
        self.state.lock().vjust
    }

    pub fn width_pref(&self) -> SizePref {
        self.state.lock().width
    }

    pub fn height_pref(&self) -> SizePref {
        self.state.lock().height
    }

    /// Widest visible row and row count of a leaf's content.
    pub fn natural_extent(&self) -> (usize, usize) {
        natural_extent(&self.state.lock().body)
    }

    pub fn set_text(&self, text: impl Into<String>) -> Result<(), ConfigurationError> {
        let text = text.into();
        self.mutate_leaf(|kind, current| {
            *current = text;
            (kind == LeafKind::VerticalFill).then(|| SizePref::fixed(fill_width(current)))
        })
    }

    pub fn push_str(&self, suffix: &str) -> Result<(), ConfigurationError> {
        self.mutate_leaf(|kind, current| {
            current.push_str(suffix);
            (kind == LeafKind::VerticalFill).then(|| SizePref::fixed(fill_width(current)))
        })
    }

    /// Clear a leaf's text, returning what it held.
    pub fn take_text(&self) -> Result<String, ConfigurationError> {
        let mut taken = String::new();
        self.mutate_leaf(|kind, current| {
            taken = std::mem::take(current);
            (kind == LeafKind::VerticalFill).then(|| SizePref::fixed(0))
        })?;
        Ok(taken)
    }

    /// Remove and return the last character of a leaf's text.
    pub fn pop_char(&self) -> Result<Option<char>, ConfigurationError> {
        let mut popped = None;
        self.mutate_leaf(|kind, current| {
            popped = current.pop();
            (kind == LeafKind::VerticalFill).then(|| SizePref::fixed(fill_width(current)))
        })?;
        Ok(popped)
    }

    pub fn set_hjust(&self, hjust: HJust) {
        self.mutate(|state| state.hjust = hjust);
    }

    pub fn set_vjust(&self, vjust: VJust) {
        self.mutate(|state| state.vjust = vjust);
    }

    pub fn set_width_pref(&self, pref: SizePref) {
        self.mutate(|state| state.width = pref);
    }

    pub fn set_height_pref(&self, pref: SizePref) {
        self.mutate(|state| state.height = pref);
    }

    /// Swap a composite's arrangement.
    ///
    /// Holds the tree-wide lock, so the render loop never rebuilds a plot
    /// halfway through the swap. An arrangement that reaches this node is
    /// rejected before anything changes.
    pub fn set_arrangement(&self, arrangement: Arrangement) -> Result<(), ConfigurationError> {
        let _tree = self.bus.lock_tree();
        if !self.is_leaf() {
            if let Some(id) = arrangement.path_to(self) {
                return Err(ConfigurationError::Cycle(id));
            }
        }
        let mut state = self.state.lock();
        match &mut state.body {
            Body::Composite(current) => *current = arrangement,
            Body::Leaf { .. } => return Err(ConfigurationError::NotAComposite),
        }
        self.bus.publish();
        Ok(())
    }

    /// Render a leaf into exactly `height` rows of exactly `width` columns.
    ///
    /// Rows are display strings: literal braces are doubled and every row
    /// closes with a reset. The style active at the end of the last content
    /// row carries into the padding rows below it. A zero-area request yields
    /// no rows.
    pub fn render(&self, width: u16, height: u16) -> Result<Vec<String>, ConfigurationError> {
        let state = self.state.lock();
        let Body::Leaf { kind, text } = &state.body else {
            return Err(ConfigurationError::NotALeaf);
        };
        let (width, height) = (usize::from(width), usize::from(height));
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }
        let rows = match kind {
            LeafKind::Text => render_text(text, width, height, state.hjust, state.vjust),
            LeafKind::HorizontalFill => {
                let blank = Line::fit("", width, state.hjust).display;
                let mut rows = vec![blank; height];
                rows[0] = Line::repeat_to_width(text, width).display;
                rows
            }
            LeafKind::VerticalFill => {
                let row = Line::fit(text, width, state.hjust).display;
                vec![row; height]
            }
        };
        Ok(rows)
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        match &state.body {
            Body::Leaf { .. } => {
                let (cols, rows) = natural_extent(&state.body);
                Snapshot::Leaf {
                    width: state.width.resolve(cols),
                    height: state.height.resolve(rows),
                }
            }
            Body::Composite(arrangement) => Snapshot::Composite {
                arrangement: arrangement.clone(),
                width: state.width,
                height: state.height,
            },
        }
    }

    fn mutate(&self, apply: impl FnOnce(&mut NodeState)) {
        let mut state = self.state.lock();
        apply(&mut state);
        self.bus.publish();
    }

    /// Edit leaf text; the closure may return a new width preference.
    fn mutate_leaf(
        &self,
        apply: impl FnOnce(LeafKind, &mut String) -> Option<SizePref>,
    ) -> Result<(), ConfigurationError> {
        let mut state = self.state.lock();
        let Body::Leaf { kind, text } = &mut state.body else {
            return Err(ConfigurationError::NotALeaf);
        };
        if let Some(width) = apply(*kind, text) {
            state.width = width;
        }
        self.bus.publish();
        Ok(())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        let mut out = f.debug_struct("Node");
        match &state.body {
            Body::Leaf { kind, text } => out
                .field("kind", &NodeKind::from(*kind))
                .field("text", text),
            Body::Composite(arrangement) => out
                .field("kind", &NodeKind::Composite)
                .field("shape", arrangement.shape()),
        };
        out.field("width", &state.width)
            .field("height", &state.height)
            .finish()
    }
}

fn fill_width(pattern: &str) -> u16 {
    u16::try_from(Markup::parse(pattern).width()).unwrap_or(u16::MAX)
}

fn text_rows(text: &str) -> impl Iterator<Item = &str> {
    let trimmed = text.trim_end_matches('\n');
    trimmed
        .split('\n')
        .filter(move |_| !trimmed.is_empty())
        .map(|row| row.trim_end_matches('\r'))
}

fn natural_extent(body: &Body) -> (usize, usize) {
    match body {
        Body::Leaf { kind, text } => match kind {
            LeafKind::Text => {
                let mut rows = 0;
                let mut widest = 0;
                for row in text_rows(text) {
                    rows += 1;
                    widest = widest.max(Markup::parse(row).width());
                }
                (widest, rows)
            }
            LeafKind::HorizontalFill => {
                let width = Markup::parse(text).width();
                (width, usize::from(width > 0))
            }
            LeafKind::VerticalFill => (Markup::parse(text).width(), 0),
        },
        Body::Composite(_) => (0, 0),
    }
}

fn render_text(text: &str, width: usize, height: usize, hjust: HJust, vjust: VJust) -> Vec<String> {
    let rows: Vec<&str> = text_rows(text).collect();
    let surplus = height.saturating_sub(rows.len());
    let above = vjust.rows_above(surplus);

    let mut out = Vec::with_capacity(height);
    let blank = Line::fit("", width, hjust).display;
    out.extend(std::iter::repeat_n(blank, above));

    let mut carry: Option<String> = None;
    for row in rows.iter().take(height - above) {
        let line = Line::fit(&with_carry(carry.as_deref(), row), width, hjust);
        carry = line.last_style;
        out.push(line.display);
    }
    while out.len() < height {
        let line = Line::fit(&with_carry(carry.as_deref(), ""), width, hjust);
        out.push(line.display);
    }
    out
}

fn with_carry(style: Option<&str>, row: &str) -> String {
    match style {
        Some(style) => format!("{{{style}}}{row}"),
        None => row.to_string(),
    }
}
