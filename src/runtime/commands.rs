use std::sync::Arc;

use crate::arrangement::{Arrangement, NodeId};
use crate::error::ConfigurationError;
use crate::node::Node;

/// Structural change to the root arrangement, applied by the render loop.
#[derive(Debug, Clone)]
pub enum LayoutCommand {
    /// Replace the whole arrangement.
    Load(Arrangement),
    /// Swap the node placed at `id`.
    Replace { id: NodeId, node: Arc<Node> },
    AddRight { id: NodeId, node: Arc<Node> },
    AddUnder { id: NodeId, node: Arc<Node> },
}

impl LayoutCommand {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Load(_) => "load",
            Self::Replace { .. } => "replace",
            Self::AddRight { .. } => "add_right",
            Self::AddUnder { .. } => "add_under",
        }
    }

    /// Apply to `root`, which must be a composite. Nothing changes on error.
    pub fn apply(self, root: &Node) -> Result<(), ConfigurationError> {
        let next = match self {
            Self::Load(arrangement) => arrangement,
            Self::Replace { id, node } => current(root)?.with_replaced(&id, node)?,
            Self::AddRight { id, node } => current(root)?.with_added_right(id, node)?,
            Self::AddUnder { id, node } => current(root)?.with_added_under(id, node)?,
        };
        root.set_arrangement(next)
    }
}

fn current(root: &Node) -> Result<Arrangement, ConfigurationError> {
    root.arrangement().ok_or(ConfigurationError::NotAComposite)
}
