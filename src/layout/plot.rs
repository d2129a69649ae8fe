use std::sync::Arc;

use crate::arrangement::{Arrangement, Shape};
use crate::error::ConfigurationError;
use crate::geometry::Rect;
use crate::layout::core::{Axis, Resolved, divvy};
use crate::node::{Node, Snapshot};

/// Path given to the node a plot is built from.
pub const ROOT_PATH: &str = "root";

/// Layout tree derived from a node, with merged size preferences.
///
/// A plot is rebuilt from scratch every cycle and never patched. Building
/// reads each node once under its own lock and mutates nothing.
#[derive(Debug, Clone)]
pub enum Plot {
    Leaf {
        path: String,
        node: Arc<Node>,
        width: Resolved,
        height: Resolved,
    },
    Group {
        axis: Axis,
        children: Vec<Plot>,
        width: Resolved,
        height: Resolved,
    },
}

/// A leaf node and the rectangle it was assigned.
#[derive(Debug, Clone)]
pub struct Placement {
    /// Slash-joined identifiers from the root, e.g. `root/body/log`.
    pub path: String,
    pub node: Arc<Node>,
    pub rect: Rect,
}

/// Rendered display rows of one leaf, positioned on the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub path: String,
    pub rect: Rect,
    pub rows: Vec<String>,
}

impl Plot {
    /// Build the plot for `root`, descending through nested composites.
    pub fn build(root: &Arc<Node>) -> Result<Self, ConfigurationError> {
        let mut ancestors = Vec::new();
        Self::from_node(ROOT_PATH.to_string(), root, &mut ancestors)
    }

    fn from_node(
        path: String,
        node: &Arc<Node>,
        ancestors: &mut Vec<*const Node>,
    ) -> Result<Self, ConfigurationError> {
        let ptr = Arc::as_ptr(node);
        if ancestors.contains(&ptr) {
            return Err(ConfigurationError::Cycle(path));
        }
        match node.snapshot() {
            Snapshot::Leaf { width, height } => Ok(Self::Leaf {
                path,
                node: Arc::clone(node),
                width,
                height,
            }),
            Snapshot::Composite {
                arrangement,
                width,
                height,
            } => {
                ancestors.push(ptr);
                let built = Self::from_shape(&path, arrangement.shape(), &arrangement, ancestors);
                ancestors.pop();
                let mut plot = built?;
                if !width.is_default() {
                    let own = width.resolve(0);
                    plot.set_width(plot.width().clamp_to(own));
                }
                if !height.is_default() {
                    let own = height.resolve(0);
                    plot.set_height(plot.height().clamp_to(own));
                }
                Ok(plot)
            }
        }
    }

    fn from_shape(
        prefix: &str,
        shape: &Shape,
        arrangement: &Arrangement,
        ancestors: &mut Vec<*const Node>,
    ) -> Result<Self, ConfigurationError> {
        match shape {
            Shape::Leaf(id) => {
                let node = arrangement
                    .node(id)
                    .ok_or_else(|| ConfigurationError::MissingNode(id.clone()))?;
                Self::from_node(format!("{prefix}/{id}"), node, ancestors)
            }
            Shape::Row(children) | Shape::Column(children) => {
                if children.is_empty() {
                    return Err(ConfigurationError::EmptyGroup);
                }
                let axis = shape.axis().unwrap_or(Axis::Horizontal);
                let children = children
                    .iter()
                    .map(|child| Self::from_shape(prefix, child, arrangement, ancestors))
                    .collect::<Result<Vec<_>, _>>()?;
                let widths = children.iter().map(Plot::width);
                let heights = children.iter().map(Plot::height);
                let (width, height) = match axis {
                    Axis::Horizontal => (Resolved::merge_main(widths), Resolved::merge_cross(heights)),
                    Axis::Vertical => (Resolved::merge_cross(widths), Resolved::merge_main(heights)),
                };
                Ok(Self::Group {
                    axis,
                    children,
                    width,
                    height,
                })
            }
        }
    }

    pub fn width(&self) -> Resolved {
        match self {
            Self::Leaf { width, .. } | Self::Group { width, .. } => *width,
        }
    }

    pub fn height(&self) -> Resolved {
        match self {
            Self::Leaf { height, .. } | Self::Group { height, .. } => *height,
        }
    }

    fn set_width(&mut self, value: Resolved) {
        match self {
            Self::Leaf { width, .. } | Self::Group { width, .. } => *width = value,
        }
    }

    fn set_height(&mut self, value: Resolved) {
        match self {
            Self::Leaf { height, .. } | Self::Group { height, .. } => *height = value,
        }
    }

    fn extent(&self, axis: Axis) -> Resolved {
        match axis {
            Axis::Horizontal => self.width(),
            Axis::Vertical => self.height(),
        }
    }

    /// Assign a rectangle to every leaf, in placement order.
    ///
    /// Siblings split their group's extent along the group axis and span
    /// its full extent across it.
    pub fn resolve(&self, rect: Rect) -> Vec<Placement> {
        let mut out = Vec::new();
        self.resolve_into(rect, &mut out);
        out
    }

    fn resolve_into(&self, rect: Rect, out: &mut Vec<Placement>) {
        match self {
            Self::Leaf { path, node, .. } => out.push(Placement {
                path: path.clone(),
                node: Arc::clone(node),
                rect,
            }),
            Self::Group { axis, children, .. } => {
                let prefs: Vec<Resolved> = children.iter().map(|c| c.extent(*axis)).collect();
                let total = match axis {
                    Axis::Horizontal => rect.width,
                    Axis::Vertical => rect.height,
                };
                let sizes = divvy(&prefs, u32::from(total));
                let mut offset = 0u16;
                for (child, size) in children.iter().zip(sizes) {
                    let size = u16::try_from(size).unwrap_or(u16::MAX);
                    let child_rect = match axis {
                        Axis::Horizontal => {
                            Rect::new(rect.x.saturating_add(offset), rect.y, size, rect.height)
                        }
                        Axis::Vertical => {
                            Rect::new(rect.x, rect.y.saturating_add(offset), rect.width, size)
                        }
                    };
                    offset = offset.saturating_add(size);
                    child.resolve_into(child_rect, out);
                }
            }
        }
    }

    /// Resolve, then render every leaf into its rectangle.
    pub fn render(&self, rect: Rect) -> Result<Vec<Frame>, ConfigurationError> {
        self.resolve(rect)
            .into_iter()
            .map(|placement| {
                let rows = placement
                    .node
                    .render(placement.rect.width, placement.rect.height)?;
                Ok(Frame {
                    path: placement.path,
                    rect: placement.rect,
                    rows,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::DirtyBus;
    use crate::justify::VJust;
    use crate::layout::SizePref;

    fn rects(placements: &[Placement]) -> Vec<(&str, Rect)> {
        placements
            .iter()
            .map(|p| (p.path.as_str(), p.rect))
            .collect()
    }

    #[test]
    fn row_scenario_partitions_width() {
        let bus = DirtyBus::new();
        let a = Node::text("a").width(SizePref::fixed(2)).bus(bus.clone()).build();
        let b = Node::text("b").bus(bus.clone()).build();
        let c = Node::text("c")
            .width(SizePref::range(3, 5).unwrap())
            .bus(bus.clone())
            .build();
        let arrangement =
            Arrangement::new(Shape::row_of(["a", "b", "c"]), [("a", a), ("b", b), ("c", c)])
                .unwrap();
        let root = Node::composite(arrangement).bus(bus).build();

        let plot = Plot::build(&root).unwrap();
        assert_eq!(plot.width(), Resolved::new(5, None));
        assert_eq!(
            rects(&plot.resolve(Rect::new(0, 1, 10, 4))),
            vec![
                ("root/a", Rect::new(0, 1, 2, 4)),
                ("root/b", Rect::new(2, 1, 3, 4)),
                ("root/c", Rect::new(5, 1, 5, 4)),
            ]
        );
    }

    #[test]
    fn nested_composites_resolve_transparently() {
        let bus = DirtyBus::new();
        let header = Node::text("title").height(SizePref::fixed(1)).bus(bus.clone()).build();
        let left = Node::text("l").bus(bus.clone()).build();
        let right = Node::text("r").bus(bus.clone()).build();
        let body = Node::composite(
            Arrangement::new(Shape::row_of(["l", "r"]), [("l", left), ("r", right)]).unwrap(),
        )
        .bus(bus.clone())
        .build();
        let root = Node::composite(
            Arrangement::new(
                Shape::column_of(["header", "body"]),
                [("header", header), ("body", body)],
            )
            .unwrap(),
        )
        .bus(bus)
        .build();

        let plot = Plot::build(&root).unwrap();
        let placed = plot.resolve(Rect::new(0, 0, 9, 5));
        assert_eq!(
            rects(&placed),
            vec![
                ("root/header", Rect::new(0, 0, 9, 1)),
                ("root/body/l", Rect::new(0, 1, 5, 4)),
                ("root/body/r", Rect::new(5, 1, 4, 4)),
            ]
        );
    }

    #[test]
    fn rebuild_is_idempotent() {
        let bus = DirtyBus::new();
        let nodes: Vec<(String, Arc<Node>)> = (0..4)
            .map(|i| {
                let node = Node::text(format!("n{i}"))
                    .height(SizePref::range(i, i + 2).unwrap())
                    .bus(bus.clone())
                    .build();
                (format!("n{i}"), node)
            })
            .collect();
        let shape = Shape::column([
            Shape::row_of(["n0", "n1"]),
            Shape::leaf("n2"),
            Shape::leaf("n3"),
        ]);
        let root = Node::composite(Arrangement::new(shape, nodes).unwrap())
            .bus(bus)
            .build();
        let area = Rect::new(0, 0, 20, 11);
        let first = Plot::build(&root).unwrap().resolve(area);
        let second = Plot::build(&root).unwrap().resolve(area);
        assert_eq!(rects(&first), rects(&second));
    }

    #[test]
    fn composite_preferences_clamp_the_merge() {
        let bus = DirtyBus::new();
        let inner = Node::text("x").bus(bus.clone()).build();
        let boxed = Node::composite(Arrangement::single("x", inner))
            .height(SizePref::fixed(2))
            .bus(bus.clone())
            .build();
        let filler = Node::blank().bus(bus.clone()).build();
        let root = Node::composite(
            Arrangement::new(
                Shape::column_of(["boxed", "filler"]),
                [("boxed", boxed), ("filler", filler)],
            )
            .unwrap(),
        )
        .bus(bus)
        .build();
        let placed = Plot::build(&root).unwrap().resolve(Rect::new(0, 0, 4, 10));
        assert_eq!(placed[0].rect, Rect::new(0, 0, 4, 2));
        assert_eq!(placed[1].rect, Rect::new(0, 2, 4, 8));
    }

    #[test]
    fn leaf_root_fills_the_surface() {
        let root = Node::text("one\ntwo")
            .vjust(VJust::EvenSplit)
            .bus(DirtyBus::new())
            .build();
        let frames = Plot::build(&root).unwrap().render(Rect::new(0, 0, 3, 6)).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].path, ROOT_PATH);
        assert_eq!(frames[0].rows.len(), 6);
    }

    #[test]
    fn zero_sized_placements_render_no_rows() {
        let bus = DirtyBus::new();
        let a = Node::text("a").height(SizePref::at_least(3)).bus(bus.clone()).build();
        let b = Node::text("b").height(SizePref::at_least(3)).bus(bus.clone()).build();
        let root = Node::composite(
            Arrangement::new(Shape::column_of(["a", "b"]), [("a", a), ("b", b)]).unwrap(),
        )
        .bus(bus)
        .build();
        let frames = Plot::build(&root).unwrap().render(Rect::new(0, 0, 2, 2)).unwrap();
        assert_eq!(frames[0].rows.len(), 2);
        assert!(frames[1].rows.is_empty());
    }
}
