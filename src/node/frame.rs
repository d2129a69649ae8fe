use std::sync::Arc;

use crate::arrangement::{Arrangement, Shape};
use crate::error::ConfigurationError;
use crate::justify::HJust;
use crate::layout::SizePref;
use crate::node::Node;

const DEFAULT_BORDER: &str = "\u{b7}";

/// Border and title decoration for [`Node::framed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStyle {
    pub top: String,
    pub bottom: String,
    pub left: String,
    pub right: String,
    pub title: String,
    /// Pattern tiled under the title.
    pub title_sep: String,
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            top: DEFAULT_BORDER.to_string(),
            bottom: DEFAULT_BORDER.to_string(),
            left: DEFAULT_BORDER.to_string(),
            right: DEFAULT_BORDER.to_string(),
            title: String::new(),
            title_sep: String::new(),
        }
    }
}

impl FrameStyle {
    pub fn no_borders() -> Self {
        Self {
            top: String::new(),
            bottom: String::new(),
            left: String::new(),
            right: String::new(),
            ..Self::default()
        }
    }

    /// Use `border` on all four sides.
    pub fn with_border(mut self, border: impl Into<String>) -> Self {
        let border = border.into();
        self.top = border.clone();
        self.bottom = border.clone();
        self.left = border.clone();
        self.right = border;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_title_sep(mut self, sep: impl Into<String>) -> Self {
        self.title_sep = sep.into();
        self
    }
}

/// A node wrapped in borders and an optional title.
#[derive(Debug, Clone)]
pub struct Framed {
    node: Arc<Node>,
    inner: Arc<Node>,
    title: Arc<Node>,
}

impl Framed {
    /// The composite to place in an arrangement.
    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn inner(&self) -> &Arc<Node> {
        &self.inner
    }

    pub fn set_title(&self, title: impl Into<String>) -> Result<(), ConfigurationError> {
        self.title.set_text(title)
    }
}

impl Node {
    /// Wrap `inner` in a frame.
    ///
    /// The frame is a composite laid out as
    /// `row[left, column[top, title, title_sep, inner, bottom], right]`. It
    /// takes over `inner`'s size preferences and `inner` reverts to the
    /// defaults, so the wrapped region claims the same space as before. Empty
    /// border or title patterns take no space.
    pub fn framed(inner: Arc<Node>, style: FrameStyle) -> Result<Framed, ConfigurationError> {
        let bus = inner.bus().clone();
        let title = Node::text(style.title)
            .hjust(HJust::Center)
            .height(SizePref::natural(0))
            .bus(bus.clone())
            .build();

        let shape = Shape::row([
            Shape::leaf("left"),
            Shape::column_of(["top", "title", "title_sep", "inner", "bottom"]),
            Shape::leaf("right"),
        ]);
        let arrangement = Arrangement::new(
            shape,
            [
                ("left", Node::vfill(style.left).bus(bus.clone()).build()),
                ("top", Node::hfill(style.top).bus(bus.clone()).build()),
                ("title", title.clone()),
                (
                    "title_sep",
                    Node::hfill(style.title_sep).bus(bus.clone()).build(),
                ),
                ("inner", inner.clone()),
                ("bottom", Node::hfill(style.bottom).bus(bus.clone()).build()),
                ("right", Node::vfill(style.right).bus(bus.clone()).build()),
            ],
        )?;

        let node = Node::composite(arrangement)
            .width(inner.width_pref())
            .height(inner.height_pref())
            .bus(bus)
            .build();
        inner.set_width_pref(SizePref::default());
        inner.set_height_pref(SizePref::default());
        Ok(Framed { node, inner, title })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::DirtyBus;
    use crate::geometry::Rect;
    use crate::layout::Plot;
    use crate::line::Line;

    fn screen(root: &Arc<Node>, width: u16, height: u16) -> Vec<String> {
        let plot = Plot::build(root).unwrap();
        let mut grid = vec![vec![' '; usize::from(width)]; usize::from(height)];
        for frame in plot.render(Rect::new(0, 0, width, height)).unwrap() {
            for (dy, row) in frame.rows.iter().enumerate() {
                let y = usize::from(frame.rect.y) + dy;
                for (dx, ch) in Line::full(row).plain.chars().enumerate() {
                    grid[y][usize::from(frame.rect.x) + dx] = ch;
                }
            }
        }
        grid.into_iter().map(|row| row.into_iter().collect()).collect()
    }

    #[test]
    fn frame_surrounds_inner_node() {
        let inner = Node::text("hi").bus(DirtyBus::new()).build();
        let framed = Node::framed(inner, FrameStyle::default().with_border("#")).unwrap();
        assert_eq!(
            screen(framed.node(), 5, 4),
            vec!["#####", "#hi #", "#   #", "#####"]
        );
    }

    #[test]
    fn title_takes_a_row_once_set() {
        let inner = Node::text("x").bus(DirtyBus::new()).build();
        let framed = Node::framed(
            inner,
            FrameStyle::default().with_border("*").with_title_sep("-"),
        )
        .unwrap();
        assert_eq!(screen(framed.node(), 5, 4), vec!["*****", "*---*", "*x  *", "*****"]);

        framed.set_title("ab").unwrap();
        assert_eq!(
            screen(framed.node(), 6, 5),
            vec!["******", "* ab *", "*----*", "*x   *", "******"]
        );
    }

    #[test]
    fn frame_takes_over_inner_preferences() {
        let inner = Node::text("x")
            .width(SizePref::fixed(7))
            .bus(DirtyBus::new())
            .build();
        let framed = Node::framed(inner.clone(), FrameStyle::no_borders()).unwrap();
        assert_eq!(framed.node().width_pref(), SizePref::fixed(7));
        assert_eq!(inner.width_pref(), SizePref::default());
        assert_eq!(screen(framed.node(), 3, 1), vec!["x  "]);
    }
}
