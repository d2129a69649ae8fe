use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::error::ConfigurationError;
use crate::layout::Axis;
use crate::node::Node;

pub type NodeId = String;

/// Nested row/column structure over node identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Leaf(NodeId),
    /// Children placed left to right.
    Row(Vec<Shape>),
    /// Children placed top to bottom.
    Column(Vec<Shape>),
}

impl Shape {
    pub fn leaf(id: impl Into<NodeId>) -> Self {
        Self::Leaf(id.into())
    }

    pub fn row(children: impl IntoIterator<Item = Shape>) -> Self {
        Self::Row(children.into_iter().collect())
    }

    pub fn column(children: impl IntoIterator<Item = Shape>) -> Self {
        Self::Column(children.into_iter().collect())
    }

    /// Row of leaves, one per identifier.
    pub fn row_of<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        Self::Row(ids.into_iter().map(Self::leaf).collect())
    }

    /// Column of leaves, one per identifier.
    pub fn column_of<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        Self::Column(ids.into_iter().map(Self::leaf).collect())
    }

    /// Parse a JSON layout description.
    ///
    /// Strings are leaf identifiers; `{"row": [..]}` and `{"column": [..]}`
    /// are groups. Anything else is rejected.
    pub fn from_json(value: &Value) -> Result<Self, ConfigurationError> {
        match value {
            Value::String(id) => Ok(Self::Leaf(id.clone())),
            Value::Object(map) if map.len() == 1 => {
                let (key, children) = map
                    .iter()
                    .next()
                    .ok_or_else(|| ConfigurationError::MalformedShape("empty object".into()))?;
                let Value::Array(children) = children else {
                    return Err(ConfigurationError::MalformedShape(format!(
                        "`{key}` must hold an array"
                    )));
                };
                let children = children
                    .iter()
                    .map(Self::from_json)
                    .collect::<Result<Vec<_>, _>>()?;
                match key.as_str() {
                    "row" => Ok(Self::Row(children)),
                    "column" => Ok(Self::Column(children)),
                    other => Err(ConfigurationError::MalformedShape(format!(
                        "unknown group `{other}`"
                    ))),
                }
            }
            other => Err(ConfigurationError::MalformedShape(format!(
                "unexpected value {other}"
            ))),
        }
    }

    pub fn axis(&self) -> Option<Axis> {
        match self {
            Self::Leaf(_) => None,
            Self::Row(_) => Some(Axis::Horizontal),
            Self::Column(_) => Some(Axis::Vertical),
        }
    }

    /// Identifiers in placement order.
    pub fn ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Leaf(id) => out.push(id),
            Self::Row(children) | Self::Column(children) => {
                for child in children {
                    child.collect_ids(out);
                }
            }
        }
    }

    fn check_groups(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::Leaf(_) => Ok(()),
            Self::Row(children) | Self::Column(children) => {
                if children.is_empty() {
                    return Err(ConfigurationError::EmptyGroup);
                }
                children.iter().try_for_each(Self::check_groups)
            }
        }
    }

    fn replace_leaf(&self, id: &str, with: &Shape) -> Shape {
        match self {
            Self::Leaf(leaf) if leaf == id => with.clone(),
            Self::Leaf(_) => self.clone(),
            Self::Row(children) => {
                Self::Row(children.iter().map(|c| c.replace_leaf(id, with)).collect())
            }
            Self::Column(children) => {
                Self::Column(children.iter().map(|c| c.replace_leaf(id, with)).collect())
            }
        }
    }
}

/// A validated shape together with the nodes its identifiers name.
///
/// Arrangements are values: the edit methods return a new arrangement and
/// leave the receiver untouched, so a running layout is only ever replaced
/// wholesale.
#[derive(Debug, Clone)]
pub struct Arrangement {
    shape: Shape,
    nodes: HashMap<NodeId, Arc<Node>>,
}

impl Arrangement {
    /// Validate `shape` against `nodes`.
    ///
    /// Groups must be non-empty, identifiers unique, and every identifier
    /// must have a node. Nodes not named by the shape are kept but unused.
    pub fn new<I, K>(shape: Shape, nodes: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (K, Arc<Node>)>,
        K: Into<NodeId>,
    {
        let nodes = nodes
            .into_iter()
            .map(|(id, node)| (id.into(), node))
            .collect();
        let arrangement = Self { shape, nodes };
        arrangement.validate()?;
        Ok(arrangement)
    }

    /// Arrangement holding one node.
    pub fn single(id: impl Into<NodeId>, node: Arc<Node>) -> Self {
        let id = id.into();
        Self {
            shape: Shape::Leaf(id.clone()),
            nodes: HashMap::from([(id, node)]),
        }
    }

    pub fn from_json<I, K>(layout: &Value, nodes: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (K, Arc<Node>)>,
        K: Into<NodeId>,
    {
        Self::new(Shape::from_json(layout)?, nodes)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn node(&self, id: &str) -> Option<&Arc<Node>> {
        self.nodes.get(id)
    }

    /// Placed nodes in placement order.
    pub fn placed(&self) -> impl Iterator<Item = (&str, &Arc<Node>)> {
        self.shape
            .ids()
            .into_iter()
            .filter_map(|id| self.nodes.get(id).map(|node| (id, node)))
    }

    /// Copy with the node at `id` swapped for `node`.
    pub fn with_replaced(&self, id: &str, node: Arc<Node>) -> Result<Self, ConfigurationError> {
        if !self.shape.ids().contains(&id) {
            return Err(ConfigurationError::UnknownIdentifier(id.to_string()));
        }
        let mut next = self.clone();
        next.nodes.insert(id.to_string(), node);
        Ok(next)
    }

    /// Copy with `node` appended to the right of everything.
    ///
    /// A top-level row grows by one child; any other shape becomes the first
    /// child of a new row.
    pub fn with_added_right(
        &self,
        id: impl Into<NodeId>,
        node: Arc<Node>,
    ) -> Result<Self, ConfigurationError> {
        self.with_added(id.into(), node, Axis::Horizontal)
    }

    /// Copy with `node` appended below everything.
    pub fn with_added_under(
        &self,
        id: impl Into<NodeId>,
        node: Arc<Node>,
    ) -> Result<Self, ConfigurationError> {
        self.with_added(id.into(), node, Axis::Vertical)
    }

    /// Copy with the leaf `id` replaced by `shape`, which may introduce new
    /// identifiers from `nodes`.
    pub fn with_subshape<I, K>(
        &self,
        id: &str,
        shape: Shape,
        nodes: I,
    ) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (K, Arc<Node>)>,
        K: Into<NodeId>,
    {
        if !self.shape.ids().contains(&id) {
            return Err(ConfigurationError::UnknownIdentifier(id.to_string()));
        }
        let mut next = self.clone();
        next.shape = self.shape.replace_leaf(id, &shape);
        next.nodes
            .extend(nodes.into_iter().map(|(key, node)| (key.into(), node)));
        next.validate()?;
        Ok(next)
    }

    /// Slash-joined identifier path from this arrangement down to `target`,
    /// following nested composites.
    pub fn path_to(&self, target: &Node) -> Option<String> {
        let mut visited = HashSet::new();
        self.path_to_inner(target, &mut visited)
    }

    fn path_to_inner(&self, target: &Node, visited: &mut HashSet<*const Node>) -> Option<String> {
        for (id, node) in self.placed() {
            if std::ptr::eq(Arc::as_ptr(node), target) {
                return Some(id.to_string());
            }
            if !visited.insert(Arc::as_ptr(node)) {
                continue;
            }
            if let Some(nested) = node.arrangement() {
                if let Some(rest) = nested.path_to_inner(target, visited) {
                    return Some(format!("{id}/{rest}"));
                }
            }
        }
        None
    }

    fn with_added(&self, id: NodeId, node: Arc<Node>, axis: Axis) -> Result<Self, ConfigurationError> {
        if self.shape.ids().contains(&id.as_str()) {
            return Err(ConfigurationError::DuplicateIdentifier(id));
        }
        let leaf = Shape::Leaf(id.clone());
        let shape = match (&self.shape, axis) {
            (Shape::Row(children), Axis::Horizontal) => {
                Shape::Row(children.iter().cloned().chain([leaf]).collect())
            }
            (Shape::Column(children), Axis::Vertical) => {
                Shape::Column(children.iter().cloned().chain([leaf]).collect())
            }
            (current, Axis::Horizontal) => Shape::Row(vec![current.clone(), leaf]),
            (current, Axis::Vertical) => Shape::Column(vec![current.clone(), leaf]),
        };
        let mut nodes = self.nodes.clone();
        nodes.insert(id, node);
        Ok(Self { shape, nodes })
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        self.shape.check_groups()?;
        let mut seen = HashSet::new();
        for id in self.shape.ids() {
            if !seen.insert(id) {
                return Err(ConfigurationError::DuplicateIdentifier(id.to_string()));
            }
            if !self.nodes.contains_key(id) {
                return Err(ConfigurationError::MissingNode(id.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::DirtyBus;
    use serde_json::json;

    fn leaf(bus: &DirtyBus, text: &str) -> Arc<Node> {
        Node::text(text).bus(bus.clone()).build()
    }

    #[test]
    fn parses_nested_json_layout() {
        let shape = Shape::from_json(&json!({"row": ["a", {"column": ["b", "c"]}]})).unwrap();
        assert_eq!(
            shape,
            Shape::row([Shape::leaf("a"), Shape::column_of(["b", "c"])])
        );
        assert_eq!(shape.ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn rejects_malformed_json_layouts() {
        for bad in [
            json!(3),
            json!({"grid": ["a"]}),
            json!({"row": "a"}),
            json!({"row": ["a"], "column": ["b"]}),
            json!(["a", "b"]),
        ] {
            assert!(
                matches!(
                    Shape::from_json(&bad),
                    Err(ConfigurationError::MalformedShape(_))
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn validation_fails_fast() {
        let bus = DirtyBus::new();
        let a = leaf(&bus, "a");

        let empty = Arrangement::new(Shape::row([Shape::Column(vec![])]), [("a", a.clone())]);
        assert_eq!(empty.unwrap_err(), ConfigurationError::EmptyGroup);

        let dup = Arrangement::new(Shape::row_of(["a", "a"]), [("a", a.clone())]);
        assert_eq!(
            dup.unwrap_err(),
            ConfigurationError::DuplicateIdentifier("a".into())
        );

        let missing = Arrangement::new(Shape::row_of(["a", "b"]), [("a", a)]);
        assert_eq!(
            missing.unwrap_err(),
            ConfigurationError::MissingNode("b".into())
        );
    }

    #[test]
    fn edits_leave_the_receiver_untouched() {
        let bus = DirtyBus::new();
        let base = Arrangement::new(
            Shape::row_of(["a", "b"]),
            [("a", leaf(&bus, "a")), ("b", leaf(&bus, "b"))],
        )
        .unwrap();

        let right = base.with_added_right("c", leaf(&bus, "c")).unwrap();
        assert_eq!(right.shape(), &Shape::row_of(["a", "b", "c"]));

        let under = base.with_added_under("d", leaf(&bus, "d")).unwrap();
        assert_eq!(
            under.shape(),
            &Shape::column([Shape::row_of(["a", "b"]), Shape::leaf("d")])
        );

        let replacement = leaf(&bus, "z");
        let replaced = base.with_replaced("b", replacement.clone()).unwrap();
        assert!(Arc::ptr_eq(replaced.node("b").unwrap(), &replacement));
        assert!(!Arc::ptr_eq(base.node("b").unwrap(), &replacement));
        assert_eq!(base.shape(), &Shape::row_of(["a", "b"]));
    }

    #[test]
    fn edits_reject_bad_identifiers() {
        let bus = DirtyBus::new();
        let base = Arrangement::single("a", leaf(&bus, "a"));
        assert_eq!(
            base.with_added_right("a", leaf(&bus, "x")).unwrap_err(),
            ConfigurationError::DuplicateIdentifier("a".into())
        );
        assert_eq!(
            base.with_replaced("nope", leaf(&bus, "x")).unwrap_err(),
            ConfigurationError::UnknownIdentifier("nope".into())
        );
    }

    #[test]
    fn subshape_splits_a_leaf() {
        let bus = DirtyBus::new();
        let base = Arrangement::new(
            Shape::row_of(["a", "b"]),
            [("a", leaf(&bus, "a")), ("b", leaf(&bus, "b"))],
        )
        .unwrap();
        let split = base
            .with_subshape(
                "b",
                Shape::column_of(["b", "c"]),
                [("c", leaf(&bus, "c"))],
            )
            .unwrap();
        assert_eq!(
            split.shape(),
            &Shape::row([Shape::leaf("a"), Shape::column_of(["b", "c"])])
        );
    }
}
