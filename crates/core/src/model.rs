use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId(0)
    }
}

/// Handle to a node of one particular tree build.
///
/// Trees are rebuilt from scratch whenever the item set changes, so a bare
/// [`NodeId`] is only meaningful together with the generation of the tree it
/// was taken from. Handles from an older generation are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub generation: u64,
    pub id: NodeId,
}

/// A leaf datum supplied by the caller, or a pre-grouped set of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Item>,
}

impl Item {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>, children: Vec<Item>) -> Self {
        Self {
            name: name.into(),
            value: 0.0,
            children,
        }
    }

    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }

    /// Number of leaf items at or below this item.
    pub fn leaf_count(&self) -> usize {
        if self.is_group() {
            self.children.iter().map(Item::leaf_count).sum()
        } else {
            1
        }
    }

    /// Visits every leaf value at or below this item.
    pub fn for_each_leaf_value(&self, f: &mut impl FnMut(f64)) {
        if self.is_group() {
            for child in &self.children {
                child.for_each_leaf_value(f);
            }
        } else {
            f(self.value)
        }
    }
}

pub fn leaf_count(items: &[Item]) -> usize {
    items.iter().map(Item::leaf_count).sum()
}

/// Clamps negative and non-finite values to zero.
pub fn sanitize_value(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A size is degenerate when either side is zero, negative or not finite.
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, origin.x + size.width, origin.y + size.height)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.area() <= 0.0
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x0, self.y0)
    }

    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) * 0.5, (self.y0 + self.y1) * 0.5)
    }

    /// Half-open containment: the right and bottom edges belong to the neighbour.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x0 && p.x < self.x1 && p.y >= self.y0 && p.y < self.y1
    }

    /// Shrinks the rectangle by `amount` on every side. Collapses onto the
    /// centre line instead of inverting when the inset exceeds the extent.
    pub fn inset(&self, amount: f64) -> Rect {
        if amount <= 0.0 {
            return *self;
        }
        let c = self.center();
        let x0 = (self.x0 + amount).min(c.x);
        let x1 = (self.x1 - amount).max(c.x);
        let y0 = (self.y0 + amount).min(c.y);
        let y1 = (self.y1 - amount).max(c.y);
        Rect::new(x0, y0, x1, y1)
    }

    pub fn round(&self) -> Rect {
        Rect::new(self.x0.round(), self.y0.round(), self.x1.round(), self.y1.round())
    }

    /// Zero-area rectangle at this rectangle's origin.
    pub fn collapsed(&self) -> Rect {
        Rect::new(self.x0, self.y0, self.x0, self.y0)
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        )
    }

    pub fn intersection_area(&self, other: &Rect) -> f64 {
        self.intersect(other).area()
    }

    /// Linear interpolation between two rectangles, `t` in `[0, 1]`.
    pub fn lerp(&self, to: &Rect, t: f64) -> Rect {
        let t = t.clamp(0.0, 1.0);
        Rect::new(
            self.x0 + (to.x0 - self.x0) * t,
            self.y0 + (to.y0 - self.y0) * t,
            self.x1 + (to.x1 - self.x1) * t,
            self.y1 + (to.y1 - self.y1) * t,
        )
    }

    /// Scales the rectangle about its centre.
    pub fn scale_about_center(&self, factor: f64) -> Rect {
        let c = self.center();
        let hw = self.width() * 0.5 * factor;
        let hh = self.height() * 0.5 * factor;
        Rect::new(c.x - hw, c.y - hh, c.x + hw, c.y + hh)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Leaf { value: f64 },
    Internal { children: Vec<NodeId> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: NodeId,
    /// Non-owning back reference, used for upward lookups only.
    pub parent: Option<NodeId>,
    pub name: String,
    pub kind: NodeKind,
    pub aggregate: f64,
    pub depth: u32,
}

impl HierarchyNode {
    pub fn raw_value(&self) -> Option<f64> {
        match self.kind {
            NodeKind::Leaf { value } => Some(value),
            NodeKind::Internal { .. } => None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Leaf { .. } => &[],
            NodeKind::Internal { children } => children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }
}

/// An immutable hierarchy over the (filtered) item set.
///
/// Nodes live in an arena indexed by [`NodeId`]; parents always precede
/// their children, so a reverse scan visits children before parents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub generation: u64,
    pub root: NodeId,
    pub nodes: Vec<HierarchyNode>,
}

impl Tree {
    pub fn get(&self, id: NodeId) -> Option<&HierarchyNode> {
        self.nodes.get(id.index())
    }

    pub fn root_node(&self) -> &HierarchyNode {
        &self.nodes[self.root.index()]
    }

    pub fn total(&self) -> f64 {
        self.root_node().aggregate
    }

    /// True when there is nothing to lay out.
    pub fn is_empty(&self) -> bool {
        self.root_node().children().is_empty()
    }

    pub fn node_ref(&self, id: NodeId) -> NodeRef {
        NodeRef {
            generation: self.generation,
            id,
        }
    }

    /// Resolves a handle against this tree; stale or foreign handles yield `None`.
    pub fn resolve(&self, node: NodeRef) -> Option<&HierarchyNode> {
        if node.generation != self.generation {
            return None;
        }
        self.get(node.id)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &HierarchyNode> + '_ {
        self.get(id)
            .map(HierarchyNode::children)
            .unwrap_or(&[])
            .iter()
            .map(move |c| &self.nodes[c.index()])
    }

    /// Leaves below `id` in depth-first, sorted-children order.
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(node) = self.get(cur) else { continue };
            if node.is_leaf() {
                out.push(cur);
            } else {
                stack.extend(node.children().iter().rev().copied());
            }
        }
        out
    }

    /// Names from the root (exclusive) down to `id` (inclusive).
    pub fn path_of(&self, id: NodeId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut cur = self.get(id);
        while let Some(node) = cur {
            let Some(parent) = node.parent else { break };
            path.push(node.name.as_str());
            cur = self.get(parent);
        }
        path.reverse();
        path
    }

    /// Follows a name path from the root; the first matching child wins.
    pub fn find_path<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
        let mut cur = self.root;
        for name in path {
            cur = self
                .children(cur)
                .find(|c| c.name == name.as_ref())
                .map(|c| c.id)?;
        }
        Some(cur)
    }

    pub fn is_ancestor(&self, ancestor: NodeId, of: NodeId) -> bool {
        let mut cur = self.get(of).and_then(|n| n.parent);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    pub fn max_leaf_value(&self, below: NodeId) -> f64 {
        self.leaves(below)
            .into_iter()
            .filter_map(|id| self.get(id).and_then(HierarchyNode::raw_value))
            .fold(0.0, f64::max)
    }
}
