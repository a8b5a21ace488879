use serde::{Deserialize, Serialize};

use crate::model::*;

/// Navigation state: the zoomed node plus the views visited before it.
///
/// `current == None` with an empty stack is the root view.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoomState {
    pub current: Option<NodeRef>,
    /// Last element is the most recently visited view.
    pub previous: Vec<NodeRef>,
}

impl ZoomState {
    pub fn is_root(&self) -> bool {
        self.current.is_none() && self.previous.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ZoomController {
    state: ZoomState,
}

impl ZoomController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ZoomState {
        &self.state
    }

    pub fn current(&self) -> Option<NodeRef> {
        self.state.current
    }

    /// Zooms into `node`. Leaves zoom to their parent when they have
    /// siblings; anything else that cannot be shown is ignored.
    /// Returns whether the state changed.
    pub fn zoom_in(&mut self, tree: &Tree, node: NodeRef) -> bool {
        self.drop_stale(tree);
        let Some(target) = resolve_target(tree, node) else {
            return false;
        };
        self.push(tree, target)
    }

    /// Backs out one level, or to the root view when the stack is empty.
    pub fn zoom_out(&mut self, tree: &Tree) -> bool {
        self.drop_stale(tree);
        if self.state.is_root() {
            return false;
        }
        self.state.current = self.state.previous.pop();
        true
    }

    pub fn zoom_reset(&mut self) -> bool {
        if self.state.is_root() {
            return false;
        }
        self.state = ZoomState::default();
        true
    }

    /// Clicking the zoomed view's own target backs out one level; anything
    /// else zooms in.
    pub fn toggle_node(&mut self, tree: &Tree, node: NodeRef) -> bool {
        self.drop_stale(tree);
        let Some(target) = resolve_target(tree, node) else {
            return false;
        };
        if Some(tree.node_ref(target)) == self.state.current {
            self.zoom_out(tree)
        } else {
            self.push(tree, target)
        }
    }

    /// Jumps to the view at `index` of the back stack, discarding the
    /// history after it. `index == previous.len()` names the current view.
    pub fn jump_to_breadcrumb(&mut self, index: usize) -> bool {
        let depth = self.state.previous.len();
        if index >= depth {
            if index > depth {
                tracing::warn!(index, depth, "breadcrumb index out of range");
            }
            return false;
        }
        self.state.current = Some(self.state.previous[index]);
        self.state.previous.truncate(index);
        true
    }

    /// Clears the state. Used when the data is replaced wholesale.
    pub fn clear(&mut self) {
        self.state = ZoomState::default();
    }

    /// Carries the navigation state over to a rebuilt tree by matching name
    /// paths. Views that no longer exist are dropped; if the zoomed view
    /// itself is gone the state resets to the root view.
    pub fn rebase(&mut self, old: &Tree, new: &Tree) {
        let map = |node: NodeRef| -> Option<NodeRef> {
            old.resolve(node)?;
            let path = old.path_of(node.id);
            let id = new.find_path(path.as_slice())?;
            let n = new.get(id)?;
            (!n.is_leaf() && n.aggregate > 0.0).then(|| new.node_ref(id))
        };
        let Some(current) = self.state.current.and_then(map) else {
            if !self.state.is_root() {
                tracing::debug!("zoomed view vanished after rebuild, resetting");
            }
            self.clear();
            return;
        };
        let mut previous: Vec<NodeRef> = self.state.previous.iter().copied().filter_map(map).collect();
        previous.dedup();
        self.state = ZoomState {
            current: Some(current),
            previous,
        };
    }

    fn push(&mut self, tree: &Tree, target: NodeId) -> bool {
        // The root view already shows the tree root.
        if self.state.current.is_none() && target == tree.root {
            return false;
        }
        let target = tree.node_ref(target);
        if let Some(current) = self.state.current.take() {
            self.state.previous.push(current);
        }
        self.state.current = Some(target);
        true
    }

    // A stale reference is treated as a reset, never as an error.
    fn drop_stale(&mut self, tree: &Tree) {
        let stale = self
            .state
            .current
            .iter()
            .chain(self.state.previous.iter())
            .any(|n| tree.resolve(*n).is_none());
        if stale {
            tracing::warn!("zoom state refers to a previous tree, resetting to root");
            self.clear();
        }
    }
}

/// Maps a clicked node to the node the view should zoom to.
///
/// Internal nodes with a positive aggregate zoom to themselves. A leaf zooms
/// to its parent if it has siblings. Zooming to the tree root only makes
/// sense from inside a zoomed view, which callers handle by comparing
/// against the current state; from the root view it is a no-op.
pub fn resolve_target(tree: &Tree, node: NodeRef) -> Option<NodeId> {
    let Some(n) = tree.resolve(node) else {
        tracing::warn!(?node, "zoom target is not part of the current tree");
        return None;
    };
    let target = if n.is_leaf() || n.children().is_empty() {
        let parent = tree.get(n.parent?)?;
        if parent.children().len() < 2 {
            return None;
        }
        parent
    } else {
        n
    };
    if target.aggregate <= 0.0 {
        return None;
    }
    Some(target.id)
}

/// Uniform scale plus translation that magnifies a node's rectangle to fill
/// the canvas, aligned to the top-left corner. Leftover space on the longer
/// axis is left empty rather than stretching cells.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoomTransform {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ZoomTransform {
    pub const IDENTITY: ZoomTransform = ZoomTransform {
        scale: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// `None` when either rectangle is degenerate.
    pub fn fit(node: Rect, canvas: Size) -> Option<Self> {
        if node.size().is_degenerate() || canvas.is_degenerate() {
            return None;
        }
        let scale = (canvas.width / node.width()).min(canvas.height / node.height());
        Some(Self {
            scale,
            tx: -node.x0 * scale,
            ty: -node.y0 * scale,
        })
    }

    pub fn apply_point(&self, p: Point) -> Point {
        Point::new(p.x * self.scale + self.tx, p.y * self.scale + self.ty)
    }

    pub fn apply(&self, r: Rect) -> Rect {
        let a = self.apply_point(r.origin());
        let b = self.apply_point(Point::new(r.x1, r.y1));
        Rect::new(a.x, a.y, b.x, b.y)
    }

    pub fn invert_point(&self, p: Point) -> Point {
        Point::new((p.x - self.tx) / self.scale, (p.y - self.ty) / self.scale)
    }
}
