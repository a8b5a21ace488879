use serde::{Deserialize, Serialize};

use crate::model::*;

/// Uniform padding applied during layout and drawing.
///
/// `outer` insets every internal node (the canvas included) before its
/// children are tiled. `inner` is the gap drawn between leaf cells; it does
/// not affect the tiles themselves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Padding {
    pub outer: f64,
    pub inner: f64,
}

impl Padding {
    pub const ZERO: Padding = Padding {
        outer: 0.0,
        inner: 0.0,
    };
}

/// Rectangles assigned to the nodes of one tree, indexed by [`NodeId`].
///
/// Leaf rectangles are rounded to whole pixels; internal rectangles keep
/// full precision so that nested rounding error does not compound.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
    generation: u64,
    bounds: Rect,
    rects: Vec<Option<Rect>>,
}

impl Layout {
    fn empty(tree: &Tree, bounds: Rect) -> Self {
        Self {
            generation: tree.generation,
            bounds,
            rects: vec![None; tree.nodes.len()],
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The rectangle the layout was computed into.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.rects.get(id.index()).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Rect)> + '_ {
        self.rects
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.map(|r| (NodeId(i as u64), r)))
    }

    /// True when no rectangle was produced at all (degenerate canvas).
    pub fn is_empty(&self) -> bool {
        self.rects.iter().all(Option::is_none)
    }
}

/// Squarified layout of the whole tree into a `width` x `height` canvas.
pub fn layout(tree: &Tree, width: f64, height: f64, padding: Padding) -> Layout {
    let size = Size::new(width, height);
    let bounds = Rect::from_origin_size(Point::default(), size);
    if size.is_degenerate() {
        tracing::debug!(width, height, "degenerate canvas, skipping layout");
        return Layout::empty(tree, Rect::default());
    }
    layout_within(tree, tree.root, bounds, padding)
}

/// Squarified layout of the subtree under `root` into `bounds`.
///
/// Pure and deterministic: every node below `root` is visited exactly once.
pub fn layout_within(tree: &Tree, root: NodeId, bounds: Rect, padding: Padding) -> Layout {
    let mut out = Layout::empty(tree, bounds);
    if tree.get(root).is_none() || bounds.size().is_degenerate() {
        return out;
    }

    let mut stack = vec![(root, bounds)];
    while let Some((id, rect)) = stack.pop() {
        let node = &tree.nodes[id.index()];
        if node.is_leaf() {
            out.rects[id.index()] = Some(rect.round());
            continue;
        }
        out.rects[id.index()] = Some(rect);

        if node.aggregate <= 0.0 || rect.is_empty() {
            for child in node.children() {
                stack.push((*child, rect.collapsed()));
            }
            continue;
        }

        let inner = rect.inset(padding.outer);
        let total_area = inner.area();
        let children = node.children();
        // Children are sorted descending, so zero-valued ones form the tail.
        let positive = children
            .iter()
            .take_while(|c| tree.nodes[c.index()].aggregate > 0.0)
            .count();
        let areas: Vec<f64> = children[..positive]
            .iter()
            .map(|c| tree.nodes[c.index()].aggregate / node.aggregate * total_area)
            .collect();

        let tiles = if total_area > 0.0 {
            squarify(&areas, inner)
        } else {
            vec![inner.collapsed(); positive]
        };
        for (child, tile) in children[..positive].iter().zip(tiles) {
            stack.push((*child, tile));
        }
        for child in &children[positive..] {
            stack.push((*child, inner.collapsed()));
        }
    }
    out
}

/// Squarified tiling (Bruls, Huizing, van Wijk) of `areas` into `rect`.
///
/// `areas` must be sorted descending and sum to `rect.area()`. The returned
/// tiles share exact edges and the last tile of every strip is stretched to
/// the strip end, so floating point error never opens a seam.
pub fn squarify(areas: &[f64], rect: Rect) -> Vec<Rect> {
    let mut out = Vec::with_capacity(areas.len());
    let mut remaining = rect;

    let mut row_start = 0usize;
    let mut row_sum = 0.0;
    let mut row_min = f64::INFINITY;
    let mut row_max = 0.0f64;

    let mut idx = 0usize;
    while idx < areas.len() {
        let c = areas[idx];
        let side = remaining.width().min(remaining.height());
        let current = if row_sum > 0.0 {
            worst_aspect_ratio(row_min, row_max, row_sum, side)
        } else {
            f64::INFINITY
        };
        let next = worst_aspect_ratio(row_min.min(c), row_max.max(c), row_sum + c, side);

        if row_sum <= 0.0 || next <= current {
            row_sum += c;
            row_min = row_min.min(c);
            row_max = row_max.max(c);
            idx += 1;
            continue;
        }

        layout_row(&areas[row_start..idx], row_sum, &mut remaining, false, &mut out);
        row_start = idx;
        row_sum = 0.0;
        row_min = f64::INFINITY;
        row_max = 0.0;
    }

    if row_start < areas.len() {
        layout_row(&areas[row_start..], row_sum, &mut remaining, true, &mut out);
    }
    out
}

// Lays one strip along the shorter side of `remaining` and shrinks it.
fn layout_row(row: &[f64], row_sum: f64, remaining: &mut Rect, last: bool, out: &mut Vec<Rect>) {
    let horizontal = remaining.width() <= remaining.height();
    let short = if horizontal {
        remaining.width()
    } else {
        remaining.height()
    };
    let thickness = if short > 0.0 { row_sum / short } else { 0.0 };

    if horizontal {
        let y1 = if last { remaining.y1 } else { (remaining.y0 + thickness).min(remaining.y1) };
        let mut x = remaining.x0;
        for (i, area) in row.iter().enumerate() {
            let x1 = if i + 1 == row.len() {
                remaining.x1
            } else {
                (x + area / thickness).min(remaining.x1)
            };
            out.push(Rect::new(x, remaining.y0, x1, y1));
            x = x1;
        }
        remaining.y0 = y1;
    } else {
        let x1 = if last { remaining.x1 } else { (remaining.x0 + thickness).min(remaining.x1) };
        let mut y = remaining.y0;
        for (i, area) in row.iter().enumerate() {
            let y1 = if i + 1 == row.len() {
                remaining.y1
            } else {
                (y + area / thickness).min(remaining.y1)
            };
            out.push(Rect::new(remaining.x0, y, x1, y1));
            y = y1;
        }
        remaining.x0 = x1;
    }
}

fn worst_aspect_ratio(min_r: f64, max_r: f64, sum: f64, side: f64) -> f64 {
    if sum <= 0.0 || side <= 0.0 || min_r <= 0.0 || max_r <= 0.0 {
        return f64::MAX;
    }
    let side_sq = side * side;
    let sum_sq = sum * sum;
    let a = (side_sq * max_r) / sum_sq;
    let b = sum_sq / (side_sq * min_r);
    a.max(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::build;

    fn leaf_rect(tree: &Tree, layout: &Layout, name: &str) -> Rect {
        let id = tree.find_path(&[name]).unwrap();
        layout.rect(id).unwrap()
    }

    #[test]
    fn single_item_fills_canvas() {
        let tiles = squarify(&[1920.0 * 1080.0], Rect::new(0.0, 0.0, 1920.0, 1080.0));
        assert_eq!(tiles, vec![Rect::new(0.0, 0.0, 1920.0, 1080.0)]);
    }

    #[test]
    fn squarify_preserves_area() {
        let areas = [400.0, 300.0, 200.0, 100.0];
        let tiles = squarify(&areas, Rect::new(0.0, 0.0, 50.0, 20.0));
        let total: f64 = tiles.iter().map(Rect::area).sum();
        assert!((total - 1000.0).abs() < 1e-6);
        for (tile, area) in tiles.iter().zip(areas) {
            assert!((tile.area() - area).abs() < 1e-6);
        }
    }

    #[test]
    fn three_items_on_wide_canvas() {
        let tree = build(&[
            Item::new("A", 50.0),
            Item::new("B", 30.0),
            Item::new("C", 20.0),
        ]);
        let layout = layout(&tree, 200.0, 100.0, Padding::ZERO);
        assert_eq!(leaf_rect(&tree, &layout, "A"), Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(leaf_rect(&tree, &layout, "B"), Rect::new(100.0, 0.0, 200.0, 60.0));
        assert_eq!(leaf_rect(&tree, &layout, "C"), Rect::new(100.0, 60.0, 200.0, 100.0));
    }

    #[test]
    fn outer_padding_insets_children() {
        let tree = build(&[Item::new("A", 1.0)]);
        let layout = layout(&tree, 100.0, 50.0, Padding { outer: 5.0, inner: 0.0 });
        assert_eq!(layout.rect(tree.root), Some(Rect::new(0.0, 0.0, 100.0, 50.0)));
        assert_eq!(leaf_rect(&tree, &layout, "A"), Rect::new(5.0, 5.0, 95.0, 45.0));
    }

    #[test]
    fn zero_values_get_zero_area() {
        let tree = build(&[Item::new("A", 10.0), Item::new("Z", 0.0)]);
        let layout = layout(&tree, 40.0, 40.0, Padding::ZERO);
        assert_eq!(leaf_rect(&tree, &layout, "A"), Rect::new(0.0, 0.0, 40.0, 40.0));
        assert_eq!(leaf_rect(&tree, &layout, "Z").area(), 0.0);
    }

    #[test]
    fn zero_valued_group_is_not_subdivided() {
        let tree = build(&[
            Item::new("A", 10.0),
            Item::group("G", vec![Item::new("g1", 0.0), Item::new("g2", 0.0)]),
        ]);
        let layout = layout(&tree, 40.0, 40.0, Padding::ZERO);
        let g1 = tree.find_path(&["G", "g1"]).unwrap();
        assert_eq!(layout.rect(g1).unwrap().area(), 0.0);
    }

    #[test]
    fn degenerate_canvas_produces_nothing() {
        let tree = build(&[Item::new("A", 1.0)]);
        assert!(layout(&tree, 0.0, 100.0, Padding::ZERO).is_empty());
        assert!(layout(&tree, 100.0, -1.0, Padding::ZERO).is_empty());
        assert!(layout(&tree, f64::NAN, 100.0, Padding::ZERO).is_empty());
    }

    #[test]
    fn empty_tree_has_only_the_root() {
        let tree = build(&[]);
        let layout = layout(&tree, 10.0, 10.0, Padding::ZERO);
        assert_eq!(layout.iter().count(), 1);
    }

    #[test]
    fn nested_children_tile_their_parent() {
        let tree = build(&[
            Item::group("g", vec![Item::new("a", 3.0), Item::new("b", 1.0)]),
            Item::new("c", 4.0),
        ]);
        let layout = layout(&tree, 80.0, 40.0, Padding::ZERO);
        let g = tree.find_path(&["g"]).unwrap();
        let parent = layout.rect(g).unwrap();
        let covered: f64 = tree
            .children(g)
            .map(|c| layout.rect(c.id).unwrap().area())
            .sum();
        assert!((covered - parent.area()).abs() < 1.0);
    }
}
