use proptest::prelude::*;
use treezoom_core::hierarchy::build;
use treezoom_core::treemap::{layout, Padding};
use treezoom_core::{sanitize_value, Item, NodeKind};

fn flat(values: &[f64]) -> Vec<Item> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| Item::new(format!("item{i}"), *v))
        .collect()
}

fn nested(values: &[f64]) -> Vec<Item> {
    values
        .chunks(3)
        .enumerate()
        .map(|(i, chunk)| Item::group(format!("group{i}"), flat(chunk)))
        .collect()
}

proptest! {
    #[test]
    fn prop_aggregates_are_conserved(values in prop::collection::vec(-10.0f64..1000.0, 0..60)) {
        let tree = build(&nested(&values));
        let expected: f64 = values.iter().copied().map(sanitize_value).sum();
        prop_assert!((tree.total() - expected).abs() < 1e-6 * expected.max(1.0));
        for node in &tree.nodes {
            if let NodeKind::Internal { children } = &node.kind {
                let sum: f64 = children.iter().map(|c| tree.nodes[c.index()].aggregate).sum();
                prop_assert!((node.aggregate - sum).abs() < 1e-6 * sum.max(1.0));
            }
        }
    }

    #[test]
    fn prop_flat_leaves_tile_the_canvas(
        values in prop::collection::vec(0.1f64..1000.0, 1..40),
        w in 10u32..800,
        h in 10u32..800,
    ) {
        let tree = build(&flat(&values));
        let l = layout(&tree, w as f64, h as f64, Padding::ZERO);
        let rects: Vec<_> = tree.leaves(tree.root).into_iter().map(|id| l.rect(id).unwrap()).collect();
        let covered: f64 = rects.iter().map(|r| r.area()).sum();
        prop_assert!((covered - (w * h) as f64).abs() < 1e-6);
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                prop_assert_eq!(a.intersection_area(b), 0.0);
            }
        }
    }

    #[test]
    fn prop_nested_leaves_tile_each_padded_group(
        values in prop::collection::vec(0.0f64..1000.0, 1..40),
        w in 10u32..800,
        h in 10u32..800,
        outer in 0.0f64..6.0,
    ) {
        let tree = build(&nested(&values));
        let l = layout(&tree, w as f64, h as f64, Padding { outer, inner: 0.0 });
        let root = tree.get(tree.root).unwrap();

        // Groups keep full precision and fill the padded canvas.
        let content = l.rect(tree.root).unwrap().inset(outer);
        let groups: Vec<_> = root.children().iter().map(|id| l.rect(*id).unwrap()).collect();
        if root.aggregate > 0.0 {
            let covered: f64 = groups.iter().map(|r| r.area()).sum();
            prop_assert!((covered - content.area()).abs() <= 1e-6 * content.area().max(1.0));
        }
        for (i, a) in groups.iter().enumerate() {
            prop_assert!((a.intersection_area(&content) - a.area()).abs() <= 1e-6);
            for b in &groups[i + 1..] {
                prop_assert!(a.intersection_area(b) <= 1e-9);
            }
        }

        // Leaves are rounded, so they tile the rounded padded group exactly.
        for group in root.children() {
            let node = tree.get(*group).unwrap();
            if node.aggregate <= 0.0 {
                continue;
            }
            let inner = l.rect(*group).unwrap().inset(outer).round();
            let leaves: Vec<_> = node.children().iter().map(|id| l.rect(*id).unwrap()).collect();
            let covered: f64 = leaves.iter().map(|r| r.area()).sum();
            prop_assert!((covered - inner.area()).abs() < 1e-6,
                "{}: leaves cover {} of {}", node.name, covered, inner.area());
            for (i, a) in leaves.iter().enumerate() {
                prop_assert_eq!(a.intersection_area(&inner), a.area());
                for b in &leaves[i + 1..] {
                    prop_assert_eq!(a.intersection_area(b), 0.0);
                }
            }
        }
    }

    #[test]
    fn prop_leaf_area_is_proportional(
        values in prop::collection::vec(0.1f64..1000.0, 1..40),
        w in 10u32..800,
        h in 10u32..800,
    ) {
        let tree = build(&flat(&values));
        let l = layout(&tree, w as f64, h as f64, Padding::ZERO);
        let canvas = (w * h) as f64;
        for id in tree.leaves(tree.root) {
            let node = tree.get(id).unwrap();
            let r = l.rect(id).unwrap();
            let expected = node.aggregate / tree.total() * canvas;
            // One pixel of rounding per edge.
            let tolerance = r.width() + r.height() + 1.0 + 1e-6;
            prop_assert!((r.area() - expected).abs() <= tolerance,
                "{}: area {} expected {}", node.name, r.area(), expected);
        }
    }

    #[test]
    fn prop_layout_is_deterministic(
        values in prop::collection::vec(0.0f64..1000.0, 0..60),
        w in 1.0f64..1000.0,
        h in 1.0f64..1000.0,
        outer in 0.0f64..6.0,
    ) {
        let tree = build(&nested(&values));
        let padding = Padding { outer, inner: 1.0 };
        prop_assert_eq!(layout(&tree, w, h, padding), layout(&tree, w, h, padding));
    }
}
