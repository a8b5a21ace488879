use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::*;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

const ROOT_NAME: &str = "root";

/// Builds a fresh tree over `items` under a synthetic root.
///
/// Values are clamped to zero when negative or non-finite. Aggregates are
/// summed bottom-up and every node's children are sorted by aggregate,
/// largest first; equal aggregates keep their input order.
pub fn build(items: &[Item]) -> Tree {
    let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
    let mut nodes: Vec<HierarchyNode> = Vec::with_capacity(leaf_count(items) + 1);
    let mut clamped = 0usize;

    nodes.push(HierarchyNode {
        id: NodeId(0),
        parent: None,
        name: ROOT_NAME.to_string(),
        kind: NodeKind::Internal {
            children: Vec::new(),
        },
        aggregate: 0.0,
        depth: 0,
    });

    fn push(
        item: &Item,
        parent: NodeId,
        depth: u32,
        nodes: &mut Vec<HierarchyNode>,
        clamped: &mut usize,
    ) {
        let id = NodeId(nodes.len() as u64);
        let kind = if item.is_group() {
            NodeKind::Internal {
                children: Vec::with_capacity(item.children.len()),
            }
        } else {
            let value = sanitize_value(item.value);
            if value != item.value {
                *clamped += 1;
            }
            NodeKind::Leaf { value }
        };
        nodes.push(HierarchyNode {
            id,
            parent: Some(parent),
            name: item.name.clone(),
            kind,
            aggregate: 0.0,
            depth,
        });
        if let NodeKind::Internal { children } = &mut nodes[parent.index()].kind {
            children.push(id);
        }
        for child in &item.children {
            push(child, id, depth + 1, nodes, clamped);
        }
    }

    for item in items {
        push(item, NodeId(0), 1, &mut nodes, &mut clamped);
    }

    if clamped > 0 {
        tracing::warn!(clamped, "clamped negative or non-finite item values to zero");
    }

    aggregate(&mut nodes);
    sort_children(&mut nodes);

    let tree = Tree {
        generation,
        root: NodeId(0),
        nodes,
    };
    tracing::debug!(
        generation,
        nodes = tree.nodes.len(),
        total = tree.total(),
        "built hierarchy"
    );
    tree
}

// Children always have higher indices than their parent.
fn aggregate(nodes: &mut [HierarchyNode]) {
    for i in (0..nodes.len()).rev() {
        let total = match &nodes[i].kind {
            NodeKind::Leaf { value } => *value,
            NodeKind::Internal { children } => {
                children.iter().map(|c| nodes[c.index()].aggregate).sum()
            }
        };
        nodes[i].aggregate = total;
    }
}

fn sort_children(nodes: &mut [HierarchyNode]) {
    for i in 0..nodes.len() {
        let mut children = match &mut nodes[i].kind {
            NodeKind::Internal { children } if children.len() > 1 => std::mem::take(children),
            _ => continue,
        };
        // `sort_by` is stable, which keeps ties in input order.
        children.sort_by(|a, b| {
            nodes[b.index()]
                .aggregate
                .total_cmp(&nodes[a.index()].aggregate)
        });
        if let NodeKind::Internal { children: slot } = &mut nodes[i].kind {
            *slot = children;
        }
    }
}
