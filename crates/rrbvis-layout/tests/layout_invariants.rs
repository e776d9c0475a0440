//! Property tests for the layout engine.
//!
//! 1. Anchors are symmetric and strictly increasing for every child count.
//! 2. Size tables sit at a fixed offset beside their parent, on its row.
//! 3. Nodes on the same depth never overlap.
//! 4. Every non-root node has exactly one incoming link.
//! 5. The viewport contains every node.

use proptest::prelude::*;
use rrbvis_layout::{AnchorTable, LayoutConfig, LayoutTree, NodeShape, layout};

/// Random tree described as a list of child counts, consumed breadth-first.
fn tree_strategy() -> impl Strategy<Value = LayoutTree> {
    (prop::collection::vec(0usize..=4, 1..40), any::<bool>()).prop_map(|(counts, tables)| {
        let mut tree = LayoutTree::new();
        let root = tree.push_root(NodeShape::Branch, counts[0].max(1));
        let mut queue = std::collections::VecDeque::from([(root, counts[0])]);
        let mut next = 1;
        while let Some((id, count)) = queue.pop_front() {
            for _ in 0..count {
                let grand = counts.get(next).copied().unwrap_or(0);
                next += 1;
                let shape = if grand == 0 {
                    NodeShape::Leaf
                } else {
                    NodeShape::Branch
                };
                let child = tree.add_child(id, shape, grand.max(1));
                if grand > 0 {
                    queue.push_back((child, grand));
                }
            }
            if tables && count > 0 {
                tree.add_child(id, NodeShape::SizeTable, count);
            }
        }
        tree
    })
}

proptest! {
    #[test]
    fn anchors_symmetric_and_increasing(count in 1usize..=32, cw in 1.0f64..64.0) {
        let table = AnchorTable::new(cw, 32);
        let row = table.row(count).unwrap();
        prop_assert_eq!(row.len(), count);
        for i in 0..count {
            prop_assert!((row[i] + row[count - 1 - i]).abs() < 1e-9);
        }
        prop_assert!(row.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn size_tables_pinned_to_parent(tree in tree_strategy()) {
        let config = LayoutConfig::default();
        let out = layout(&tree, &config);
        for id in 0..tree.len() {
            let node = tree.node(id).unwrap();
            if node.shape != NodeShape::SizeTable {
                continue;
            }
            let parent = node.parent.unwrap();
            let p = out.positions[parent];
            let q = out.positions[id];
            prop_assert!((q.x - p.x - config.size_table_offset()).abs() < 1e-9);
            prop_assert!((q.y - p.y).abs() < 1e-9);
        }
    }

    #[test]
    fn same_depth_nodes_do_not_overlap(tree in tree_strategy()) {
        let config = LayoutConfig::default();
        let out = layout(&tree, &config);
        let mut rows: std::collections::BTreeMap<i64, Vec<(f64, f64)>> = Default::default();
        for id in 0..tree.len() {
            let rect = out.rects[id];
            rows.entry(rect.y.round() as i64)
                .or_default()
                .push((rect.left(), rect.right()));
        }
        for spans in rows.values_mut() {
            spans.sort_by(|a, b| a.0.total_cmp(&b.0));
            for pair in spans.windows(2) {
                prop_assert!(
                    pair[0].1 <= pair[1].0 + 1e-6,
                    "overlap: {:?} and {:?}", pair[0], pair[1]
                );
            }
        }
    }

    #[test]
    fn one_link_per_child(tree in tree_strategy()) {
        let out = layout(&tree, &LayoutConfig::default());
        prop_assert_eq!(out.links.len(), tree.len() - 1);
        let mut targets: Vec<usize> = out.links.iter().map(|l| l.target).collect();
        targets.sort_unstable();
        targets.dedup();
        prop_assert_eq!(targets.len(), tree.len() - 1);
    }

    #[test]
    fn viewport_contains_nodes(tree in tree_strategy()) {
        let out = layout(&tree, &LayoutConfig::default());
        for rect in &out.rects {
            prop_assert!(out.viewport.left() <= rect.left() + 1e-9);
            prop_assert!(out.viewport.right() >= rect.right() - 1e-9);
            prop_assert!(out.viewport.top() <= rect.top() + 1e-9);
            prop_assert!(out.viewport.bottom() >= rect.bottom() - 1e-9);
        }
    }
}
