//! Benchmarks for tree layout.
//!
//! Run with: cargo bench -p rrbvis-layout

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rrbvis_layout::{LayoutConfig, LayoutTree, NodeShape, layout};
use std::hint::black_box;

/// A fully expanded tree of the given depth with `B` children everywhere.
fn full_tree(depth: usize, branching: usize) -> LayoutTree {
    let mut tree = LayoutTree::new();
    let root_shape = if depth == 0 {
        NodeShape::Leaf
    } else {
        NodeShape::Branch
    };
    let root = tree.push_root(root_shape, branching);
    let mut frontier = vec![(root, depth)];
    while let Some((id, level)) = frontier.pop() {
        for _ in 0..branching {
            if level == 0 {
                tree.add_child(id, NodeShape::Value, 1);
            } else {
                let shape = if level == 1 {
                    NodeShape::Leaf
                } else {
                    NodeShape::Branch
                };
                let child = tree.add_child(id, shape, branching);
                frontier.push((child, level - 1));
            }
        }
        if level > 0 {
            tree.add_child(id, NodeShape::SizeTable, branching);
        }
    }
    tree
}

/// The shape produced by the expansion policy: one expanded spine.
fn spine_tree(depth: usize, branching: usize) -> LayoutTree {
    let mut tree = LayoutTree::new();
    let mut current = tree.push_root(NodeShape::Branch, branching);
    for level in (0..depth).rev() {
        let mut last = current;
        for _ in 0..branching {
            let shape = if level == 0 {
                NodeShape::Leaf
            } else {
                NodeShape::Branch
            };
            last = tree.add_child(current, shape, branching);
        }
        current = last;
    }
    for _ in 0..branching {
        tree.add_child(current, NodeShape::Value, 1);
    }
    tree
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/tidy");
    let config = LayoutConfig::default();

    for depth in [2usize, 4, 6] {
        let tree = full_tree(depth, 4);
        group.bench_with_input(
            BenchmarkId::new("full", format!("d{depth}_n{}", tree.len())),
            &tree,
            |b, tree| b.iter(|| black_box(layout(tree, &config))),
        );

        let spine = spine_tree(depth, 4);
        group.bench_with_input(
            BenchmarkId::new("spine", format!("d{depth}_n{}", spine.len())),
            &spine,
            |b, tree| b.iter(|| black_box(layout(tree, &config))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_layout);
criterion_main!(benches);
