#![forbid(unsafe_code)]

//! Layout engine for tree diagrams of array nodes.
//!
//! Every node is drawn as a row of cells centred on its position. Branch and
//! leaf arrays are placed with a tidy tree; size tables ride beside their
//! parent; links leave from the cell that holds the child.
//!
//! # Example
//! ```
//! use rrbvis_layout::{layout, LayoutConfig, LayoutTree, NodeShape};
//!
//! let mut tree = LayoutTree::new();
//! let root = tree.push_root(NodeShape::Branch, 2);
//! tree.add_child(root, NodeShape::Leaf, 4);
//! tree.add_child(root, NodeShape::Leaf, 4);
//!
//! let out = layout(&tree, &LayoutConfig::default());
//! assert_eq!(out.positions.len(), 3);
//! assert!(out.positions[1].x < out.positions[2].x);
//! ```

pub mod anchors;
mod tidy;

use std::fmt::Write as _;

pub use anchors::{AnchorTable, anchor_offset};
use rrbvis_core::geometry::{Point, Rect, Sides};

/// Index of a node inside a [`LayoutTree`].
pub type NodeId = usize;

/// Minimum horizontal distance between neighbours, in units of `dx`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    /// Two scalar values of the same leaf.
    pub value_siblings: f64,
    /// Scalar values of different leaves.
    pub value_cousins: f64,
    pub siblings: f64,
    pub cousins: f64,
}

impl Default for Separation {
    fn default() -> Self {
        Self {
            value_siblings: 0.3,
            value_cousins: 0.8,
            siblings: 1.0,
            cousins: 2.0,
        }
    }
}

/// Geometry parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub cell_width: f64,
    pub cell_height: f64,
    pub branching_factor: usize,
    /// Vertical distance between depths (`dy`).
    pub level_spacing: f64,
    pub margin: Sides,
    /// The viewport is never narrower than this.
    pub min_width: f64,
    /// Gap between a branch array and its size table.
    pub size_table_gap: f64,
    /// Top-left corner of the tail array.
    pub tail_origin: Point,
    pub separation: Separation,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            cell_width: 16.0,
            cell_height: 20.0,
            branching_factor: 4,
            level_spacing: 1392.0 / 28.0,
            margin: Sides::new(32.0, 120.0, 42.0, 512.0),
            min_width: 1392.0,
            size_table_gap: 16.0,
            tail_origin: Point::new(-480.0, 0.0),
            separation: Separation::default(),
        }
    }
}

impl LayoutConfig {
    /// Horizontal node size: a full array plus one cell of breathing room.
    pub fn dx(&self) -> f64 {
        self.cell_width * (self.branching_factor as f64 + 1.0)
    }

    /// Distance from a branch centre to its size table centre.
    pub fn size_table_offset(&self) -> f64 {
        self.cell_width * self.branching_factor as f64 + self.size_table_gap
    }
}

/// What a layout node looks like on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeShape {
    Branch,
    Leaf,
    /// Pinned beside its parent instead of taking a tidy slot.
    SizeTable,
    /// A scalar label below a leaf.
    Value,
}

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub shape: NodeShape,
    /// Number of cells drawn for this node.
    pub cells: usize,
    /// Cell in the parent's array this node hangs from.
    pub slot: usize,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

/// Arena-backed input tree. The first pushed node is the root.
#[derive(Debug, Clone, Default)]
pub struct LayoutTree {
    nodes: Vec<LayoutNode>,
    tail_cells: usize,
}

impl LayoutTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the tree. Calling this twice starts a disconnected node that
    /// [`layout`] ignores.
    pub fn push_root(&mut self, shape: NodeShape, cells: usize) -> NodeId {
        self.push(shape, cells, 0, None)
    }

    /// Append a child. Non-size-table children take consecutive slots.
    pub fn add_child(&mut self, parent: NodeId, shape: NodeShape, cells: usize) -> NodeId {
        let slot = self.nodes[parent]
            .children
            .iter()
            .filter(|&&c| self.nodes[c].shape != NodeShape::SizeTable)
            .count();
        self.add_child_at(parent, shape, cells, slot)
    }

    /// Append a child hanging from an explicit slot.
    pub fn add_child_at(
        &mut self,
        parent: NodeId,
        shape: NodeShape,
        cells: usize,
        slot: usize,
    ) -> NodeId {
        let id = self.push(shape, cells, slot, Some(parent));
        self.nodes[parent].children.push(id);
        id
    }

    fn push(
        &mut self,
        shape: NodeShape,
        cells: usize,
        slot: usize,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(LayoutNode {
            shape,
            cells,
            slot,
            children: Vec::new(),
            parent,
        });
        id
    }

    /// Number of cells in the tail array (0 hides it).
    pub fn set_tail(&mut self, cells: usize) {
        self.tail_cells = cells;
    }

    pub fn tail_cells(&self) -> usize {
        self.tail_cells
    }

    pub fn root(&self) -> Option<NodeId> {
        if self.nodes.is_empty() { None } else { Some(0) }
    }

    pub fn node(&self, id: NodeId) -> Option<&LayoutNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// How a link is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Parent cell bottom to child top, as a vertical cubic.
    Vertical,
    /// Parent array right edge to size table left edge.
    Horizontal,
}

impl LinkKind {
    /// SVG path data between two points.
    pub fn path(self, from: Point, to: Point) -> String {
        let mut d = String::new();
        match self {
            LinkKind::Vertical => {
                let my = (from.y + to.y) / 2.0;
                let _ = write!(
                    d,
                    "M{},{}C{},{} {},{} {},{}",
                    num(from.x),
                    num(from.y),
                    num(from.x),
                    num(my),
                    num(to.x),
                    num(my),
                    num(to.x),
                    num(to.y)
                );
            }
            LinkKind::Horizontal => {
                let _ = write!(
                    d,
                    "M{},{}L{},{}",
                    num(from.x),
                    num(from.y),
                    num(to.x),
                    num(to.y)
                );
            }
        }
        d
    }
}

fn num(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkPath {
    pub source: NodeId,
    pub target: NodeId,
    pub from: Point,
    pub to: Point,
    pub kind: LinkKind,
}

impl LinkPath {
    pub fn d(&self) -> String {
        self.kind.path(self.from, self.to)
    }
}

/// Output of [`layout`]. Vectors are indexed by [`NodeId`].
#[derive(Debug, Clone, Default)]
pub struct TreeLayout {
    /// Top centre of each node's array.
    pub positions: Vec<Point>,
    /// Drawn extent of each node.
    pub rects: Vec<Rect>,
    pub links: Vec<LinkPath>,
    /// Union of all node rectangles.
    pub bounds: Rect,
    pub viewport: Rect,
    pub tail: Option<Rect>,
}

impl TreeLayout {
    /// Rectangle of cell `index` in node `id`'s array.
    pub fn cell_rect(&self, id: NodeId, cells: usize, index: usize) -> Option<Rect> {
        let rect = self.rects.get(id)?;
        if index >= cells || cells == 0 {
            return None;
        }
        let width = rect.width / cells as f64;
        Some(Rect::new(
            rect.x + width * index as f64,
            rect.y,
            width,
            rect.height,
        ))
    }
}

fn node_width(shape: NodeShape, cells: usize, config: &LayoutConfig) -> f64 {
    match shape {
        NodeShape::Value => config.cell_width,
        _ => config.cell_width * cells.max(1) as f64,
    }
}

/// Compute positions, links and the viewport for `tree`.
pub fn layout(tree: &LayoutTree, config: &LayoutConfig) -> TreeLayout {
    let span = rrbvis_core::debug_span!("rrbvis.layout", nodes = tree.len());
    let _guard = span.enter();

    let tail = (tree.tail_cells > 0).then(|| {
        Rect::new(
            config.tail_origin.x,
            config.tail_origin.y,
            config.cell_width * tree.tail_cells as f64,
            config.cell_height,
        )
    });

    let Some(root) = tree.root() else {
        return TreeLayout {
            viewport: Rect::new(
                -config.margin.left,
                -config.margin.top,
                config.min_width,
                config.margin.vertical_sum(),
            ),
            tail,
            ..TreeLayout::default()
        };
    };

    let n = tree.len();
    let nodes = &tree.nodes;
    let dx = config.dx();

    // Size tables do not take part in the tidy walk.
    let tidy_children: Vec<Vec<NodeId>> = nodes
        .iter()
        .map(|node| {
            node.children
                .iter()
                .copied()
                .filter(|&c| nodes[c].shape != NodeShape::SizeTable)
                .collect()
        })
        .collect();
    let has_size_table: Vec<bool> = nodes
        .iter()
        .map(|node| {
            node.children
                .iter()
                .any(|&c| nodes[c].shape == NodeShape::SizeTable)
        })
        .collect();
    let size_table_extra = (config.size_table_offset()
        + config.cell_width * config.branching_factor as f64 / 2.0)
        / dx;

    let sep = config.separation;
    let relative = tidy::place(root, &tidy_children, |left, right| {
        let same_parent = nodes[left].parent == nodes[right].parent;
        let values =
            nodes[left].shape == NodeShape::Value && nodes[right].shape == NodeShape::Value;
        let base = match (values, same_parent) {
            (true, true) => sep.value_siblings,
            (true, false) => sep.value_cousins,
            (false, true) => sep.siblings,
            (false, false) => sep.cousins,
        };
        if has_size_table[left] {
            base + size_table_extra
        } else {
            base
        }
    });

    // Depth-first from the root so parents are placed before children.
    let mut positions = vec![Point::ZERO; n];
    let mut placed = vec![false; n];
    let mut stack = vec![(root, 0usize)];
    while let Some((id, depth)) = stack.pop() {
        let node = &nodes[id];
        positions[id] = match (node.shape, node.parent) {
            (NodeShape::SizeTable, Some(parent)) => {
                let p = positions[parent];
                Point::new(p.x + config.size_table_offset(), p.y)
            }
            _ => Point::new(relative[id] * dx, depth as f64 * config.level_spacing),
        };
        placed[id] = true;
        for &child in node.children.iter().rev() {
            let child_depth = if nodes[child].shape == NodeShape::SizeTable {
                depth
            } else {
                depth + 1
            };
            stack.push((child, child_depth));
        }
    }

    let rects: Vec<Rect> = nodes
        .iter()
        .zip(&positions)
        .map(|(node, &p)| {
            Rect::centered_below(
                p,
                node_width(node.shape, node.cells, config),
                config.cell_height,
            )
        })
        .collect();

    let anchors = AnchorTable::new(config.cell_width, config.branching_factor);
    let mut links = Vec::new();
    for (id, node) in nodes.iter().enumerate() {
        let Some(parent) = node.parent else {
            continue;
        };
        if !placed[id] {
            continue;
        }
        let p = positions[parent];
        let parent_rect = rects[parent];
        let link = if node.shape == NodeShape::SizeTable {
            LinkPath {
                source: parent,
                target: id,
                from: Point::new(parent_rect.right(), p.y + config.cell_height / 2.0),
                to: Point::new(rects[id].left(), positions[id].y + config.cell_height / 2.0),
                kind: LinkKind::Horizontal,
            }
        } else {
            let offset = anchors
                .get(nodes[parent].cells, node.slot)
                .unwrap_or(0.0);
            LinkPath {
                source: parent,
                target: id,
                from: Point::new(p.x + offset, parent_rect.bottom()),
                to: positions[id],
                kind: LinkKind::Vertical,
            }
        };
        links.push(link);
    }

    let bounds = rects
        .iter()
        .zip(&placed)
        .filter(|&(_, &ok)| ok)
        .fold(Rect::default(), |acc, (r, _)| acc.union(r));
    let viewport = viewport_for(&bounds, config);

    rrbvis_core::trace!(
        nodes = n,
        links = links.len(),
        width = viewport.width,
        height = viewport.height,
        "layout computed"
    );

    TreeLayout {
        positions,
        rects,
        links,
        bounds,
        viewport,
        tail,
    }
}

/// Viewport `[-margin.left, -margin.top, width, height]`, widened to fit.
fn viewport_for(bounds: &Rect, config: &LayoutConfig) -> Rect {
    let m = config.margin;
    let min_y = bounds.top().min(0.0);
    let max_y = (bounds.bottom() - config.cell_height).max(min_y);
    let height = max_y - min_y + m.top + m.bottom + config.cell_height;

    let left = (-m.left).min(bounds.left() - m.right);
    let right = (left + config.min_width).max(bounds.right() + m.right);
    Rect::new(left, min_y - m.top, right - left, height)
}
