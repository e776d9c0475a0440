#![forbid(unsafe_code)]

//! View tree: the normalized snapshot plus per-node display state.
//!
//! Every node of the snapshot is kept (collapsed nodes cache their
//! children); leaf values become terminal [`ViewKind::Value`] nodes. Display
//! state survives snapshot changes by key, so a node that still exists after
//! a mutation moves from where it was drawn last.

use std::collections::HashMap;

use rrbvis_core::geometry::Point;

use crate::color::Color;
use crate::expansion::Expansion;
use crate::snapshot::{Snapshot, TreeNode};

pub type ViewId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewKind {
    Dense,
    Relaxed { sizes: Vec<u64> },
    Leaf { values: Vec<String> },
    SizeTable { sizes: Vec<u64> },
    Value { label: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub key: String,
    pub kind: ViewKind,
    /// Physical address; `None` for values.
    pub address: Option<u64>,
    pub length: usize,
    pub refs: usize,
    /// Cached children, whether or not they are shown.
    pub children: Vec<ViewId>,
    pub parent: Option<ViewId>,
    /// Cell of the parent array this node hangs from.
    pub slot: usize,
    /// Number of cells drawn for the node's own array.
    pub cells: usize,
    pub expanded: bool,
    /// Vector index of the first element below this node.
    pub element_offset: usize,
    pub position: Point,
    pub previous_position: Point,
    pub color: Option<Color>,
}

impl ViewNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, ViewKind::Leaf { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewTree {
    nodes: Vec<ViewNode>,
    index: HashMap<String, ViewId>,
    tail: Vec<String>,
    tail_offset: usize,
}

impl ViewTree {
    /// Build the full view tree, everything collapsed.
    pub fn build(snapshot: &Snapshot) -> Self {
        let mut tree = ViewTree {
            tail: snapshot.tail.clone(),
            tail_offset: snapshot.root_len,
            ..ViewTree::default()
        };
        if let Some(root) = &snapshot.root {
            tree.insert(root, None, 0, 0);
        }
        tree
    }

    fn insert(
        &mut self,
        node: &TreeNode,
        parent: Option<ViewId>,
        slot: usize,
        element_offset: usize,
    ) -> ViewId {
        let meta = *node.meta();
        let kind = match node {
            TreeNode::Leaf { values, .. } => ViewKind::Leaf {
                values: values.clone(),
            },
            TreeNode::DenseBranch { .. } => ViewKind::Dense,
            TreeNode::RelaxedBranch { sizes, .. } => ViewKind::Relaxed {
                sizes: sizes.clone(),
            },
            TreeNode::SizeTable { sizes, .. } => ViewKind::SizeTable {
                sizes: sizes.clone(),
            },
        };
        let id = self.push(ViewNode {
            key: node.key(),
            kind,
            address: Some(meta.address),
            length: meta.length,
            refs: meta.refs,
            children: Vec::new(),
            parent,
            slot,
            cells: node.cells(),
            expanded: false,
            element_offset,
            position: Point::ZERO,
            previous_position: Point::ZERO,
            color: None,
        });

        let mut offset = element_offset;
        let mut real = 0;
        for child in node.children() {
            let child_slot = if child.is_size_table() { 0 } else { real };
            let child_id = self.insert(child, Some(id), child_slot, offset);
            self.nodes[id].children.push(child_id);
            if !child.is_size_table() {
                offset += child.length();
                real += 1;
            }
        }

        if let TreeNode::Leaf { values, .. } = node {
            for (i, value) in values.iter().enumerate() {
                let child_id = self.push(ViewNode {
                    key: format!("{}#{i}", meta.key()),
                    kind: ViewKind::Value {
                        label: value.clone(),
                    },
                    address: None,
                    length: 1,
                    refs: 1,
                    children: Vec::new(),
                    parent: Some(id),
                    slot: i,
                    cells: 1,
                    expanded: false,
                    element_offset: element_offset + i,
                    position: Point::ZERO,
                    previous_position: Point::ZERO,
                    color: None,
                });
                self.nodes[id].children.push(child_id);
            }
        }
        id
    }

    fn push(&mut self, node: ViewNode) -> ViewId {
        let id = self.nodes.len();
        self.index.entry(node.key.clone()).or_insert(id);
        self.nodes.push(node);
        id
    }

    /// Open exactly the nodes the expansion policy selected.
    pub fn apply(&mut self, expansion: &Expansion) {
        for node in &mut self.nodes {
            node.expanded = expansion.is_expanded(&node.key);
        }
    }

    /// Take over display state from the previous tree by key.
    ///
    /// A replaced root inherits the old root's last position so the whole
    /// diagram grows out of the same point.
    pub fn carry_positions(&mut self, previous: &ViewTree) {
        for node in &mut self.nodes {
            if let Some(old) = previous.get(&node.key) {
                node.position = old.position;
                node.previous_position = old.position;
            }
        }
        if let (Some(root), Some(old_root)) = (self.nodes.first_mut(), previous.nodes.first())
            && !previous.index.contains_key(&root.key)
        {
            root.position = old_root.position;
            root.previous_position = old_root.position;
        }
    }

    /// Flip a node's children visibility. `None` for unknown keys and
    /// terminal nodes.
    pub fn toggle(&mut self, key: &str) -> Option<bool> {
        let id = *self.index.get(key)?;
        let node = &mut self.nodes[id];
        if node.children.is_empty() {
            return None;
        }
        node.expanded = !node.expanded;
        Some(node.expanded)
    }

    /// Nodes on screen, parents before children.
    pub fn visible(&self) -> Vec<ViewId> {
        let mut out = Vec::new();
        let mut stack: Vec<ViewId> = self.root().into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            let node = &self.nodes[id];
            if node.expanded {
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Record the positions just rendered as the start of the next pass.
    pub fn stamp_positions(&mut self) {
        for node in &mut self.nodes {
            node.previous_position = node.position;
        }
    }

    pub fn root(&self) -> Option<ViewId> {
        if self.nodes.is_empty() { None } else { Some(0) }
    }

    pub fn node(&self, id: ViewId) -> Option<&ViewNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: ViewId) -> Option<&mut ViewNode> {
        self.nodes.get_mut(id)
    }

    pub fn id_of(&self, key: &str) -> Option<ViewId> {
        self.index.get(key).copied()
    }

    pub fn get(&self, key: &str) -> Option<&ViewNode> {
        self.id_of(key).and_then(|id| self.nodes.get(id))
    }

    pub fn tail(&self) -> &[String] {
        &self.tail
    }

    /// Vector index of the first tail element.
    pub fn tail_offset(&self) -> usize {
        self.tail_offset
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ViewId, &ViewNode)> {
        self.nodes.iter().enumerate()
    }
}
