#![forbid(unsafe_code)]

//! In-process vector store.
//!
//! Nodes are hash-consed: building a node with the same content as an
//! existing one returns the existing address. Rebuilding a vector after a
//! resize therefore keeps every untouched sub-tree at its old address, which
//! is what lets the diagram animate only what changed.
//!
//! Element values come from a store-wide counter, so no two vectors ever
//! hold the same element and leaves are never shared by accident.
//!
//! Interned nodes are never freed; the store is meant for demos and tests.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use super::{VectorId, VectorStore};
use crate::error::StoreError;
use crate::snapshot::{RawNode, RawSnapshot, RawTree};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Shape {
    Leaf(Vec<u64>),
    Dense(Vec<u64>),
    Relaxed(Vec<u64>),
}

#[derive(Debug, Clone)]
struct StoredNode {
    shape: Shape,
    len: usize,
    /// Indexable by radix alone.
    dense: bool,
}

#[derive(Debug, Clone, Default)]
struct Vector {
    root: Option<u64>,
    /// Levels above the leaves; 0 when the root is a leaf.
    height: usize,
    tail: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    branching_factor: usize,
    /// Address `a` lives at index `a - 1`.
    nodes: Vec<StoredNode>,
    interned: HashMap<Shape, u64>,
    vectors: BTreeMap<u64, Vector>,
    next_vector: u64,
    next_value: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(4)
    }
}

impl MemoryStore {
    /// A store whose trees use `branching_factor` (clamped to at least 2).
    pub fn new(branching_factor: usize) -> Self {
        Self {
            branching_factor: branching_factor.max(2),
            nodes: Vec::new(),
            interned: HashMap::new(),
            vectors: BTreeMap::new(),
            next_vector: 0,
            next_value: 0,
        }
    }

    pub fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    /// Every element of `id`, in order.
    pub fn elements(&self, id: VectorId) -> Result<Vec<u64>, StoreError> {
        let vector = self.vector(id)?;
        Ok(self.collect(vector))
    }

    fn vector(&self, id: VectorId) -> Result<&Vector, StoreError> {
        self.vectors
            .get(&id.0)
            .ok_or_else(|| StoreError::InvalidOperand(format!("unknown vector {id}")))
    }

    fn node(&self, address: u64) -> &StoredNode {
        &self.nodes[(address - 1) as usize]
    }

    fn children(&self, address: u64) -> Vec<u64> {
        match &self.node(address).shape {
            Shape::Dense(children) | Shape::Relaxed(children) => children.clone(),
            Shape::Leaf(_) => Vec::new(),
        }
    }

    fn intern(&mut self, shape: Shape) -> u64 {
        if let Some(&address) = self.interned.get(&shape) {
            return address;
        }
        let (len, dense) = match &shape {
            Shape::Leaf(values) => (values.len(), true),
            Shape::Dense(children) => (children.iter().map(|&c| self.node(c).len).sum(), true),
            Shape::Relaxed(children) => (children.iter().map(|&c| self.node(c).len).sum(), false),
        };
        self.nodes.push(StoredNode {
            shape: shape.clone(),
            len,
            dense,
        });
        let address = self.nodes.len() as u64;
        self.interned.insert(shape, address);
        address
    }

    /// Elements a node at `height` holds when full.
    fn capacity(&self, height: usize) -> usize {
        self.branching_factor.saturating_pow(height as u32 + 1)
    }

    /// Branch at `height` over `children`, relaxed unless radix indexing works.
    fn branch(&mut self, children: Vec<u64>, height: usize) -> u64 {
        let full = self.capacity(height - 1);
        let last = children.len().saturating_sub(1);
        let dense = children.iter().enumerate().all(|(i, &c)| {
            let node = self.node(c);
            node.dense && (i == last || node.len == full)
        });
        if dense {
            self.intern(Shape::Dense(children))
        } else {
            self.intern(Shape::Relaxed(children))
        }
    }

    fn build_dense(&mut self, values: &[u64]) -> (Option<u64>, usize) {
        if values.is_empty() {
            return (None, 0);
        }
        let b = self.branching_factor;
        let mut level: Vec<u64> = values
            .chunks(b)
            .map(|chunk| self.intern(Shape::Leaf(chunk.to_vec())))
            .collect();
        let mut height = 0;
        while level.len() > 1 {
            height += 1;
            level = level
                .chunks(b)
                .map(|chunk| self.branch(chunk.to_vec(), height))
                .collect();
        }
        (level.first().copied(), height)
    }

    fn from_elements(&mut self, values: &[u64]) -> Vector {
        let tail_len = if values.is_empty() {
            0
        } else {
            (values.len() - 1) % self.branching_factor + 1
        };
        let (tree, tail) = values.split_at(values.len() - tail_len);
        let (root, height) = self.build_dense(tree);
        Vector {
            root,
            height,
            tail: tail.to_vec(),
        }
    }

    fn collect(&self, vector: &Vector) -> Vec<u64> {
        let mut out = Vec::new();
        let mut stack: Vec<u64> = vector.root.into_iter().collect();
        while let Some(address) = stack.pop() {
            match &self.node(address).shape {
                Shape::Leaf(values) => out.extend_from_slice(values),
                Shape::Dense(children) | Shape::Relaxed(children) => {
                    stack.extend(children.iter().rev());
                }
            }
        }
        out.extend_from_slice(&vector.tail);
        out
    }

    fn fresh_values(&mut self, count: usize) -> Vec<u64> {
        let start = self.next_value;
        self.next_value += count as u64;
        (start..self.next_value).collect()
    }

    fn tree_len(&self, vector: &Vector) -> usize {
        vector.root.map_or(0, |root| self.node(root).len)
    }

    /// Single-child branches from `leaf` up to `height`.
    fn path(&mut self, leaf: u64, height: usize) -> u64 {
        let mut node = leaf;
        for h in 1..=height {
            node = self.branch(vec![node], h);
        }
        node
    }

    /// Copy the right spine of `node` with `leaf` appended, if there is room.
    fn push_right(&mut self, node: u64, height: usize, leaf: u64) -> Option<u64> {
        let children = self.children(node);
        if height > 1
            && let Some(&last) = children.last()
            && let Some(new_last) = self.push_right(last, height - 1, leaf)
        {
            let mut next = children;
            if let Some(slot) = next.last_mut() {
                *slot = new_last;
            }
            return Some(self.branch(next, height));
        }
        if children.len() < self.branching_factor {
            let mut next = children;
            next.push(self.path(leaf, height - 1));
            return Some(self.branch(next, height));
        }
        None
    }

    fn append_leaf(&mut self, root: Option<u64>, height: usize, leaf: u64) -> (u64, usize) {
        let Some(root) = root else {
            return (leaf, 0);
        };
        if height == 0 {
            return (self.branch(vec![root, leaf], 1), 1);
        }
        match self.push_right(root, height, leaf) {
            Some(new_root) => (new_root, height),
            None => {
                let path = self.path(leaf, height);
                (self.branch(vec![root, path], height + 1), height + 1)
            }
        }
    }

    fn lift(&mut self, mut node: u64, from: usize, to: usize) -> u64 {
        for h in from + 1..=to {
            node = self.branch(vec![node], h);
        }
        node
    }

    /// Parent count per node across all live vectors (roots count once per vector).
    fn ref_counts(&self) -> HashMap<u64, usize> {
        let mut counts: HashMap<u64, usize> = HashMap::new();
        let mut seen = HashSet::new();
        for vector in self.vectors.values() {
            let Some(root) = vector.root else {
                continue;
            };
            *counts.entry(root).or_default() += 1;
            let mut stack = vec![root];
            while let Some(address) = stack.pop() {
                if !seen.insert(address) {
                    continue;
                }
                for child in self.children(address) {
                    *counts.entry(child).or_default() += 1;
                    stack.push(child);
                }
            }
        }
        counts
    }

    fn raw_node(&self, address: u64, refs: &HashMap<u64, usize>) -> RawNode {
        let node = self.node(address);
        let b = self.branching_factor;
        let mut raw = RawNode {
            addr: address,
            len: node.len,
            refs: Some(refs.get(&address).copied().unwrap_or(1)),
            ..RawNode::default()
        };
        match &node.shape {
            Shape::Leaf(values) => {
                raw.leaf = Some(values.iter().map(|&v| Value::from(v)).collect());
            }
            Shape::Dense(children) => {
                raw.branch = Some(self.raw_children(children, refs));
            }
            Shape::Relaxed(children) => {
                raw.relaxed_branch = Some(self.raw_children(children, refs));
                let mut total = 0u64;
                let mut sizes: Vec<Option<u64>> = children
                    .iter()
                    .map(|&c| {
                        total += self.node(c).len as u64;
                        Some(total)
                    })
                    .collect();
                sizes.resize(b.max(sizes.len()), None);
                raw.sizes = Some(sizes);
            }
        }
        raw
    }

    fn raw_children(&self, children: &[u64], refs: &HashMap<u64, usize>) -> Vec<Option<RawNode>> {
        let mut out: Vec<Option<RawNode>> = children
            .iter()
            .map(|&c| Some(self.raw_node(c, refs)))
            .collect();
        out.resize(self.branching_factor.max(out.len()), None);
        out
    }
}

impl VectorStore for MemoryStore {
    fn create_vector(&mut self, initial_size: Option<usize>) -> Result<VectorId, StoreError> {
        let values = self.fresh_values(initial_size.unwrap_or(0));
        let vector = self.from_elements(&values);
        let id = self.next_vector;
        self.next_vector += 1;
        self.vectors.insert(id, vector);
        tracing::debug!(vector = id, size = values.len(), "vector created");
        Ok(VectorId(id))
    }

    fn snapshot(&self, id: VectorId) -> Result<RawSnapshot, StoreError> {
        let vector = self.vector(id)?;
        let refs = self.ref_counts();
        let bits = self.branching_factor.trailing_zeros() as usize;
        let mut tail: Vec<Value> = vector.tail.iter().map(|&v| Value::from(v)).collect();
        tail.resize(self.branching_factor.max(tail.len()), Value::Null);
        Ok(RawSnapshot {
            tree: RawTree {
                root: vector.root.map(|root| self.raw_node(root, &refs)),
                root_len: self.tree_len(vector),
                shift: vector.height * bits,
            },
            tail,
            tail_len: Some(vector.tail.len()),
        })
    }

    fn len(&self, id: VectorId) -> Result<usize, StoreError> {
        let vector = self.vector(id)?;
        Ok(self.tree_len(vector) + vector.tail.len())
    }

    fn resize(&mut self, id: VectorId, size: usize) -> Result<(), StoreError> {
        let mut values = self.elements(id)?;
        let before = values.len();
        if size <= before {
            values.truncate(size);
        } else {
            let extra = self.fresh_values(size - before);
            values.extend(extra);
        }
        let vector = self.from_elements(&values);
        self.vectors.insert(id.0, vector);
        tracing::debug!(vector = id.0, from = before, to = size, "vector resized");
        Ok(())
    }

    fn split_at(&mut self, id: VectorId, index: usize) -> Result<VectorId, StoreError> {
        let values = self.elements(id)?;
        if index > values.len() {
            return Err(StoreError::InvalidOperand(format!(
                "split index {index} out of range for {id} of length {}",
                values.len()
            )));
        }
        let (left, right) = values.split_at(index);
        let left = self.from_elements(left);
        let right = self.from_elements(right);
        self.vectors.insert(id.0, left);
        let other = self.next_vector;
        self.next_vector += 1;
        self.vectors.insert(other, right);
        tracing::debug!(vector = id.0, index, other, "vector split");
        Ok(VectorId(other))
    }

    fn concatenate(&mut self, id: VectorId, other: VectorId) -> Result<(), StoreError> {
        if id == other {
            return Err(StoreError::InvalidOperand(format!(
                "cannot concatenate {id} with itself"
            )));
        }
        let a = self.vector(id)?.clone();
        let b = self.vector(other)?.clone();
        self.vectors.remove(&other.0);

        if b.root.is_none() && b.tail.is_empty() {
            return Ok(());
        }
        if a.root.is_none() && a.tail.is_empty() {
            self.vectors.insert(id.0, b);
            return Ok(());
        }

        let (mut root, mut height) = (a.root, a.height);
        if !a.tail.is_empty() {
            let leaf = self.intern(Shape::Leaf(a.tail.clone()));
            let (r, h) = self.append_leaf(root, height, leaf);
            root = Some(r);
            height = h;
        }

        let (root, height) = match (root, b.root) {
            (Some(left), Some(right)) => {
                let h = height.max(b.height);
                let left = self.lift(left, height, h);
                let right = self.lift(right, b.height, h);
                (
                    Some(self.intern(Shape::Relaxed(vec![left, right]))),
                    h + 1,
                )
            }
            (Some(left), None) => (Some(left), height),
            (None, right) => (right, b.height),
        };
        self.vectors.insert(
            id.0,
            Vector {
                root,
                height,
                tail: b.tail,
            },
        );
        tracing::debug!(vector = id.0, other = other.0, "vectors concatenated");
        Ok(())
    }

    fn concatenate_all(&mut self) -> Result<Option<VectorId>, StoreError> {
        let ids = self.vector_ids();
        let Some((&first, rest)) = ids.split_first() else {
            return Ok(None);
        };
        for &other in rest {
            self.concatenate(first, other)?;
        }
        Ok(Some(first))
    }

    fn vector_count(&self) -> usize {
        self.vectors.len()
    }

    fn vector_ids(&self) -> Vec<VectorId> {
        self.vectors.keys().map(|&k| VectorId(k)).collect()
    }
}
