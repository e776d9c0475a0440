#![forbid(unsafe_code)]

//! Tree snapshot adapter.
//!
//! Converts the raw JSON a vector emits into a closed [`TreeNode`] union:
//! holes are dropped, relaxed branches get a trailing size-table child, and
//! structural problems are reported before anything is drawn.
//!
//! ```json
//! {
//!   "tree": {
//!     "root_len": 6, "shift": 2,
//!     "root": { "relaxedBranch": [ {..}, {..}, null, null ],
//!               "sizes": [4, 6], "addr": 17, "len": 6, "refs": 1 }
//!   },
//!   "tail": [6, 7, null, null],
//!   "tail_len": 2
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SnapshotError;

/// One node as serialized by the vector.
///
/// Exactly one of `leaf`, `branch` and `relaxed_branch` should be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<Vec<Option<RawNode>>>,
    #[serde(
        default,
        rename = "relaxedBranch",
        skip_serializing_if = "Option::is_none"
    )]
    pub relaxed_branch: Option<Vec<Option<RawNode>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<Option<u64>>>,
    pub addr: u64,
    #[serde(default)]
    pub len: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTree {
    #[serde(default)]
    pub root: Option<RawNode>,
    #[serde(default)]
    pub root_len: usize,
    #[serde(default)]
    pub shift: usize,
}

/// Whole-vector snapshot: tree plus tail buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    #[serde(default)]
    pub tree: RawTree,
    #[serde(default)]
    pub tail: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail_len: Option<usize>,
}

impl RawSnapshot {
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Identity and bookkeeping shared by every node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeMeta {
    /// Physical node identity, stable across snapshots while the node is shared.
    pub address: u64,
    /// Number of elements below this node.
    pub length: usize,
    /// Strong reference count; greater than one means structural sharing.
    pub refs: usize,
}

impl NodeMeta {
    /// Diff key, `"{address}:{length}"`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.address, self.length)
    }
}

/// A normalized tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Leaf {
        meta: NodeMeta,
        values: Vec<String>,
    },
    DenseBranch {
        meta: NodeMeta,
        children: Vec<TreeNode>,
    },
    /// `children` ends with the [`TreeNode::SizeTable`] built from `sizes`
    /// when the table is non-empty.
    RelaxedBranch {
        meta: NodeMeta,
        children: Vec<TreeNode>,
        sizes: Vec<u64>,
    },
    /// Synthetic child showing a relaxed branch's cumulative sizes.
    SizeTable {
        meta: NodeMeta,
        sizes: Vec<u64>,
    },
}

impl TreeNode {
    pub fn meta(&self) -> &NodeMeta {
        match self {
            TreeNode::Leaf { meta, .. }
            | TreeNode::DenseBranch { meta, .. }
            | TreeNode::RelaxedBranch { meta, .. }
            | TreeNode::SizeTable { meta, .. } => meta,
        }
    }

    pub fn address(&self) -> u64 {
        self.meta().address
    }

    pub fn length(&self) -> usize {
        self.meta().length
    }

    /// Diff key. Size tables share their branch's address, so they get a suffix.
    pub fn key(&self) -> String {
        match self {
            TreeNode::SizeTable { meta, .. } => format!("{}:sizes", meta.key()),
            other => other.meta().key(),
        }
    }

    /// All children, including a trailing size table.
    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::DenseBranch { children, .. } | TreeNode::RelaxedBranch { children, .. } => {
                children
            }
            TreeNode::Leaf { .. } | TreeNode::SizeTable { .. } => &[],
        }
    }

    /// Children that are real tree nodes.
    pub fn real_children(&self) -> impl Iterator<Item = &TreeNode> {
        self.children().iter().filter(|c| !c.is_size_table())
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    pub fn is_size_table(&self) -> bool {
        matches!(self, TreeNode::SizeTable { .. })
    }

    /// Number of cells the node's own array is drawn with.
    pub fn cells(&self) -> usize {
        match self {
            TreeNode::Leaf { values, .. } => values.len(),
            TreeNode::SizeTable { sizes, .. } => sizes.len(),
            TreeNode::DenseBranch { .. } | TreeNode::RelaxedBranch { .. } => {
                self.real_children().count()
            }
        }
    }

    /// Total number of nodes in this sub-tree, size tables included.
    pub fn count(&self) -> usize {
        1 + self.children().iter().map(TreeNode::count).sum::<usize>()
    }
}

/// A normalized snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub root: Option<TreeNode>,
    pub tail: Vec<String>,
    /// Elements stored in the tree (excluding the tail).
    pub root_len: usize,
    pub shift: usize,
}

impl Snapshot {
    /// Parse and normalize a JSON snapshot.
    pub fn from_json(json: &str, branching_factor: usize) -> Result<Self, SnapshotError> {
        Self::from_raw(&RawSnapshot::from_json(json)?, branching_factor)
    }

    pub fn from_raw(raw: &RawSnapshot, branching_factor: usize) -> Result<Self, SnapshotError> {
        let root = normalize(raw.tree.root.as_ref(), branching_factor)?;
        let tail = normalize_tail(&raw.tail, raw.tail_len, branching_factor)?;
        let root_len = match (&root, raw.tree.root_len) {
            (Some(node), 0) => node.length(),
            (_, len) => len,
        };
        Ok(Self {
            root,
            tail,
            root_len,
            shift: raw.tree.shift,
        })
    }

    /// Total vector length.
    pub fn len(&self) -> usize {
        self.root_len + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalize a raw node.
///
/// A node populating none of the variants is treated as a hole.
pub fn normalize(
    raw: Option<&RawNode>,
    branching_factor: usize,
) -> Result<Option<TreeNode>, SnapshotError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let meta = NodeMeta {
        address: raw.addr,
        length: raw.len,
        refs: raw.refs.unwrap_or(1),
    };

    let populated = usize::from(raw.leaf.is_some())
        + usize::from(raw.branch.is_some())
        + usize::from(raw.relaxed_branch.is_some());
    if populated > 1 {
        return Err(SnapshotError::AmbiguousVariant {
            address: raw.addr,
        });
    }

    if let Some(entries) = &raw.leaf {
        let values: Vec<String> = entries
            .iter()
            .filter(|v| !v.is_null())
            .map(label)
            .collect();
        check_fanout(Some(raw.addr), values.len(), branching_factor)?;
        return Ok(Some(TreeNode::Leaf { meta, values }));
    }

    if let Some(entries) = &raw.branch {
        let children = normalize_children(raw.addr, entries, branching_factor)?;
        return Ok(Some(TreeNode::DenseBranch { meta, children }));
    }

    if let Some(entries) = &raw.relaxed_branch {
        let mut children = normalize_children(raw.addr, entries, branching_factor)?;
        let sizes: Vec<u64> = raw
            .sizes
            .iter()
            .flatten()
            .filter_map(|s| *s)
            .collect();
        check_fanout(Some(raw.addr), sizes.len(), branching_factor)?;
        if sizes.len() != children.len() {
            return Err(SnapshotError::SizeTableMismatch {
                address: raw.addr,
                children: children.len(),
                sizes: sizes.len(),
            });
        }
        if !sizes.is_empty() {
            children.push(TreeNode::SizeTable {
                meta,
                sizes: sizes.clone(),
            });
        }
        return Ok(Some(TreeNode::RelaxedBranch {
            meta,
            children,
            sizes,
        }));
    }

    Ok(None)
}

fn normalize_children(
    address: u64,
    entries: &[Option<RawNode>],
    branching_factor: usize,
) -> Result<Vec<TreeNode>, SnapshotError> {
    let mut children = Vec::with_capacity(entries.len());
    for entry in entries.iter().flatten() {
        if let Some(child) = normalize(Some(entry), branching_factor)? {
            children.push(child);
        }
    }
    check_fanout(Some(address), children.len(), branching_factor)?;
    Ok(children)
}

/// Normalize the tail buffer: truncate to `tail_len`, drop holes.
pub fn normalize_tail(
    raw: &[Value],
    tail_len: Option<usize>,
    branching_factor: usize,
) -> Result<Vec<String>, SnapshotError> {
    let visible = tail_len.map_or(raw.len(), |len| len.min(raw.len()));
    let tail: Vec<String> = raw[..visible]
        .iter()
        .filter(|v| !v.is_null())
        .map(label)
        .collect();
    check_fanout(None, tail.len(), branching_factor)?;
    Ok(tail)
}

fn check_fanout(
    address: Option<u64>,
    count: usize,
    branching_factor: usize,
) -> Result<(), SnapshotError> {
    if count > branching_factor {
        Err(SnapshotError::BranchingFactorExceeded {
            address,
            count,
            branching_factor,
        })
    } else {
        Ok(())
    }
}

fn label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawNode {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn leaf_drops_holes() {
        let node = raw(json!({ "leaf": [1, null, 3], "addr": 5, "len": 2 }));
        let leaf = normalize(Some(&node), 4).unwrap().unwrap();
        assert_eq!(
            leaf,
            TreeNode::Leaf {
                meta: NodeMeta {
                    address: 5,
                    length: 2,
                    refs: 1
                },
                values: vec!["1".into(), "3".into()],
            }
        );
        assert_eq!(leaf.key(), "5:2");
    }

    #[test]
    fn relaxed_branch_gets_trailing_size_table() {
        let node = raw(json!({
            "relaxedBranch": [
                { "leaf": [0, 1, 2, 3], "addr": 1, "len": 4 },
                null,
                { "leaf": [4, 5], "addr": 2, "len": 2 },
                null
            ],
            "sizes": [4, 6, null, null],
            "addr": 3,
            "len": 6,
            "refs": 2
        }));
        let branch = normalize(Some(&node), 4).unwrap().unwrap();
        let children = branch.children();
        assert_eq!(children.len(), 3);
        assert!(children[2].is_size_table());
        assert_eq!(children[2].key(), "3:6:sizes");
        assert_eq!(branch.real_children().count(), 2);
        assert_eq!(branch.cells(), 2);
        assert_eq!(branch.meta().refs, 2);
    }

    #[test]
    fn dense_branch_has_no_size_table() {
        let node = raw(json!({
            "branch": [{ "leaf": [0], "addr": 1, "len": 1 }, null, null, null],
            "addr": 2,
            "len": 1
        }));
        let branch = normalize(Some(&node), 4).unwrap().unwrap();
        assert!(matches!(branch, TreeNode::DenseBranch { .. }));
        assert!(!branch.children().iter().any(TreeNode::is_size_table));
    }

    #[test]
    fn ambiguous_variant_rejected() {
        let node = raw(json!({ "leaf": [1], "branch": [], "addr": 9, "len": 1 }));
        assert_eq!(
            normalize(Some(&node), 4),
            Err(SnapshotError::AmbiguousVariant { address: 9 })
        );
    }

    #[test]
    fn size_mismatch_rejected() {
        let node = raw(json!({
            "relaxedBranch": [{ "leaf": [0], "addr": 1, "len": 1 }],
            "sizes": [1, 2],
            "addr": 4,
            "len": 2
        }));
        assert!(matches!(
            normalize(Some(&node), 4),
            Err(SnapshotError::SizeTableMismatch { address: 4, .. })
        ));
    }

    #[test]
    fn fanout_enforced() {
        let node = raw(json!({ "leaf": [1, 2, 3], "addr": 1, "len": 3 }));
        assert!(matches!(
            normalize(Some(&node), 2),
            Err(SnapshotError::BranchingFactorExceeded { count: 3, .. })
        ));
    }

    #[test]
    fn no_variant_is_a_hole() {
        let node = raw(json!({ "addr": 1, "len": 0 }));
        assert_eq!(normalize(Some(&node), 4), Ok(None));
        assert_eq!(normalize(None, 4), Ok(None));
    }

    #[test]
    fn tail_truncated_by_len() {
        let tail = vec![json!(7), json!(8), json!(99), Value::Null];
        assert_eq!(
            normalize_tail(&tail, Some(2), 4).unwrap(),
            vec!["7".to_string(), "8".to_string()]
        );
        assert_eq!(normalize_tail(&tail, None, 4).unwrap().len(), 3);
        assert!(normalize_tail(&tail, None, 2).is_err());
    }

    #[test]
    fn empty_vector_snapshot() {
        let snap = Snapshot::from_json(r#"{"tree":{"root":null},"tail":[]}"#, 4).unwrap();
        assert!(snap.root.is_none());
        assert!(snap.is_empty());
    }

    #[test]
    fn malformed_json_is_decode_error() {
        assert!(matches!(
            Snapshot::from_json("{", 4),
            Err(SnapshotError::Decode(_))
        ));
    }

    #[test]
    fn string_values_are_unquoted() {
        let node = raw(json!({ "leaf": ["a", "b"], "addr": 1, "len": 2 }));
        let leaf = normalize(Some(&node), 4).unwrap().unwrap();
        let TreeNode::Leaf { values, .. } = leaf else {
            panic!("expected leaf");
        };
        assert_eq!(values, vec!["a", "b"]);
    }
}
