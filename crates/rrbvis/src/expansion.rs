#![forbid(unsafe_code)]

//! Which sub-trees stay open.
//!
//! A full tree for a few hundred elements is far too wide to read, so only
//! one root-to-leaf spine is expanded: the root, its last real child, that
//! child's last real child, and so on. Leaves are always open so their
//! values show. Everything else is collapsed with its children cached.

use std::collections::{HashSet, VecDeque};

use crate::snapshot::TreeNode;

/// Outcome of [`select_expanded`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    /// Keys of expanded nodes.
    pub expanded: HashSet<String>,
    /// Keys that end up on screen, breadth-first.
    pub visible: Vec<String>,
    /// Every key in visit order.
    pub visited: Vec<String>,
}

impl Expansion {
    pub fn is_expanded(&self, key: &str) -> bool {
        self.expanded.contains(key)
    }
}

/// Breadth-first walk that expands the rightmost spine.
pub fn select_expanded(root: Option<&TreeNode>) -> Expansion {
    let mut out = Expansion::default();
    let Some(root) = root else {
        return out;
    };

    let mut cursor: Option<&TreeNode> = Some(root);
    // (node, visible)
    let mut queue: VecDeque<(&TreeNode, bool)> = VecDeque::from([(root, true)]);
    while let Some((node, visible)) = queue.pop_front() {
        let key = node.key();
        let is_cursor = cursor.is_some_and(|c| std::ptr::eq(c, node));
        let expanded = is_cursor || node.is_leaf();
        if is_cursor {
            cursor = node.real_children().last();
        }

        for child in node.children() {
            queue.push_back((child, visible && expanded));
        }

        if expanded {
            out.expanded.insert(key.clone());
        }
        if visible {
            out.visible.push(key.clone());
        }
        out.visited.push(key);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::NodeMeta;

    fn meta(address: u64, length: usize) -> NodeMeta {
        NodeMeta {
            address,
            length,
            refs: 1,
        }
    }

    fn leaf(address: u64, n: usize) -> TreeNode {
        TreeNode::Leaf {
            meta: meta(address, n),
            values: (0..n).map(|i| i.to_string()).collect(),
        }
    }

    fn dense(address: u64, children: Vec<TreeNode>) -> TreeNode {
        let length = children.iter().map(TreeNode::length).sum();
        TreeNode::DenseBranch {
            meta: meta(address, length),
            children,
        }
    }

    #[test]
    fn empty_tree() {
        let exp = select_expanded(None);
        assert!(exp.visited.is_empty());
        assert!(exp.visible.is_empty());
    }

    #[test]
    fn spine_follows_last_child() {
        // root(100) -> [b(10) -> [l1, l2], b(11) -> [l3, l4]]
        let tree = dense(
            100,
            vec![
                dense(10, vec![leaf(1, 4), leaf(2, 4)]),
                dense(11, vec![leaf(3, 4), leaf(4, 2)]),
            ],
        );
        let exp = select_expanded(Some(&tree));
        assert!(exp.is_expanded("100:14"));
        assert!(exp.is_expanded("11:6"));
        assert!(!exp.is_expanded("10:8"));
        assert_eq!(
            exp.visible,
            vec!["100:14", "10:8", "11:6", "3:4", "4:2"]
        );
        assert_eq!(exp.visited.len(), 7);
    }

    #[test]
    fn size_table_is_not_the_last_real_child() {
        let sizes = vec![4, 8];
        let tree = TreeNode::RelaxedBranch {
            meta: meta(50, 8),
            children: vec![
                leaf(1, 4),
                leaf(2, 4),
                TreeNode::SizeTable {
                    meta: meta(50, 8),
                    sizes: sizes.clone(),
                },
            ],
            sizes,
        };
        let exp = select_expanded(Some(&tree));
        assert_eq!(exp.visible, vec!["50:8", "1:4", "2:4", "50:8:sizes"]);
        assert!(exp.is_expanded("2:4"));
    }

    #[test]
    fn leaf_root_is_expanded() {
        let tree = leaf(7, 3);
        let exp = select_expanded(Some(&tree));
        assert!(exp.is_expanded("7:3"));
        assert_eq!(exp.visible, vec!["7:3"]);
    }
}
