//! Tree nodes and the sibling operations shared by both trees.

use arbor_common::{ArborError, Result};

use crate::arena::{NodeArena, NodeId};

/// A tree node.
///
/// Internal nodes hold `keys.len() + 1` children. Leaves hold none. The
/// `prev`/`next` links are only maintained between B+ tree leaves.
#[derive(Debug, Clone)]
pub(crate) struct Node<K> {
    pub keys: Vec<K>,
    pub children: Vec<NodeId>,
    pub leaf: bool,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
}

impl<K> Node<K> {
    /// Creates an empty leaf with room for `capacity` keys.
    pub fn leaf(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            children: Vec::new(),
            leaf: true,
            prev: None,
            next: None,
        }
    }

    /// Creates an internal node from its keys and children.
    pub fn internal(keys: Vec<K>, children: Vec<NodeId>) -> Self {
        Self {
            keys,
            children,
            leaf: false,
            prev: None,
            next: None,
        }
    }

    /// Number of keys in the node.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

impl<K> NodeArena<Node<K>> {
    /// Moves the separator at `index - 1` down to the front of child `index`
    /// and the left sibling's last key up into its place. Internal nodes
    /// also hand over their last child.
    pub(crate) fn rotate_from_left(&mut self, parent: NodeId, index: usize) {
        let left = self[parent].children[index - 1];
        let child = self[parent].children[index];

        let (moved_key, moved_child) = {
            let node = &mut self[left];
            let last = node.keys.len() - 1;
            let key = node.keys.remove(last);
            let grandchild = if node.leaf { None } else { node.children.pop() };
            (key, grandchild)
        };

        let separator = std::mem::replace(&mut self[parent].keys[index - 1], moved_key);
        let node = &mut self[child];
        node.keys.insert(0, separator);
        if let Some(grandchild) = moved_child {
            node.children.insert(0, grandchild);
        }
    }

    /// Mirror of [`rotate_from_left`](Self::rotate_from_left) using the
    /// right sibling and the separator at `index`.
    pub(crate) fn rotate_from_right(&mut self, parent: NodeId, index: usize) {
        let right = self[parent].children[index + 1];
        let child = self[parent].children[index];

        let (moved_key, moved_child) = {
            let node = &mut self[right];
            let key = node.keys.remove(0);
            let grandchild = if node.leaf {
                None
            } else {
                Some(node.children.remove(0))
            };
            (key, grandchild)
        };

        let separator = std::mem::replace(&mut self[parent].keys[index], moved_key);
        let node = &mut self[child];
        node.keys.push(separator);
        if let Some(grandchild) = moved_child {
            node.children.push(grandchild);
        }
    }

    /// Merges child `index + 1` into child `index`, pulling the separator
    /// between them down. The right node is released. Returns the surviving
    /// left node.
    pub(crate) fn merge_with_right(&mut self, parent: NodeId, index: usize) -> NodeId {
        let left = self[parent].children[index];
        let right = self[parent].children[index + 1];

        let separator = self[parent].keys.remove(index);
        self[parent].children.remove(index + 1);

        let right_node = self.release(right);
        let node = &mut self[left];
        node.keys.push(separator);
        node.keys.extend(right_node.keys);
        node.children.extend(right_node.children);
        left
    }

    /// Returns an error if the arena holds nodes unreachable from `root`.
    pub(crate) fn check_no_leaks(&self, root: Option<NodeId>) -> Result<()> {
        let mut reachable = 0;
        let mut stack: Vec<NodeId> = root.into_iter().collect();
        while let Some(id) = stack.pop() {
            reachable += 1;
            stack.extend(self[id].children.iter().copied());
        }
        if reachable != self.len() {
            return Err(ArborError::TreeCorrupted(format!(
                "{} live nodes but {} reachable",
                self.len(),
                reachable
            )));
        }
        Ok(())
    }
}
