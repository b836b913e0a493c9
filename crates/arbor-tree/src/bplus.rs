//! B+ tree: keys live in linked leaves, internal nodes hold separator copies.
//!
//! Splits and underflows are repaired bottom-up along the root-to-leaf path
//! recorded during the descent. Separators satisfy
//! `keys(child[i]) <= sep[i] <= keys(child[i + 1])`.

use std::fmt;

use arbor_common::{ArborError, Result, TreeConfig};
use tracing::{debug, trace};

use crate::arena::{NodeArena, NodeId};
use crate::index::OrderedIndex;
use crate::node::Node;
use crate::types::{KeyComparator, KeyFormatter, NaturalOrder};

/// Internal nodes visited on the way to a leaf, with the child index taken.
type Path = Vec<(NodeId, usize)>;

/// B+ tree of minimum degree `m`.
///
/// Nodes hold at most `2m - 1` keys. Non-root leaves hold at least `m` keys
/// and non-root internal nodes at least `m - 1`.
#[derive(Clone)]
pub struct BPlusTree<K, C = NaturalOrder> {
    nodes: NodeArena<Node<K>>,
    root: Option<NodeId>,
    min_degree: usize,
    comparator: C,
    formatter: Option<KeyFormatter<K>>,
    key_count: usize,
    height: usize,
}

impl<K: Ord + Clone> BPlusTree<K, NaturalOrder> {
    /// Creates an empty tree ordered by `K: Ord`.
    pub fn new(min_degree: usize) -> Result<Self> {
        Self::with_comparator(min_degree, NaturalOrder)
    }

    /// Creates an empty tree from a validated configuration.
    pub fn from_config(config: &TreeConfig) -> Result<Self> {
        Self::new(config.min_degree)
    }
}

impl<K: Clone, C: KeyComparator<K>> BPlusTree<K, C> {
    /// Creates an empty tree using a custom ordering.
    pub fn with_comparator(min_degree: usize, comparator: C) -> Result<Self> {
        TreeConfig { min_degree }.validate()?;
        Ok(Self {
            nodes: NodeArena::new(),
            root: None,
            min_degree,
            comparator,
            formatter: None,
            key_count: 0,
            height: 0,
        })
    }

    /// Sets the formatter used for error messages and `Display`.
    pub fn with_key_formatter(mut self, formatter: KeyFormatter<K>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Minimum degree the tree was built with.
    pub fn min_degree(&self) -> usize {
        self.min_degree
    }

    /// Number of stored keys.
    pub fn num_keys(&self) -> usize {
        self.key_count
    }

    /// Edges from the root to the leaves.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns true if the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Bytes occupied by the stored keys. Separator copies are not counted.
    pub fn size_in_bytes(&self) -> usize {
        self.key_count * std::mem::size_of::<K>()
    }

    #[inline]
    fn max_keys(&self) -> usize {
        2 * self.min_degree - 1
    }

    #[inline]
    fn upper_bound(&self, node: NodeId, key: &K) -> usize {
        self.nodes[node]
            .keys
            .partition_point(|k| !self.comparator.less(key, k))
    }

    #[inline]
    fn lower_bound(&self, node: NodeId, key: &K) -> usize {
        self.nodes[node]
            .keys
            .partition_point(|k| self.comparator.less(k, key))
    }

    fn not_found(&self, key: &K) -> ArborError {
        ArborError::KeyNotFound {
            key: self.formatter.map(|format| format(key)),
        }
    }

    /// Descends to the leftmost leaf that may hold a key equivalent to `key`.
    fn descend_lower(&self, root: NodeId, key: &K, path: &mut Path) -> NodeId {
        let mut current = root;
        while !self.nodes[current].leaf {
            let index = self.lower_bound(current, key);
            path.push((current, index));
            current = self.nodes[current].children[index];
        }
        current
    }

    /// Moves `path` to the leaf after the one it currently ends at.
    fn advance(&self, path: &mut Path) -> Option<NodeId> {
        while let Some((node, index)) = path.pop() {
            if index + 1 < self.nodes[node].children.len() {
                path.push((node, index + 1));
                let mut current = self.nodes[node].children[index + 1];
                while !self.nodes[current].leaf {
                    path.push((current, 0));
                    current = self.nodes[current].children[0];
                }
                return Some(current);
            }
        }
        None
    }

    /// Scans `leaf` for a key equivalent to `key`.
    fn scan_leaf(&self, leaf: NodeId, key: &K) -> LeafScan {
        for (i, k) in self.nodes[leaf].keys.iter().enumerate() {
            if self.comparator.less(key, k) {
                return LeafScan::Passed;
            }
            if !self.comparator.less(k, key) {
                return LeafScan::Found(i);
            }
        }
        LeafScan::Exhausted
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Inserts a key. Equivalent keys are kept side by side.
    pub fn insert(&mut self, key: K) {
        let Some(root) = self.root else {
            let mut leaf = Node::leaf(self.max_keys() + 1);
            leaf.keys.push(key);
            self.root = Some(self.nodes.allocate(leaf));
            self.key_count = 1;
            return;
        };

        let mut path = Path::with_capacity(self.height);
        let mut current = root;
        while !self.nodes[current].leaf {
            let index = self.upper_bound(current, &key);
            path.push((current, index));
            current = self.nodes[current].children[index];
        }

        let index = self.upper_bound(current, &key);
        self.nodes[current].keys.insert(index, key);
        self.key_count += 1;

        if self.nodes[current].len() > self.max_keys() {
            self.split_leaf(current, path);
        }
    }

    /// Splits an overfull leaf into `m` and `m` keys and copies the first
    /// key of the right half into the parent.
    fn split_leaf(&mut self, leaf: NodeId, path: Path) {
        let m = self.min_degree;
        let (right_keys, old_next) = {
            let node = &mut self.nodes[leaf];
            (node.keys.split_off(m), node.next)
        };
        let separator = right_keys[0].clone();

        let mut right = Node::leaf(self.max_keys() + 1);
        right.keys.extend(right_keys);
        right.prev = Some(leaf);
        right.next = old_next;
        let right = self.nodes.allocate(right);

        self.nodes[leaf].next = Some(right);
        if let Some(next) = old_next {
            self.nodes[next].prev = Some(right);
        }
        trace!(leaf = leaf.as_u32(), right = right.as_u32(), "bplus leaf split");

        self.insert_into_parent(path, leaf, separator, right);
    }

    /// Hangs `right` after `left` in their parent, splitting overfull
    /// internal nodes up the path and growing a new root if needed.
    fn insert_into_parent(
        &mut self,
        mut path: Path,
        mut left: NodeId,
        mut separator: K,
        mut right: NodeId,
    ) {
        let m = self.min_degree;

        while let Some((parent, index)) = path.pop() {
            let node = &mut self.nodes[parent];
            node.keys.insert(index, separator);
            node.children.insert(index + 1, right);
            if node.keys.len() <= 2 * m - 1 {
                return;
            }

            // 2m keys: left keeps m, one moves up, right takes m - 1.
            let mut right_keys = node.keys.split_off(m);
            let right_children = node.children.split_off(m + 1);
            separator = right_keys.remove(0);
            left = parent;
            right = self.nodes.allocate(Node::internal(right_keys, right_children));
            trace!(node = left.as_u32(), right = right.as_u32(), "bplus internal split");
        }

        let mut keys = Vec::with_capacity(2 * m);
        keys.push(separator);
        self.root = Some(self.nodes.allocate(Node::internal(keys, vec![left, right])));
        self.height += 1;
        debug!(height = self.height, "bplus root split");
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Returns a stored key equivalent to `key`.
    pub fn search(&self, key: &K) -> Result<&K> {
        match self.locate(key) {
            Some((leaf, index)) => Ok(&self.nodes[leaf].keys[index]),
            None => Err(self.not_found(key)),
        }
    }

    /// Returns true if a key equivalent to `key` is stored.
    pub fn contains(&self, key: &K) -> bool {
        self.locate(key).is_some()
    }

    fn locate(&self, key: &K) -> Option<(NodeId, usize)> {
        let root = self.root?;
        let mut leaf = self.descend_lower(root, key, &mut Path::new());
        loop {
            match self.scan_leaf(leaf, key) {
                LeafScan::Found(index) => return Some((leaf, index)),
                LeafScan::Passed => return None,
                LeafScan::Exhausted => leaf = self.nodes[leaf].next?,
            }
        }
    }

    // =========================================================================
    // Remove
    // =========================================================================

    /// Removes one key equivalent to `key` and returns it.
    ///
    /// The key is located before anything moves, so a missing key leaves
    /// the structure untouched.
    pub fn remove(&mut self, key: &K) -> Result<K> {
        let Some(root) = self.root else {
            return Err(ArborError::EmptyTree);
        };

        let mut path = Path::with_capacity(self.height);
        let mut leaf = self.descend_lower(root, key, &mut path);
        let index = loop {
            match self.scan_leaf(leaf, key) {
                LeafScan::Found(index) => break index,
                LeafScan::Passed => return Err(self.not_found(key)),
                LeafScan::Exhausted => match self.advance(&mut path) {
                    Some(next) => leaf = next,
                    None => return Err(self.not_found(key)),
                },
            }
        };

        let removed = self.nodes[leaf].keys.remove(index);
        self.key_count -= 1;
        self.rebalance_leaf(leaf, path);
        Ok(removed)
    }

    /// Restores leaf occupancy after a removal, borrowing before merging.
    fn rebalance_leaf(&mut self, leaf: NodeId, mut path: Path) {
        let m = self.min_degree;
        let Some(&(parent, index)) = path.last() else {
            if self.nodes[leaf].keys.is_empty() {
                self.nodes.release(leaf);
                self.root = None;
                debug!("bplus tree emptied");
            }
            return;
        };
        if self.nodes[leaf].len() >= m {
            return;
        }

        let siblings = self.nodes[parent].children.len();
        if index > 0 {
            let left = self.nodes[parent].children[index - 1];
            if self.nodes[left].len() > m {
                let moved = self.nodes[left].keys.pop();
                if let Some(moved) = moved {
                    self.nodes[parent].keys[index - 1] = moved.clone();
                    self.nodes[leaf].keys.insert(0, moved);
                }
                trace!(leaf = leaf.as_u32(), "bplus leaf borrow from left");
                return;
            }
        }
        if index + 1 < siblings {
            let right = self.nodes[parent].children[index + 1];
            if self.nodes[right].len() > m {
                let moved = self.nodes[right].keys.remove(0);
                self.nodes[leaf].keys.push(moved);
                self.nodes[parent].keys[index] = self.nodes[right].keys[0].clone();
                trace!(leaf = leaf.as_u32(), "bplus leaf borrow from right");
                return;
            }
        }

        if index > 0 {
            self.merge_leaves(parent, index - 1);
        } else {
            self.merge_leaves(parent, index);
        }
        path.pop();
        self.rebalance_internal(parent, path);
    }

    /// Folds leaf `index + 1` into leaf `index` and drops their separator.
    fn merge_leaves(&mut self, parent: NodeId, index: usize) {
        let left = self.nodes[parent].children[index];
        let right = self.nodes[parent].children[index + 1];
        self.nodes[parent].keys.remove(index);
        self.nodes[parent].children.remove(index + 1);

        let right_node = self.nodes.release(right);
        let node = &mut self.nodes[left];
        node.keys.extend(right_node.keys);
        node.next = right_node.next;
        if let Some(next) = right_node.next {
            self.nodes[next].prev = Some(left);
        }
        trace!(leaf = left.as_u32(), "bplus leaf merge");
    }

    /// Restores internal occupancy from `node` up towards the root.
    fn rebalance_internal(&mut self, mut node: NodeId, mut path: Path) {
        let min_keys = self.min_degree - 1;
        loop {
            let Some(&(parent, index)) = path.last() else {
                if self.nodes[node].keys.is_empty() {
                    let only_child = self.nodes[node].children[0];
                    self.nodes.release(node);
                    self.root = Some(only_child);
                    self.height -= 1;
                    debug!(height = self.height, "bplus root collapsed");
                }
                return;
            };
            if self.nodes[node].len() >= min_keys {
                return;
            }

            if index > 0 {
                let left = self.nodes[parent].children[index - 1];
                if self.nodes[left].len() > min_keys {
                    self.nodes.rotate_from_left(parent, index);
                    trace!(node = node.as_u32(), "bplus borrow from left");
                    return;
                }
            }
            if index < self.nodes[parent].len() {
                let right = self.nodes[parent].children[index + 1];
                if self.nodes[right].len() > min_keys {
                    self.nodes.rotate_from_right(parent, index);
                    trace!(node = node.as_u32(), "bplus borrow from right");
                    return;
                }
            }

            let merged = if index > 0 {
                self.nodes.merge_with_right(parent, index - 1)
            } else {
                self.nodes.merge_with_right(parent, index)
            };
            trace!(node = merged.as_u32(), "bplus merge");
            path.pop();
            node = parent;
        }
    }

    // =========================================================================
    // Scans
    // =========================================================================

    fn first_leaf(&self) -> Option<NodeId> {
        let mut current = self.root?;
        while !self.nodes[current].leaf {
            current = self.nodes[current].children[0];
        }
        Some(current)
    }

    /// Iterates every key in ascending order along the leaf chain.
    pub fn iter(&self) -> Iter<'_, K, C> {
        Iter {
            tree: self,
            leaf: self.first_leaf(),
            index: 0,
            high: None,
        }
    }

    /// Iterates the keys `k` with `low <= k <= high` in ascending order.
    pub fn range(&self, low: &K, high: &K) -> Iter<'_, K, C> {
        let Some(root) = self.root else {
            return Iter {
                tree: self,
                leaf: None,
                index: 0,
                high: None,
            };
        };
        let leaf = self.descend_lower(root, low, &mut Path::new());
        Iter {
            tree: self,
            leaf: Some(leaf),
            index: self.lower_bound(leaf, low),
            high: Some(high.clone()),
        }
    }

    /// Returns every key in ascending order.
    pub fn keys(&self) -> Vec<&K> {
        self.iter().collect()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Verifies ordering, occupancy, child counts, leaf depth, key count, the
    /// leaf chain and that every allocated node is reachable.
    pub fn check_invariants(&self) -> Result<()> {
        let Some(root) = self.root else {
            if self.key_count != 0 || self.height != 0 {
                return Err(ArborError::TreeCorrupted(format!(
                    "no root but key count {} and height {}",
                    self.key_count, self.height
                )));
            }
            return self.nodes.check_no_leaks(None);
        };

        let mut leaves = Vec::new();
        let counted = self.check_node(root, 0, None, None, &mut leaves)?;
        if counted != self.key_count {
            return Err(ArborError::TreeCorrupted(format!(
                "key count {} but {} keys in leaves",
                self.key_count, counted
            )));
        }
        self.nodes.check_no_leaks(Some(root))?;

        for (i, &leaf) in leaves.iter().enumerate() {
            let node = &self.nodes[leaf];
            let prev = if i == 0 { None } else { Some(leaves[i - 1]) };
            let next = leaves.get(i + 1).copied();
            if node.prev != prev || node.next != next {
                return Err(ArborError::TreeCorrupted(format!(
                    "leaf {} has broken sibling links",
                    leaf.as_u32()
                )));
            }
            if let (Some(last), Some(next)) = (node.keys.last(), next) {
                if self.comparator.less(&self.nodes[next].keys[0], last) {
                    return Err(ArborError::TreeCorrupted(format!(
                        "leaf {} sorts after its successor",
                        leaf.as_u32()
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_node(
        &self,
        id: NodeId,
        depth: usize,
        lower: Option<&K>,
        upper: Option<&K>,
        leaves: &mut Vec<NodeId>,
    ) -> Result<usize> {
        let node = &self.nodes[id];
        let corrupted = |msg: String| Err(ArborError::TreeCorrupted(msg));
        let is_root = Some(id) == self.root;

        let min_keys = match (is_root, node.leaf) {
            (true, _) => 1,
            (false, true) => self.min_degree,
            (false, false) => self.min_degree - 1,
        };
        if node.len() < min_keys || node.len() > self.max_keys() {
            return corrupted(format!("node {} holds {} keys", id.as_u32(), node.len()));
        }
        if node.keys.windows(2).any(|w| self.comparator.less(&w[1], &w[0])) {
            return corrupted(format!("node {} keys out of order", id.as_u32()));
        }
        for key in &node.keys {
            let below = lower.is_some_and(|low| self.comparator.less(key, low));
            let above = upper.is_some_and(|high| self.comparator.less(high, key));
            if below || above {
                return corrupted(format!("node {} key outside parent range", id.as_u32()));
            }
        }

        if node.leaf {
            if depth != self.height {
                return corrupted(format!(
                    "leaf {} at depth {} but height is {}",
                    id.as_u32(),
                    depth,
                    self.height
                ));
            }
            leaves.push(id);
            return Ok(node.len());
        }

        if node.children.len() != node.len() + 1 {
            return corrupted(format!(
                "node {} has {} keys and {} children",
                id.as_u32(),
                node.len(),
                node.children.len()
            ));
        }
        let mut total = 0;
        for (i, &child) in node.children.iter().enumerate() {
            let low = if i == 0 { lower } else { Some(&node.keys[i - 1]) };
            let high = node.keys.get(i).or(upper);
            total += self.check_node(child, depth + 1, low, high, leaves)?;
        }
        Ok(total)
    }

    /// Replaces this tree with a copy of `other`.
    ///
    /// Both trees must share a minimum degree.
    pub fn assign_from(&mut self, other: &Self) -> Result<()>
    where
        C: Clone,
    {
        if self.min_degree != other.min_degree {
            return Err(ArborError::DegreeMismatch {
                expected: self.min_degree,
                actual: other.min_degree,
            });
        }
        *self = other.clone();
        Ok(())
    }

    fn fmt_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: NodeId,
        depth: usize,
        format: KeyFormatter<K>,
    ) -> fmt::Result {
        let node = &self.nodes[id];
        for _ in 0..depth {
            f.write_str("\t")?;
        }
        for key in &node.keys {
            write!(f, "{} ", format(key))?;
        }
        writeln!(f)?;
        for &child in &node.children {
            self.fmt_node(f, child, depth + 1, format)?;
        }
        Ok(())
    }
}

enum LeafScan {
    Found(usize),
    /// A larger key was reached.
    Passed,
    /// Every key in the leaf sorts before the target.
    Exhausted,
}

/// Ascending iterator over a [`BPlusTree`], optionally bounded above.
pub struct Iter<'a, K, C> {
    tree: &'a BPlusTree<K, C>,
    leaf: Option<NodeId>,
    index: usize,
    high: Option<K>,
}

impl<'a, K, C: KeyComparator<K>> Iterator for Iter<'a, K, C> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        let tree = self.tree;
        loop {
            let node = &tree.nodes[self.leaf?];
            if let Some(key) = node.keys.get(self.index) {
                if let Some(high) = &self.high {
                    if tree.comparator.less(high, key) {
                        self.leaf = None;
                        return None;
                    }
                }
                self.index += 1;
                return Some(key);
            }
            self.leaf = node.next;
            self.index = 0;
        }
    }
}

impl<'a, K: Clone, C: KeyComparator<K>> IntoIterator for &'a BPlusTree<K, C> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One line per node in pre-order, indented one tab per level. Nothing is
/// printed without a key formatter.
impl<K: Clone, C: KeyComparator<K>> fmt::Display for BPlusTree<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.formatter, self.root) {
            (Some(format), Some(root)) => {
                writeln!(f)?;
                self.fmt_node(f, root, 0, format)
            }
            _ => Ok(()),
        }
    }
}

impl<K: Clone, C: KeyComparator<K>> OrderedIndex<K> for BPlusTree<K, C> {
    fn insert(&mut self, key: K) {
        BPlusTree::insert(self, key)
    }

    fn remove(&mut self, key: &K) -> Result<K> {
        BPlusTree::remove(self, key)
    }

    fn search(&self, key: &K) -> Result<&K> {
        BPlusTree::search(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        BPlusTree::contains(self, key)
    }

    fn num_keys(&self) -> usize {
        self.key_count
    }

    fn height(&self) -> usize {
        self.height
    }
}
