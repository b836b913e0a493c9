//! Classic B-tree with keys stored in every node.
//!
//! Inserts split full nodes on the way down and deletes fix underfull
//! children on the way down, so neither operation ever walks back up.

use std::fmt;

use arbor_common::{ArborError, Result, TreeConfig};
use tracing::{debug, trace};

use crate::arena::{NodeArena, NodeId};
use crate::index::OrderedIndex;
use crate::node::Node;
use crate::types::{KeyComparator, KeyFormatter, NaturalOrder, Rebalance};

/// B-tree of minimum degree `m`.
///
/// Every node holds at most `2m - 1` keys and every node except the root at
/// least `m - 1`. Cloning copies the whole structure.
#[derive(Clone)]
pub struct BTree<K, C = NaturalOrder> {
    nodes: NodeArena<Node<K>>,
    root: NodeId,
    min_degree: usize,
    comparator: C,
    formatter: Option<KeyFormatter<K>>,
    key_count: usize,
    height: usize,
}

impl<K: Ord> BTree<K, NaturalOrder> {
    /// Creates an empty tree ordered by `K: Ord`.
    pub fn new(min_degree: usize) -> Result<Self> {
        Self::with_comparator(min_degree, NaturalOrder)
    }

    /// Creates an empty tree from a validated configuration.
    pub fn from_config(config: &TreeConfig) -> Result<Self> {
        Self::new(config.min_degree)
    }
}

impl<K, C: KeyComparator<K>> BTree<K, C> {
    /// Creates an empty tree using a custom ordering.
    pub fn with_comparator(min_degree: usize, comparator: C) -> Result<Self> {
        let config = TreeConfig { min_degree };
        config.validate()?;

        let mut nodes = NodeArena::new();
        let root = nodes.allocate(Node::leaf(config.max_keys()));
        Ok(Self {
            nodes,
            root,
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

    /// Edges from the root to any leaf.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns true if the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Bytes occupied by the stored keys.
    pub fn size_in_bytes(&self) -> usize {
        self.key_count * std::mem::size_of::<K>()
    }

    #[inline]
    fn max_keys(&self) -> usize {
        2 * self.min_degree - 1
    }

    /// First position whose key sorts after `key`.
    #[inline]
    fn upper_bound(&self, node: NodeId, key: &K) -> usize {
        self.nodes[node]
            .keys
            .partition_point(|k| !self.comparator.less(key, k))
    }

    /// First position whose key does not sort before `key`.
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

    // =========================================================================
    // Insert
    // =========================================================================

    /// Inserts a key. Equivalent keys are kept side by side.
    pub fn insert(&mut self, key: K) {
        if self.nodes[self.root].len() == self.max_keys() {
            let old_root = self.root;
            self.root = self.nodes.allocate(Node::internal(
                Vec::with_capacity(self.max_keys()),
                vec![old_root],
            ));
            self.split_child(self.root, 0);
            self.height += 1;
            debug!(height = self.height, "btree root split");
        }

        let mut current = self.root;
        while !self.nodes[current].leaf {
            let mut index = self.upper_bound(current, &key);
            let child = self.nodes[current].children[index];
            if self.nodes[child].len() == self.max_keys() {
                self.split_child(current, index);
                if self.comparator.less(&self.nodes[current].keys[index], &key) {
                    index += 1;
                }
            }
            current = self.nodes[current].children[index];
        }

        let index = self.upper_bound(current, &key);
        self.nodes[current].keys.insert(index, key);
        self.key_count += 1;
    }

    /// Splits the full child at `index`, moving its median into `parent`.
    fn split_child(&mut self, parent: NodeId, index: usize) {
        let m = self.min_degree;
        let child = self.nodes[parent].children[index];

        let (median, right) = {
            let node = &mut self.nodes[child];
            let right_keys = node.keys.split_off(m);
            let median = node.keys.remove(m - 1);
            let right = if node.leaf {
                let mut right = Node::leaf(2 * m - 1);
                right.keys.extend(right_keys);
                right
            } else {
                Node::internal(right_keys, node.children.split_off(m))
            };
            (median, right)
        };

        let right = self.nodes.allocate(right);
        let node = &mut self.nodes[parent];
        node.keys.insert(index, median);
        node.children.insert(index + 1, right);
        trace!(child = child.as_u32(), right = right.as_u32(), "btree node split");
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Returns a stored key equivalent to `key`.
    pub fn search(&self, key: &K) -> Result<&K> {
        match self.locate(key) {
            Some((node, index)) => Ok(&self.nodes[node].keys[index]),
            None => Err(self.not_found(key)),
        }
    }

    /// Returns true if a key equivalent to `key` is stored.
    pub fn contains(&self, key: &K) -> bool {
        self.locate(key).is_some()
    }

    fn locate(&self, key: &K) -> Option<(NodeId, usize)> {
        let mut current = self.root;
        loop {
            let node = &self.nodes[current];
            let index = self.lower_bound(current, key);
            if index < node.len() && self.comparator.equivalent(&node.keys[index], key) {
                return Some((current, index));
            }
            if node.leaf {
                return None;
            }
            current = node.children[index];
        }
    }

    // =========================================================================
    // Remove
    // =========================================================================

    /// Removes one key equivalent to `key` and returns it.
    ///
    /// The tree is searched before anything moves, so a missing key leaves
    /// the structure untouched.
    pub fn remove(&mut self, key: &K) -> Result<K> {
        if self.key_count == 0 {
            return Err(ArborError::EmptyTree);
        }
        if self.locate(key).is_none() {
            return Err(self.not_found(key));
        }

        let m = self.min_degree;
        let mut current = self.root;
        loop {
            let index = self.lower_bound(current, key);
            let node = &self.nodes[current];
            let found = index < node.len() && self.comparator.equivalent(&node.keys[index], key);

            if found {
                if node.leaf {
                    let removed = self.nodes[current].keys.remove(index);
                    self.key_count -= 1;
                    return Ok(removed);
                }

                let left = node.children[index];
                let right = node.children[index + 1];
                if self.nodes[left].len() >= m {
                    let predecessor = self.pop_last(left)?;
                    let removed =
                        std::mem::replace(&mut self.nodes[current].keys[index], predecessor);
                    self.key_count -= 1;
                    return Ok(removed);
                }
                if self.nodes[right].len() >= m {
                    let successor = self.pop_first(right)?;
                    let removed =
                        std::mem::replace(&mut self.nodes[current].keys[index], successor);
                    self.key_count -= 1;
                    return Ok(removed);
                }

                // Both neighbours are minimal: fold the key into the merged
                // child and keep looking there.
                self.merge_children(current, index);
                current = left;
                continue;
            }

            if node.leaf {
                return Err(self.not_found(key));
            }

            let child = node.children[index];
            if self.nodes[child].len() < m {
                if self.fix_child(current, index) == Rebalance::NewRoot {
                    current = self.root;
                }
                continue;
            }
            current = child;
        }
    }

    /// Removes and returns the largest key under `node`, topping up each
    /// child on the way down.
    fn pop_last(&mut self, mut node: NodeId) -> Result<K> {
        while !self.nodes[node].leaf {
            let last = self.nodes[node].len();
            self.fix_child(node, last);
            let last = self.nodes[node].len();
            node = self.nodes[node].children[last];
        }
        self.nodes[node]
            .keys
            .pop()
            .ok_or_else(|| ArborError::TreeCorrupted("empty leaf below an internal node".into()))
    }

    /// Removes and returns the smallest key under `node`.
    fn pop_first(&mut self, mut node: NodeId) -> Result<K> {
        while !self.nodes[node].leaf {
            self.fix_child(node, 0);
            node = self.nodes[node].children[0];
        }
        let keys = &mut self.nodes[node].keys;
        if keys.is_empty() {
            return Err(ArborError::TreeCorrupted(
                "empty leaf below an internal node".into(),
            ));
        }
        Ok(keys.remove(0))
    }

    /// Ensures the child at `index` holds at least `m` keys, borrowing from
    /// a sibling when one can spare a key and merging otherwise.
    fn fix_child(&mut self, parent: NodeId, index: usize) -> Rebalance {
        let m = self.min_degree;
        let child = self.nodes[parent].children[index];
        if self.nodes[child].len() >= m {
            return Rebalance::Unchanged;
        }

        if index > 0 {
            let left = self.nodes[parent].children[index - 1];
            if self.nodes[left].len() >= m {
                self.nodes.rotate_from_left(parent, index);
                trace!(node = child.as_u32(), "btree borrow from left");
                return Rebalance::Modified;
            }
        }
        if index < self.nodes[parent].len() {
            let right = self.nodes[parent].children[index + 1];
            if self.nodes[right].len() >= m {
                self.nodes.rotate_from_right(parent, index);
                trace!(node = child.as_u32(), "btree borrow from right");
                return Rebalance::Modified;
            }
        }

        if index > 0 {
            self.merge_children(parent, index - 1)
        } else {
            self.merge_children(parent, index)
        }
    }

    /// Merges children `index` and `index + 1` and collapses an emptied root.
    fn merge_children(&mut self, parent: NodeId, index: usize) -> Rebalance {
        let left = self.nodes.merge_with_right(parent, index);
        trace!(node = left.as_u32(), "btree merge");

        if parent == self.root && self.nodes[parent].keys.is_empty() {
            self.nodes.release(parent);
            self.root = left;
            self.height -= 1;
            debug!(height = self.height, "btree root collapsed");
            return Rebalance::NewRoot;
        }
        Rebalance::Modified
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Returns every key in ascending order.
    pub fn keys(&self) -> Vec<&K> {
        let mut out = Vec::with_capacity(self.key_count);
        self.collect_keys(self.root, &mut out);
        out
    }

    fn collect_keys<'a>(&'a self, node: NodeId, out: &mut Vec<&'a K>) {
        let node = &self.nodes[node];
        if node.leaf {
            out.extend(node.keys.iter());
            return;
        }
        for (i, key) in node.keys.iter().enumerate() {
            self.collect_keys(node.children[i], out);
            out.push(key);
        }
        if let Some(&last) = node.children.last() {
            self.collect_keys(last, out);
        }
    }

    /// Verifies ordering, occupancy, child counts, leaf depth, key count and
    /// that every allocated node is reachable.
    pub fn check_invariants(&self) -> Result<()> {
        let counted = self.check_node(self.root, 0, None, None)?;
        if counted != self.key_count {
            return Err(ArborError::TreeCorrupted(format!(
                "key count {} but {} keys reachable",
                self.key_count, counted
            )));
        }
        self.nodes.check_no_leaks(Some(self.root))
    }

    fn check_node(
        &self,
        id: NodeId,
        depth: usize,
        lower: Option<&K>,
        upper: Option<&K>,
    ) -> Result<usize> {
        let node = &self.nodes[id];
        let corrupted = |msg: String| Err(ArborError::TreeCorrupted(msg));

        if node.len() > self.max_keys() {
            return corrupted(format!("node {} holds {} keys", id.as_u32(), node.len()));
        }
        if id != self.root && node.len() < self.min_degree - 1 {
            return corrupted(format!("node {} underfull with {} keys", id.as_u32(), node.len()));
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
            if !node.children.is_empty() {
                return corrupted(format!("leaf {} has children", id.as_u32()));
            }
            if depth != self.height {
                return corrupted(format!(
                    "leaf {} at depth {} but height is {}",
                    id.as_u32(),
                    depth,
                    self.height
                ));
            }
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
        let mut total = node.len();
        for (i, &child) in node.children.iter().enumerate() {
            let low = if i == 0 { lower } else { Some(&node.keys[i - 1]) };
            let high = node.keys.get(i).or(upper);
            total += self.check_node(child, depth + 1, low, high)?;
        }
        Ok(total)
    }

    /// Replaces this tree with a copy of `other`.
    ///
    /// Both trees must share a minimum degree.
    pub fn assign_from(&mut self, other: &Self) -> Result<()>
    where
        K: Clone,
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

/// One line per node in pre-order, indented one tab per level. Nothing is
/// printed without a key formatter.
impl<K, C: KeyComparator<K>> fmt::Display for BTree<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.formatter {
            Some(format) if self.key_count > 0 => {
                writeln!(f)?;
                self.fmt_node(f, self.root, 0, format)
            }
            _ => Ok(()),
        }
    }
}

impl<K, C: KeyComparator<K>> OrderedIndex<K> for BTree<K, C> {
    fn insert(&mut self, key: K) {
        BTree::insert(self, key)
    }

    fn remove(&mut self, key: &K) -> Result<K> {
        BTree::remove(self, key)
    }

    fn search(&self, key: &K) -> Result<&K> {
        BTree::search(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        BTree::contains(self, key)
    }

    fn num_keys(&self) -> usize {
        self.key_count
    }

    fn height(&self) -> usize {
        self.height
    }
}
