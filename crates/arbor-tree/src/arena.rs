//! Index-addressed node storage for the trees.

use std::ops::{Index, IndexMut};

/// Handle to a node stored in a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(u32);

impl NodeId {
    /// Returns the slot number backing this handle.
    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Growable arena of tree nodes.
///
/// Slot numbers map directly to Vec indices. Released slots are recycled by
/// later allocations, so a tree that shrinks and regrows does not leak slots.
/// Each node is reachable from exactly one parent; the arena itself holds no
/// structural links.
#[derive(Debug, Clone)]
pub(crate) struct NodeArena<N> {
    /// Node slots (None = released).
    slots: Vec<Option<N>>,
    /// Released slots available for reuse.
    free: Vec<u32>,
    /// Number of occupied slots.
    live: usize,
}

impl<N> Default for NodeArena<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> NodeArena<N> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Stores a node and returns its handle.
    #[inline]
    pub fn allocate(&mut self, node: N) -> NodeId {
        self.live += 1;
        if let Some(slot) = self.free.pop() {
            self.slots[slot as usize] = Some(node);
            return NodeId(slot);
        }
        let slot = self.slots.len() as u32;
        self.slots.push(Some(node));
        NodeId(slot)
    }

    /// Removes a node from the arena and returns it.
    ///
    /// Panics if the slot was already released, which means a parent still
    /// pointed at a node the tree had merged away.
    #[inline]
    pub fn release(&mut self, id: NodeId) -> N {
        match self.slots[id.0 as usize].take() {
            Some(node) => {
                self.free.push(id.0);
                self.live -= 1;
                node
            }
            None => panic!("node {} released twice", id.0),
        }
    }

    /// Returns the node, or None if the slot is free or out of range.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&N> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Returns the node mutably, or None if the slot is free or out of range.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut N> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Number of live nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }
}

impl<N> Index<NodeId> for NodeArena<N> {
    type Output = N;

    #[inline]
    fn index(&self, id: NodeId) -> &N {
        match self.get(id) {
            Some(node) => node,
            None => panic!("node {} is not live", id.0),
        }
    }
}

impl<N> IndexMut<NodeId> for NodeArena<N> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut N {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("node {} is not live", id.0),
        }
    }
}
