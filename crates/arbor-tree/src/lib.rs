//! Arena-backed in-memory ordered trees.
//!
//! This crate provides:
//! - A B-tree with proactive splitting and top-down delete repair
//! - A B+ tree with linked leaves, range scans and bottom-up repair
//! - The `OrderedIndex` trait both trees implement
//! - Comparator and key formatter capabilities for generic keys

mod arena;
mod bplus;
mod btree;
mod index;
mod node;
mod types;

pub use bplus::{BPlusTree, Iter};
pub use btree::BTree;
pub use index::OrderedIndex;
pub use types::{KeyComparator, KeyFormatter, NaturalOrder, OrderBy};
