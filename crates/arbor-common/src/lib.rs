//! Shared types for the arbor index structures.
//!
//! This crate provides the error taxonomy and configuration structs used by
//! the tree and filter crates.

pub mod config;
pub mod error;

pub use config::{
    BloomConfig, CuckooConfig, TreeConfig, HIGH_LOAD_HEADROOM, MAX_BUCKET_SLOTS, MIN_TREE_DEGREE,
};
pub use error::{ArborError, Result};
