//! Error types for the arbor index structures.

use thiserror::Error;

/// Result type alias using ArborError.
pub type Result<T> = std::result::Result<T, ArborError>;

/// Errors that can occur in tree and filter operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArborError {
    // Tree errors
    #[error("Key not found{}", describe_key(.key))]
    KeyNotFound { key: Option<String> },

    #[error("Tree is empty")]
    EmptyTree,

    #[error("Minimum degree mismatch: expected {expected}, got {actual}")]
    DegreeMismatch { expected: usize, actual: usize },

    #[error("Tree corrupted: {0}")]
    TreeCorrupted(String),

    // Filter errors
    #[error("Relocation threshold reached: {threshold}")]
    RelocationThresholdReached { threshold: u32 },

    #[error("Slot {index} is out of bucket range: {size}")]
    OutOfRange { index: u64, size: u64 },

    // Configuration errors
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter { name: String, value: String },
}

impl ArborError {
    /// Builds an `InvalidParameter` error from any displayable value.
    pub fn invalid(name: &str, value: impl std::fmt::Display) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Returns true for conditions callers are expected to handle and move past.
    ///
    /// A missing key or a dropped filter insert leaves the structure usable.
    /// Everything else points at bad parameters or a broken structure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::KeyNotFound { .. } | Self::RelocationThresholdReached { .. }
        )
    }
}

fn describe_key(key: &Option<String>) -> String {
    match key {
        Some(key) => format!(": {key}"),
        None => String::new(),
    }
}
