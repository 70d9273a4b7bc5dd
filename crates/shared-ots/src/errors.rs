//! Tree error types.

use thiserror::Error;

/// Timestamp tree errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    /// An edge would point at a node whose message is not the operation's result.
    #[error("Edge message mismatch: expected {expected}, got {actual}")]
    MessageMismatch {
        /// Hex of `op(parent.msg)`
        expected: String,
        /// Hex of the target node's message
        actual: String,
    },

    /// Composite operations cannot be stored as a single edge.
    #[error("Operation {0} cannot be linked directly")]
    CompositeEdge(String),
}
