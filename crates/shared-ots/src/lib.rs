//! # Shared OTS - OpenTimestamps Proof Primitives
//!
//! Building blocks shared by the migration subsystem and the runtime.
//!
//! ## Components
//!
//! | Module | Contents | Use Case |
//! |--------|----------|----------|
//! | `ops` | `Operation` | Append / Prepend / SHA-256 message transforms |
//! | `attestation` | `Attestation` | Pending OP_RETURN and Bitcoin block-height claims |
//! | `tree` | `TimestampTree`, `NodeId` | Arena-backed proof tree with shared sub-trees |
//! | `hashing` | `sha256`, `sha256d` | One-shot digests |
//!
//! ## Shared Sub-Trees
//!
//! Nodes live in an arena and edges are `NodeId` handles, so one node can be
//! reached from several parents. Anything attached below such a node is
//! visible through every parent edge.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attestation;
pub mod errors;
pub mod hashing;
pub mod ops;
pub mod tree;

// Re-exports
pub use attestation::{Attestation, BITCOIN_OP_RETURN_TAG};
pub use errors::TreeError;
pub use hashing::{sha256, sha256_many, sha256d, Hash};
pub use ops::Operation;
pub use tree::{NodeId, TimestampNode, TimestampTree};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
