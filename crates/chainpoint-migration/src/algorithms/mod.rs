//! # Algorithms Module
//!
//! Pure migration and verification algorithms.

pub mod block_merkle;
pub mod migration;
pub mod quorum;
pub mod transaction;

pub use block_merkle::{cat_sha256d, compute_merkle_root, make_merkle_tree, verify_block, VerifiedBlock};
pub use migration::{calculate_merkle_root, migration_attestations, migration_merkle};
pub use quorum::check_quorum;
pub use transaction::{find_subslice, strip_witness, transaction_hash};
