//! # Chainpoint Migration
//!
//! Converts Chainpoint v2 receipts into OpenTimestamps proof trees and
//! resolves their pending Bitcoin attestations.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! A Chainpoint receipt proves that a target hash is committed in a Bitcoin
//! transaction through a Merkle path. This crate:
//! - rebuilds that path as an OTS operation chain,
//! - attaches a pending attestation per Bitcoin anchor,
//! - locates the commitment inside the anchoring transaction,
//! - rebuilds the containing block's Merkle tree and checks its root,
//! - splices a block-height attestation into the proof.
//!
//! ## Trust Model
//!
//! | Source | Trust | Rule |
//! |--------|-------|------|
//! | bitcoind RPC | trusted | single peer, 10s timeout per call |
//! | Explorer mirrors | untrusted | first value returned by two mirrors wins |
//! | Block data | untrusted | Merkle root recomputed from the txid list |
//!
//! ## Module Structure
//!
//! ```text
//! chainpoint-migration/
//! ├── domain/          # Receipt types, errors, envelope checks
//! ├── algorithms/      # Proof migration, block Merkle tree, tx codec, quorum rule
//! ├── ports/           # API trait (inbound) + BlockSource (outbound) + mock
//! ├── adapters/        # bitcoind JSON-RPC, Insight mirror quorum
//! ├── application/     # ResolutionPolicy, AttestationResolver, ConverterService
//! └── config.rs        # ConverterConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{BitcoindRpcClient, InsightMirror, InsightQuorum, DEFAULT_MIRRORS};
pub use algorithms::{
    calculate_merkle_root, cat_sha256d, check_quorum, compute_merkle_root, make_merkle_tree,
    migration_attestations, migration_merkle, strip_witness, verify_block, VerifiedBlock,
};
pub use application::{
    AnchorProof, AttestationResolver, ConverterService, ResolutionPolicy, TX_EXTENSION_DEPTH,
};
pub use config::{BitcoindConfig, ConverterConfig, QuorumConfig, ResolutionMode};
pub use domain::{
    check_valid_header, Anchor, BlockHeaderInfo, BlockSummary, ChainpointReceipt,
    ConversionError, ProofItem, ProofStep, ReceiptContext, ResolvedTimestamp, TxInfo, BTC_OP_RETURN,
    CHAINPOINT_SHA256_V2, CHAINPOINT_V2_CONTEXT,
};
pub use ports::{AnchoredBlock, BlockSource, ConverterApi, MockBlockSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
