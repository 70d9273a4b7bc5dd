//! # Domain Errors
//!
//! Error types for receipt migration and attestation resolution.

use shared_ots::TreeError;
use thiserror::Error;

/// Conversion error types.
///
/// `MalformedReceipt` / `MalformedProof` reject a receipt before migration.
/// The resolution errors are recoverable: the resolution policy may retry
/// them once against the public quorum.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Receipt envelope or field is invalid.
    #[error("Malformed receipt: {0}")]
    MalformedReceipt(String),

    /// Merkle proof item is invalid.
    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    /// The node's message does not occur in the anchoring transaction.
    #[error("Attestation not found in tx {txid}: {reason}")]
    AttestationNotFound {
        /// Anchoring transaction id
        txid: String,
        /// What was missing
        reason: String,
    },

    /// The block reported for a transaction does not contain it.
    #[error("Transaction {txid} not in block {block_hash}")]
    TransactionNotInBlock {
        /// Anchoring transaction id
        txid: String,
        /// Reported containing block
        block_hash: String,
    },

    /// Raw transaction bytes could not be decoded.
    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    /// Rebuilt Merkle root differs from the block's reported root.
    #[error("Merkle root mismatch at height {height}: expected {expected}, computed {computed}")]
    MerkleMismatch {
        /// Block height
        height: u64,
        /// Reported root (hex, as served)
        expected: String,
        /// Rebuilt root (hex, same byte order)
        computed: String,
    },

    /// No value was returned by two mirrors.
    #[error("Quorum not reached for {fact} ({responses} successful responses)")]
    QuorumNotReached {
        /// Queried fact (e.g. `rawtx/<txid>`)
        fact: String,
        /// Number of mirrors that answered
        responses: usize,
    },

    /// Transport failure or malformed response from a data source.
    #[error("RPC error: {0}")]
    RpcError(String),

    /// Proof tree invariant violated.
    #[error("Proof tree error: {0}")]
    Tree(#[from] TreeError),

    /// Configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ConversionError {
    /// Can the resolution policy retry this against another source?
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConversionError::AttestationNotFound { .. }
                | ConversionError::TransactionNotInBlock { .. }
                | ConversionError::MalformedTransaction(_)
                | ConversionError::MerkleMismatch { .. }
                | ConversionError::QuorumNotReached { .. }
                | ConversionError::RpcError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quorum_error_message() {
        let err = ConversionError::QuorumNotReached {
            fact: "rawtx/ab".to_string(),
            responses: 3,
        };
        assert!(err.to_string().contains("rawtx/ab"));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_merkle_mismatch_message() {
        let err = ConversionError::MerkleMismatch {
            height: 358391,
            expected: "aa".to_string(),
            computed: "bb".to_string(),
        };
        assert!(err.to_string().contains("358391"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(ConversionError::RpcError("timeout".into()).is_recoverable());
        assert!(ConversionError::MerkleMismatch {
            height: 1,
            expected: String::new(),
            computed: String::new(),
        }
        .is_recoverable());
        assert!(!ConversionError::MalformedReceipt("x".into()).is_recoverable());
        assert!(!ConversionError::MalformedProof("x".into()).is_recoverable());
        assert!(!ConversionError::InvalidConfig("x".into()).is_recoverable());
    }

    #[test]
    fn test_tree_error_converts() {
        let err: ConversionError = TreeError::CompositeEdge("sha256d".into()).into();
        assert!(matches!(err, ConversionError::Tree(_)));
    }
}
