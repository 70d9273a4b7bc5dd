//! # Domain Value Objects
//!
//! Immutable values exchanged with block data sources.

use serde::{Deserialize, Serialize};

/// Decoded Merkle proof step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProofStep {
    /// Sibling is on the left: `sha256(sibling || current)`.
    Left(Vec<u8>),
    /// Sibling is on the right: `sha256(current || sibling)`.
    Right(Vec<u8>),
}

/// Block data needed to rebuild the transaction Merkle tree.
///
/// Both bitcoind `getblock` and Insight `/block/{hash}` use these field names.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockSummary {
    /// Block height.
    pub height: u64,
    /// Merkle root, hex as served (big-endian display order).
    pub merkleroot: String,
    /// Transaction ids in block order.
    pub tx: Vec<String>,
}

/// Location of a transaction.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxInfo {
    /// Containing block hash; absent while unconfirmed.
    #[serde(default)]
    pub blockhash: Option<String>,
}

impl TxInfo {
    /// Confirmed in `blockhash`.
    pub fn confirmed(blockhash: impl Into<String>) -> Self {
        Self {
            blockhash: Some(blockhash.into()),
        }
    }
}

/// Block header fields returned by `getblockheader`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockHeaderInfo {
    /// Block hash.
    pub hash: String,
    /// Merkle root.
    pub merkleroot: String,
    /// Header timestamp (unix seconds).
    pub time: u64,
}
