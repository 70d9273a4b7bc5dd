//! # Domain Entities
//!
//! Chainpoint v2 receipt as submitted by a client.

use serde::{Deserialize, Serialize};
use shared_ots::{Attestation, NodeId, TimestampTree};

use super::errors::ConversionError;
use super::value_objects::ProofStep;

/// `@context` value: a single IRI or a list of them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ReceiptContext {
    /// `"@context": "https://w3id.org/chainpoint/v2"`
    Single(String),
    /// `"@context": ["https://w3id.org/chainpoint/v2", ...]`
    Many(Vec<String>),
}

impl ReceiptContext {
    /// Does the context name `iri`?
    pub fn includes(&self, iri: &str) -> bool {
        match self {
            ReceiptContext::Single(value) => value == iri,
            ReceiptContext::Many(values) => values.iter().any(|v| v == iri),
        }
    }
}

/// One Merkle proof step: exactly one of `left` / `right` is expected.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofItem {
    /// Left sibling (hex).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    /// Right sibling (hex).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
}

impl ProofItem {
    /// Step whose sibling sits on the left.
    pub fn left(sibling: impl Into<String>) -> Self {
        Self {
            left: Some(sibling.into()),
            right: None,
        }
    }

    /// Step whose sibling sits on the right.
    pub fn right(sibling: impl Into<String>) -> Self {
        Self {
            left: None,
            right: Some(sibling.into()),
        }
    }

    /// Decode into a typed step. `left` wins when both sides are present.
    pub fn step(&self) -> Result<ProofStep, ConversionError> {
        let decode = |side: &str, value: &str| {
            hex::decode(value).map_err(|e| {
                ConversionError::MalformedProof(format!("invalid {} sibling {:?}: {}", side, value, e))
            })
        };
        match (&self.left, &self.right) {
            (Some(left), _) => Ok(ProofStep::Left(decode("left", left)?)),
            (None, Some(right)) => Ok(ProofStep::Right(decode("right", right)?)),
            (None, None) => Err(ConversionError::MalformedProof(
                "proof item names neither a left nor a right sibling".to_string(),
            )),
        }
    }
}

/// Anchor metadata: where the receipt's Merkle root was published.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Anchor {
    /// Anchor kind (`BTCOpReturn`, `ETHData`, ...).
    #[serde(rename = "type")]
    pub anchor_type: String,
    /// Source identifier; a txid for `BTCOpReturn`.
    #[serde(rename = "sourceId")]
    pub source_id: String,
}

impl Anchor {
    /// Create an anchor.
    pub fn new(anchor_type: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            anchor_type: anchor_type.into(),
            source_id: source_id.into(),
        }
    }
}

/// Chainpoint v2 receipt.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainpointReceipt {
    /// JSON-LD context (`@context`, or bare `context`).
    #[serde(rename = "@context", alias = "context", default)]
    pub context: Option<ReceiptContext>,
    /// Receipt type, expected `ChainpointSHA256v2`.
    #[serde(rename = "type", default)]
    pub receipt_type: Option<String>,
    /// Hash being timestamped (hex).
    #[serde(rename = "targetHash")]
    pub target_hash: String,
    /// Declared Merkle root (hex).
    #[serde(rename = "merkleRoot")]
    pub merkle_root: String,
    /// Merkle path from target hash to root.
    #[serde(default)]
    pub proof: Vec<ProofItem>,
    /// Anchors; absent means the receipt carries no attestation.
    #[serde(default)]
    pub anchors: Option<Vec<Anchor>>,
}

impl ChainpointReceipt {
    /// Parse a receipt from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConversionError> {
        serde_json::from_str(json).map_err(|e| ConversionError::MalformedReceipt(e.to_string()))
    }
}

/// Converted receipt: the proof tree with its attestations resolved.
#[derive(Clone, Debug)]
pub struct ResolvedTimestamp {
    /// Proof tree.
    pub tree: TimestampTree,
    /// Root node (the receipt's target hash).
    pub root: NodeId,
    /// Number of attestations resolved to a block height.
    pub resolved: usize,
}

impl ResolvedTimestamp {
    /// Every attestation reachable from the root.
    pub fn attestations(&self) -> Vec<&Attestation> {
        self.tree
            .all_attestations(self.root)
            .into_iter()
            .map(|(_, attestation)| attestation)
            .collect()
    }

    /// Human-readable rendering of the proof.
    pub fn str_tree(&self) -> String {
        self.tree.str_tree(self.root)
    }
}
