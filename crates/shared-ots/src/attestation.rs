//! # Attestations
//!
//! Claims anchoring a message. A pending OP_RETURN claim is unverified; it is
//! replaced by a block-height claim once the containing block is corroborated.

use std::fmt;

/// Tag OpenTimestamps uses for Bitcoin attestations.
pub const BITCOIN_OP_RETURN_TAG: [u8; 8] = [0x68, 0x7F, 0xE3, 0xFE, 0x79, 0x5E, 0x9A, 0x0D];

/// Attestation attached to a tree node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Attestation {
    /// Unresolved OP_RETURN claim. `payload` is the anchoring transaction id.
    PendingOpReturn {
        /// Attestation tag
        tag: [u8; 8],
        /// Opaque payload (txid bytes as written in the receipt)
        payload: Vec<u8>,
    },
    /// Message is committed in the Merkle root of the block at `height`.
    BitcoinBlockHeader {
        /// Block height
        height: u64,
    },
}

impl Attestation {
    /// Pending Bitcoin OP_RETURN attestation for a transaction id.
    pub fn pending_op_return(payload: Vec<u8>) -> Self {
        Attestation::PendingOpReturn {
            tag: BITCOIN_OP_RETURN_TAG,
            payload,
        }
    }

    /// Resolved block-height attestation.
    pub fn bitcoin(height: u64) -> Self {
        Attestation::BitcoinBlockHeader { height }
    }

    /// Is this a pending (unresolved) attestation?
    pub fn is_pending(&self) -> bool {
        matches!(self, Attestation::PendingOpReturn { .. })
    }

    /// Payload of a pending Bitcoin attestation, if this is one.
    pub fn bitcoin_payload(&self) -> Option<&[u8]> {
        match self {
            Attestation::PendingOpReturn { tag, payload } if *tag == BITCOIN_OP_RETURN_TAG => {
                Some(payload)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Attestation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attestation::PendingOpReturn { tag, payload } => write!(
                f,
                "UnknownAttestation {} {}",
                hex::encode(tag),
                hex::encode(payload)
            ),
            Attestation::BitcoinBlockHeader { height } => {
                write!(f, "BitcoinBlockHeaderAttestation({})", height)
            }
        }
    }
}
