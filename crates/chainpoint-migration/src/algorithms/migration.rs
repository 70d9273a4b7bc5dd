//! # Proof Migration
//!
//! Rebuilds a Chainpoint Merkle path as an operation chain and attaches the
//! receipt's anchors as pending attestations.
//!
//! # Algorithm
//!
//! For each proof item, leaf to root:
//! - left sibling:  `Prepend(sibling)`, then `Sha256`
//! - right sibling: `Append(sibling)`, then `Sha256`

use shared_ots::{sha256_many, Attestation, NodeId, Operation, TimestampTree};
use tracing::debug;

use crate::domain::{Anchor, ConversionError, ProofItem, ProofStep, BTC_OP_RETURN};

fn decode_target(target_hash: &str) -> Result<Vec<u8>, ConversionError> {
    hex::decode(target_hash)
        .map_err(|e| ConversionError::MalformedReceipt(format!("invalid targetHash: {}", e)))
}

/// Recompute the Merkle root declared by a receipt.
///
/// Returns lowercase hex. An empty proof yields the target hash itself.
pub fn calculate_merkle_root(
    target_hash: &str,
    proof: &[ProofItem],
) -> Result<String, ConversionError> {
    let mut current = decode_target(target_hash)?;

    for item in proof {
        current = match item.step()? {
            ProofStep::Left(sibling) => sha256_many(&[sibling.as_slice(), current.as_slice()]).to_vec(),
            ProofStep::Right(sibling) => sha256_many(&[current.as_slice(), sibling.as_slice()]).to_vec(),
        };
    }

    Ok(hex::encode(current))
}

/// Build the operation chain for a receipt's Merkle proof.
///
/// Returns the tree and its ROOT (the target digest), not the tip.
pub fn migration_merkle(
    target_hash: &str,
    proof: &[ProofItem],
) -> Result<(TimestampTree, NodeId), ConversionError> {
    let (mut tree, root) = TimestampTree::with_root(decode_target(target_hash)?);
    let mut cursor = root;

    for item in proof {
        let op = match item.step()? {
            ProofStep::Left(sibling) => Operation::Prepend(sibling),
            ProofStep::Right(sibling) => Operation::Append(sibling),
        };
        cursor = tree.add(cursor, op);
        cursor = tree.add(cursor, Operation::Sha256);
    }

    debug!(
        "[migration] proof of {} steps migrated, tip {}",
        proof.len(),
        hex::encode(tree.msg(cursor))
    );
    Ok((tree, root))
}

/// Attach a pending attestation per Bitcoin anchor to every leaf below `root`.
///
/// Anchors of other types are skipped. Returns the number of anchors migrated.
pub fn migration_attestations(
    anchors: &[Anchor],
    tree: &mut TimestampTree,
    root: NodeId,
) -> Result<usize, ConversionError> {
    let leaves = tree.leaves(root);
    let mut migrated = 0;

    for anchor in anchors {
        if anchor.anchor_type != BTC_OP_RETURN {
            debug!("[migration] skipping {} anchor", anchor.anchor_type);
            continue;
        }
        let payload = hex::decode(&anchor.source_id).map_err(|e| {
            ConversionError::MalformedReceipt(format!(
                "invalid sourceId {:?}: {}",
                anchor.source_id, e
            ))
        })?;
        let attestation = Attestation::pending_op_return(payload);
        for &leaf in &leaves {
            tree.attest(leaf, attestation.clone());
        }
        migrated += 1;
    }

    Ok(migrated)
}
