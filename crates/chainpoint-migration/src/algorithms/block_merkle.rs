//! # Block Merkle Verification
//!
//! Rebuilds a block's transaction Merkle tree as OTS operations and checks it
//! against the root the data source reported.
//!
//! Every pair is joined with [`cat_sha256d`], which makes the concatenated
//! node a child of BOTH operands. An attestation placed at the tip is then
//! reachable from every transaction leaf.

use shared_ots::{sha256d, Attestation, Hash, NodeId, Operation, TimestampTree};
use tracing::debug;

use crate::domain::{BlockSummary, ConversionError};

/// Join two nodes into `sha256d(left || right)`.
///
/// `left` gets `Append(right.msg)` and `right` gets `Prepend(left.msg)`, both
/// pointing at the same concatenation node. When `left` and `right` are the
/// same node (odd-round duplication) only the `Append` edge is installed.
pub fn cat_sha256d(
    tree: &mut TimestampTree,
    left: NodeId,
    right: NodeId,
) -> Result<NodeId, ConversionError> {
    let right_msg = tree.msg(right).to_vec();

    let joined = if left == right {
        tree.add(left, Operation::Append(right_msg))
    } else {
        let left_msg = tree.msg(left).to_vec();
        let joined = tree.add(right, Operation::Prepend(left_msg));
        tree.link(left, Operation::Append(right_msg), joined)?;
        joined
    };

    Ok(tree.add(joined, Operation::Sha256d))
}

/// Combine `leaves` pairwise, round by round, into a single tip.
///
/// A trailing singleton is self-paired only when its round produced at least
/// one pair. Returns `None` for an empty leaf list.
pub fn make_merkle_tree(
    tree: &mut TimestampTree,
    leaves: Vec<NodeId>,
) -> Result<Option<NodeId>, ConversionError> {
    let mut stamps = leaves;

    loop {
        let mut iter = stamps.into_iter();
        let mut pending = iter.next();
        let mut next_round = Vec::new();

        for stamp in iter {
            match pending.take() {
                None => pending = Some(stamp),
                Some(left) => next_round.push(cat_sha256d(tree, left, stamp)?),
            }
        }

        if next_round.is_empty() {
            return Ok(pending);
        }

        if let Some(last) = pending {
            next_round.push(cat_sha256d(tree, last, last)?);
        }

        stamps = next_round;
    }
}

/// Bitcoin Merkle root over internal-byte-order hashes.
pub fn compute_merkle_root(hashes: &[Hash]) -> Option<Hash> {
    if hashes.is_empty() {
        return None;
    }

    let mut level: Vec<Hash> = hashes.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left); // duplicate last if odd
                let mut data = Vec::with_capacity(64);
                data.extend_from_slice(left);
                data.extend_from_slice(right);
                sha256d(&data)
            })
            .collect();
    }

    Some(level[0])
}

/// Block whose Merkle tree was rebuilt and matched the reported root.
#[derive(Clone, Debug)]
pub struct VerifiedBlock {
    /// Block tree; the tip carries the height attestation.
    pub tree: TimestampTree,
    /// Merkle tip.
    pub tip: NodeId,
    /// One leaf per transaction, block order.
    pub leaves: Vec<NodeId>,
    /// Block height.
    pub height: u64,
}

impl VerifiedBlock {
    /// Leaf whose message is `digest` (a reversed txid).
    pub fn leaf_for(&self, digest: &[u8]) -> Option<NodeId> {
        self.leaves
            .iter()
            .copied()
            .find(|&leaf| self.tree.msg(leaf) == digest)
    }
}

fn reversed_hex(value: &str, what: &str) -> Result<Vec<u8>, ConversionError> {
    let mut bytes = hex::decode(value)
        .map_err(|e| ConversionError::RpcError(format!("invalid {} {:?}: {}", what, value, e)))?;
    bytes.reverse();
    Ok(bytes)
}

/// Rebuild the block's Merkle tree and attest its height at the tip.
///
/// # Errors
/// - `RpcError` when a txid or the root is not hex
/// - `MerkleMismatch` when the rebuilt root differs, or the block lists no tx
pub fn verify_block(block: &BlockSummary) -> Result<VerifiedBlock, ConversionError> {
    let expected = reversed_hex(&block.merkleroot, "merkleroot")?;

    let mut tree = TimestampTree::new();
    let mut leaves = Vec::with_capacity(block.tx.len());
    for txid in &block.tx {
        let digest = reversed_hex(txid, "txid")?;
        leaves.push(tree.insert(digest));
    }

    let mismatch = |computed: String| ConversionError::MerkleMismatch {
        height: block.height,
        expected: block.merkleroot.clone(),
        computed,
    };

    let tip = make_merkle_tree(&mut tree, leaves.clone())?
        .ok_or_else(|| mismatch(String::new()))?;

    if tree.msg(tip) != expected.as_slice() {
        let mut computed = tree.msg(tip).to_vec();
        computed.reverse();
        return Err(mismatch(hex::encode(computed)));
    }

    tree.attest(tip, Attestation::bitcoin(block.height));
    debug!(
        "[block] verified {} txs at height {}",
        block.tx.len(),
        block.height
    );

    Ok(VerifiedBlock {
        tree,
        tip,
        leaves,
        height: block.height,
    })
}
