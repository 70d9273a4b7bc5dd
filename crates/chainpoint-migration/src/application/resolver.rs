//! # Attestation Resolver
//!
//! Turns a pending OP_RETURN attestation into a block-height attestation.
//!
//! # Algorithm
//!
//! 1. Fetch the raw transaction and strip its witness data.
//! 2. Locate the node's message inside it; the bytes before and after become
//!    the `Prepend` / `Append` of the extension, followed by `Sha256, Sha256`.
//! 3. Check that the extension hashes to the txid.
//! 4. Fetch the containing block and rebuild its Merkle tree.
//! 5. Splice: clear the pending attestations, add the extension, and graft the
//!    txid's leaf from the block tree at the end of the extension.
//!
//! Steps 1-4 never touch the proof tree, so a failed attempt leaves it as it
//! was and can be retried against another source.

use std::sync::Arc;

use shared_ots::{NodeId, Operation, TimestampTree};
use tracing::{debug, info};

use super::policy::ResolutionPolicy;
use crate::adapters::{BitcoindRpcClient, InsightQuorum};
use crate::algorithms::{find_subslice, strip_witness, transaction_hash, verify_block, VerifiedBlock};
use crate::config::ConverterConfig;
use crate::domain::ConversionError;
use crate::ports::outbound::BlockSource;

/// Operations between the attested message and the transaction hash.
pub const TX_EXTENSION_DEPTH: usize = 4;

/// Everything needed to splice a resolved attestation, fetched and verified.
#[derive(Clone, Debug)]
pub struct AnchorProof {
    /// Anchoring transaction id.
    pub txid: String,
    /// Legacy transaction bytes before the message.
    pub prefix: Vec<u8>,
    /// Legacy transaction bytes after the message.
    pub suffix: Vec<u8>,
    /// Verified containing block.
    pub block: VerifiedBlock,
    /// The transaction's leaf in `block.tree`.
    pub leaf: NodeId,
    /// Source that answered.
    pub source: String,
}

impl AnchorProof {
    /// Operations taking the attested message to the transaction hash.
    pub fn extension(&self) -> [Operation; TX_EXTENSION_DEPTH] {
        [
            Operation::Prepend(self.prefix.clone()),
            Operation::Append(self.suffix.clone()),
            Operation::Sha256,
            Operation::Sha256,
        ]
    }

    /// Block height the proof resolves to.
    pub fn height(&self) -> u64 {
        self.block.height
    }

    /// Splice into `tree` at `node`. Returns the transaction-hash node.
    pub fn splice(&self, tree: &mut TimestampTree, node: NodeId) -> Result<NodeId, ConversionError> {
        let cleared = tree.clear_pending(node);

        let mut cursor = node;
        for op in self.extension() {
            cursor = tree.add(cursor, op);
        }
        tree.graft(cursor, &self.block.tree, self.leaf)?;

        debug!(
            "[resolver] spliced {} at height {} ({} pending cleared)",
            self.txid,
            self.height(),
            cleared
        );
        Ok(cursor)
    }
}

fn not_found(txid: &str, reason: impl Into<String>) -> ConversionError {
    ConversionError::AttestationNotFound {
        txid: txid.to_string(),
        reason: reason.into(),
    }
}

/// Fetch and verify against a single source.
async fn verify_with(
    source: Arc<dyn BlockSource>,
    msg: &[u8],
    txid: &str,
) -> Result<AnchorProof, ConversionError> {
    let mut digest = hex::decode(txid).map_err(|_| not_found(txid, "txid is not hex"))?;
    digest.reverse();

    let raw_hex = source.raw_transaction(txid).await?;
    let raw = hex::decode(raw_hex.trim())
        .map_err(|e| ConversionError::MalformedTransaction(format!("{}: {}", txid, e)))?;
    let legacy = strip_witness(&raw)?;

    let offset = find_subslice(&legacy, msg)
        .ok_or_else(|| not_found(txid, "message not present in transaction"))?;
    if transaction_hash(&legacy).as_slice() != digest.as_slice() {
        return Err(not_found(txid, "transaction does not hash to txid"));
    }
    let prefix = legacy[..offset].to_vec();
    let suffix = legacy[offset + msg.len()..].to_vec();

    let block_hash = source
        .transaction(txid)
        .await?
        .blockhash
        .ok_or_else(|| not_found(txid, "transaction unconfirmed"))?;
    let summary = source.block(&block_hash).await?;
    let block = verify_block(&summary)?;

    let leaf = block
        .leaf_for(&digest)
        .ok_or_else(|| ConversionError::TransactionNotInBlock {
            txid: txid.to_string(),
            block_hash: block_hash.clone(),
        })?;

    Ok(AnchorProof {
        txid: txid.to_string(),
        prefix,
        suffix,
        block,
        leaf,
        source: source.source_id().to_string(),
    })
}

/// Resolves pending attestations through a [`ResolutionPolicy`].
#[derive(Clone)]
pub struct AttestationResolver {
    policy: ResolutionPolicy,
}

impl AttestationResolver {
    /// Resolver over `policy`.
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self { policy }
    }

    /// Resolver with the sources described by `config`.
    pub fn from_config(config: &ConverterConfig) -> Result<Self, ConversionError> {
        config.validate()?;

        let quorum: Arc<dyn BlockSource> = Arc::new(InsightQuorum::from_config(&config.quorum)?);
        let policy = match (&config.bitcoind, config.mode.uses_node()) {
            (Some(bitcoind), true) => {
                let node: Arc<dyn BlockSource> = Arc::new(BitcoindRpcClient::new(bitcoind)?);
                ResolutionPolicy::new(config.mode, Some(node), quorum)?
            }
            // validate() rejects node modes without bitcoind settings
            _ => ResolutionPolicy::quorum_only(quorum),
        };

        Ok(Self::new(policy))
    }

    /// Policy in use.
    pub fn policy(&self) -> &ResolutionPolicy {
        &self.policy
    }

    /// Fetch and verify the proof that `msg` is committed in `txid`.
    pub async fn fetch_anchor_proof(
        &self,
        msg: &[u8],
        txid: &str,
        quorum_only: bool,
    ) -> Result<AnchorProof, ConversionError> {
        let proof = self
            .policy
            .run(txid, quorum_only, |source| verify_with(source, msg, txid))
            .await?;
        info!(
            "[resolver] {} verified at height {} by {}",
            txid,
            proof.height(),
            proof.source
        );
        Ok(proof)
    }

    /// Resolve the pending attestation at `node` for `txid`.
    ///
    /// Returns the transaction-hash node below `node`.
    pub async fn resolve_attestation(
        &self,
        tree: &mut TimestampTree,
        node: NodeId,
        txid: &str,
        quorum_only: bool,
    ) -> Result<NodeId, ConversionError> {
        let msg = tree.msg(node).to_vec();
        let proof = self.fetch_anchor_proof(&msg, txid, quorum_only).await?;
        proof.splice(tree, node)
    }
}
