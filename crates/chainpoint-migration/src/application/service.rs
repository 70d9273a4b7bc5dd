//! # Converter Service
//!
//! Application service orchestrating a full receipt conversion.
//!
//! envelope check -> declared root check -> proof migration -> attestation
//! migration -> concurrent resolution -> sequential splice

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, error, info};

use super::resolver::AttestationResolver;
use crate::algorithms::{calculate_merkle_root, migration_attestations, migration_merkle};
use crate::config::ConverterConfig;
use crate::domain::{
    check_valid_header, BlockHeaderInfo, ChainpointReceipt, ConversionError, ResolvedTimestamp,
};
use crate::ports::ConverterApi;

/// Converter Service - turns receipts into resolved OTS proofs.
#[derive(Clone)]
pub struct ConverterService {
    resolver: AttestationResolver,
}

impl ConverterService {
    /// Service over `resolver`.
    pub fn new(resolver: AttestationResolver) -> Self {
        Self { resolver }
    }

    /// Service with the sources described by `config`.
    pub fn from_config(config: &ConverterConfig) -> Result<Self, ConversionError> {
        Ok(Self::new(AttestationResolver::from_config(config)?))
    }
}

#[async_trait]
impl ConverterApi for ConverterService {
    async fn convert(
        &self,
        receipt: &ChainpointReceipt,
    ) -> Result<ResolvedTimestamp, ConversionError> {
        check_valid_header(receipt)?;

        let computed = calculate_merkle_root(&receipt.target_hash, &receipt.proof)?;
        if !computed.eq_ignore_ascii_case(&receipt.merkle_root) {
            return Err(ConversionError::MalformedReceipt(format!(
                "Invalid merkle root: declared {}, computed {}",
                receipt.merkle_root, computed
            )));
        }

        let (mut tree, root) = migration_merkle(&receipt.target_hash, &receipt.proof)?;
        let anchors = receipt.anchors.as_deref().unwrap_or_default();
        migration_attestations(anchors, &mut tree, root)?;
        debug!("[converter] migrated proof:\n{}", tree.str_tree(root));

        let pending: Vec<_> = tree
            .all_attestations(root)
            .into_iter()
            .filter_map(|(node, attestation)| {
                attestation
                    .bitcoin_payload()
                    .map(|payload| (node, tree.msg(node).to_vec(), hex::encode(payload)))
            })
            .collect();
        info!("[converter] resolving {} pending attestations", pending.len());

        let results = join_all(pending.iter().map(|(_, msg, txid)| {
            self.resolver.fetch_anchor_proof(msg, txid, false)
        }))
        .await;

        let mut proofs = Vec::with_capacity(results.len());
        for ((_, _, txid), result) in pending.iter().zip(results) {
            match result {
                Ok(proof) => proofs.push(proof),
                Err(e) => {
                    error!("[converter] attestation {} unresolved: {}", txid, e);
                    return Err(e);
                }
            }
        }

        for ((node, _, _), proof) in pending.iter().zip(&proofs) {
            proof.splice(&mut tree, *node)?;
        }

        info!("[converter] {} attestations resolved", proofs.len());
        Ok(ResolvedTimestamp {
            tree,
            root,
            resolved: proofs.len(),
        })
    }

    async fn block_header(&self, height: u64) -> Result<BlockHeaderInfo, ConversionError> {
        let label = format!("block-header/{}", height);
        self.resolver
            .policy()
            .run(&label, false, |source| async move {
                let hash = source.block_hash(height).await?;
                source.block_header(&hash).await
            })
            .await
    }
}
