//! # Inbound Ports
//!
//! API trait defining what the converter can do.

use async_trait::async_trait;

use crate::domain::{BlockHeaderInfo, ChainpointReceipt, ConversionError, ResolvedTimestamp};

/// Converter API - inbound port.
#[async_trait]
pub trait ConverterApi: Send + Sync {
    /// Convert a receipt into a resolved proof tree.
    ///
    /// Fails as a whole if any attestation cannot be resolved.
    async fn convert(
        &self,
        receipt: &ChainpointReceipt,
    ) -> Result<ResolvedTimestamp, ConversionError>;

    /// Header of the block at `height`.
    async fn block_header(&self, height: u64) -> Result<BlockHeaderInfo, ConversionError>;
}
