//! # Domain Invariants
//!
//! Envelope rules a receipt must satisfy before migration.

use super::entities::ChainpointReceipt;
use super::errors::ConversionError;

/// JSON-LD context of Chainpoint v2 receipts.
pub const CHAINPOINT_V2_CONTEXT: &str = "https://w3id.org/chainpoint/v2";

/// Only supported receipt type.
pub const CHAINPOINT_SHA256_V2: &str = "ChainpointSHA256v2";

/// Anchor type carrying a Bitcoin txid.
pub const BTC_OP_RETURN: &str = "BTCOpReturn";

/// Structural envelope validation.
///
/// # Errors
/// - `MalformedReceipt` when the context is missing or not Chainpoint v2
/// - `MalformedReceipt` when the type is not `ChainpointSHA256v2`
/// - `MalformedReceipt` when the receipt has no anchors
pub fn check_valid_header(receipt: &ChainpointReceipt) -> Result<(), ConversionError> {
    let context = receipt
        .context
        .as_ref()
        .ok_or_else(|| ConversionError::MalformedReceipt("Missing @context attribute".into()))?;

    if !context.includes(CHAINPOINT_V2_CONTEXT) {
        return Err(ConversionError::MalformedReceipt(
            "Support only Chainpoint v2".into(),
        ));
    }

    if receipt.receipt_type.as_deref() != Some(CHAINPOINT_SHA256_V2) {
        return Err(ConversionError::MalformedReceipt(format!(
            "Support only {}",
            CHAINPOINT_SHA256_V2
        )));
    }

    if receipt.anchors.is_none() {
        return Err(ConversionError::MalformedReceipt(
            "Support only timestamps with attestations".into(),
        ));
    }

    Ok(())
}
