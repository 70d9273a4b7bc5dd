//! # Outbound Ports
//!
//! Block data sources (trusted node, mirror quorum) and their test doubles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use shared_ots::{sha256d, Hash};

use crate::algorithms::compute_merkle_root;
use crate::domain::{BlockHeaderInfo, BlockSummary, ConversionError, TxInfo};

/// Block data source - outbound port.
///
/// Identifiers are hex strings in display order, as served by bitcoind.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Raw transaction, hex.
    async fn raw_transaction(&self, txid: &str) -> Result<String, ConversionError>;

    /// Transaction location.
    async fn transaction(&self, txid: &str) -> Result<TxInfo, ConversionError>;

    /// Block height, Merkle root and txid list.
    async fn block(&self, hash: &str) -> Result<BlockSummary, ConversionError>;

    /// Hash of the block at `height`.
    async fn block_hash(&self, height: u64) -> Result<String, ConversionError>;

    /// Block header summary.
    async fn block_header(&self, hash: &str) -> Result<BlockHeaderInfo, ConversionError>;

    /// Source identifier (for logging).
    fn source_id(&self) -> &str;
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

/// In-memory block source.
pub struct MockBlockSource {
    /// Source identifier.
    pub id: String,
    /// txid -> raw transaction hex.
    pub raw_txs: HashMap<String, String>,
    /// txid -> location.
    pub txs: HashMap<String, TxInfo>,
    /// block hash -> block.
    pub blocks: HashMap<String, BlockSummary>,
    /// height -> block hash.
    pub heights: HashMap<u64, String>,
    /// block hash -> header.
    pub headers: HashMap<String, BlockHeaderInfo>,
    /// Should return errors?
    pub should_fail: bool,
    calls: AtomicUsize,
}

impl Default for MockBlockSource {
    fn default() -> Self {
        Self::new("mock-source")
    }
}

impl MockBlockSource {
    /// Empty source named `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            raw_txs: HashMap::new(),
            txs: HashMap::new(),
            blocks: HashMap::new(),
            heights: HashMap::new(),
            headers: HashMap::new(),
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails with `RpcError`.
    pub fn failing(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Serve a raw transaction.
    pub fn with_raw_transaction(mut self, txid: &str, raw_hex: impl Into<String>) -> Self {
        self.raw_txs.insert(txid.to_string(), raw_hex.into());
        self
    }

    /// Report `txid` as confirmed in `block_hash`.
    pub fn with_transaction(mut self, txid: &str, block_hash: &str) -> Self {
        self.txs.insert(txid.to_string(), TxInfo::confirmed(block_hash));
        self
    }

    /// Serve a block.
    pub fn with_block(mut self, hash: &str, block: BlockSummary) -> Self {
        self.heights.insert(block.height, hash.to_string());
        self.headers.insert(
            hash.to_string(),
            BlockHeaderInfo {
                hash: hash.to_string(),
                merkleroot: block.merkleroot.clone(),
                time: 1_231_006_505 + block.height * 600,
            },
        );
        self.blocks.insert(hash.to_string(), block);
        self
    }

    /// Serve an anchoring transaction and its block.
    pub fn with_anchored(self, anchored: AnchoredBlock) -> Self {
        let raw_hex = anchored.raw_tx_hex();
        self.with_raw_transaction(&anchored.txid, raw_hex)
            .with_transaction(&anchored.txid, &anchored.block_hash)
            .with_block(&anchored.block_hash, anchored.block)
    }

    /// Number of calls answered so far (failed ones included).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lookup<K, V>(&self, map: &HashMap<K, V>, key: &K, what: &str) -> Result<V, ConversionError>
    where
        K: std::hash::Hash + Eq + std::fmt::Display,
        V: Clone,
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(ConversionError::RpcError("Mock failure".to_string()));
        }
        map.get(key).cloned().ok_or_else(|| {
            ConversionError::RpcError(format!("{}: no {} {}", self.id, what, key))
        })
    }
}

#[async_trait]
impl BlockSource for MockBlockSource {
    async fn raw_transaction(&self, txid: &str) -> Result<String, ConversionError> {
        self.lookup(&self.raw_txs, &txid.to_string(), "rawtx")
    }

    async fn transaction(&self, txid: &str) -> Result<TxInfo, ConversionError> {
        self.lookup(&self.txs, &txid.to_string(), "tx")
    }

    async fn block(&self, hash: &str) -> Result<BlockSummary, ConversionError> {
        self.lookup(&self.blocks, &hash.to_string(), "block")
    }

    async fn block_hash(&self, height: u64) -> Result<String, ConversionError> {
        self.lookup(&self.heights, &height, "block at height")
    }

    async fn block_header(&self, hash: &str) -> Result<BlockHeaderInfo, ConversionError> {
        self.lookup(&self.headers, &hash.to_string(), "header")
    }

    fn source_id(&self) -> &str {
        &self.id
    }
}

/// A legacy transaction whose OP_RETURN output carries `commitment`, mined
/// in a block among filler transactions.
#[derive(Clone, Debug)]
pub struct AnchoredBlock {
    /// Legacy serialization of the anchoring transaction.
    pub raw_tx: Vec<u8>,
    /// Anchoring txid (display order).
    pub txid: String,
    /// Containing block hash.
    pub block_hash: String,
    /// Containing block.
    pub block: BlockSummary,
}

fn display(hash: &Hash) -> String {
    let mut bytes = hash.to_vec();
    bytes.reverse();
    hex::encode(bytes)
}

fn op_return_script(data: &[u8]) -> Vec<u8> {
    let mut script = vec![0x6a];
    if data.len() <= 75 {
        script.push(data.len() as u8);
    } else {
        script.push(0x4c); // OP_PUSHDATA1
        script.push(data.len().min(249) as u8);
    }
    script.extend_from_slice(&data[..data.len().min(249)]);
    script
}

impl AnchoredBlock {
    /// Anchoring transaction placed at `position` among `tx_count` txs.
    ///
    /// `position` is clamped into range and `tx_count` is at least one.
    pub fn new(commitment: &[u8], height: u64, tx_count: usize, position: usize) -> Self {
        let tx_count = tx_count.max(1);
        let position = position.min(tx_count - 1);

        let script = op_return_script(commitment);
        let mut raw_tx = vec![0x01, 0x00, 0x00, 0x00]; // version
        raw_tx.push(0x01); // one input
        raw_tx.extend(sha256d(&height.to_le_bytes())); // prev txid
        raw_tx.extend([0x00; 4]); // prev index
        raw_tx.push(0x00); // empty scriptSig
        raw_tx.extend([0xff; 4]); // sequence
        raw_tx.push(0x01); // one output
        raw_tx.extend([0x00; 8]); // value
        raw_tx.push(script.len() as u8);
        raw_tx.extend(script);
        raw_tx.extend([0x00; 4]); // locktime

        let anchor_hash = sha256d(&raw_tx);
        let hashes: Vec<Hash> = (0..tx_count)
            .map(|i| {
                if i == position {
                    anchor_hash
                } else {
                    sha256d(&[&height.to_le_bytes()[..], &(i as u64).to_le_bytes()[..]].concat())
                }
            })
            .collect();

        let root = compute_merkle_root(&hashes).unwrap_or(anchor_hash);
        let block_hash = display(&sha256d(&[&root[..], &height.to_le_bytes()[..]].concat()));

        Self {
            raw_tx,
            txid: display(&anchor_hash),
            block_hash,
            block: BlockSummary {
                height,
                merkleroot: display(&root),
                tx: hashes.iter().map(display).collect(),
            },
        }
    }

    /// Raw transaction, hex.
    pub fn raw_tx_hex(&self) -> String {
        hex::encode(&self.raw_tx)
    }

    /// Mock source serving this transaction and block.
    pub fn into_mock_source(self, id: &str) -> MockBlockSource {
        MockBlockSource::new(id).with_anchored(self)
    }
}
