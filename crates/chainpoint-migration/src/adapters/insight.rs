//! Insight Mirror Adapters
//!
//! `InsightMirror` talks to one public block explorer. `InsightQuorum` asks
//! every configured mirror in parallel and keeps the first answer returned
//! twice (see [`check_quorum`]).

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::algorithms::check_quorum;
use crate::config::QuorumConfig;
use crate::domain::{BlockHeaderInfo, BlockSummary, ConversionError, TxInfo};
use crate::ports::outbound::BlockSource;

/// Public Insight mirrors queried by default.
pub const DEFAULT_MIRRORS: [&str; 6] = [
    "https://www.localbitcoinschain.com/api",
    "https://search.bitaccess.co/insight-api",
    "https://insight.bitpay.com/api",
    "https://btc-bitcore1.trezor.io/api",
    "https://btc-bitcore4.trezor.io/api",
    "https://blockexplorer.com/api",
];

/// User agent sent to mirrors.
pub const USER_AGENT: &str = "opentimestamps";

#[derive(Debug, Serialize, Deserialize)]
struct RawTx {
    rawtx: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BlockIndex {
    #[serde(rename = "blockHash")]
    block_hash: String,
}

/// One Insight-compatible explorer.
pub struct InsightMirror {
    http_client: reqwest::Client,
    base_url: String,
}

impl InsightMirror {
    /// Mirror rooted at `base_url` (e.g. `https://insight.bitpay.com/api`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ConversionError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConversionError::InvalidConfig(format!("http client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Mirror base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ConversionError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("[insight] GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ConversionError::RpcError(format!("{}: {}", url, e)))?
            .error_for_status()
            .map_err(|e| ConversionError::RpcError(format!("{}: {}", url, e)))?;

        response
            .json()
            .await
            .map_err(|e| ConversionError::RpcError(format!("{}: malformed response: {}", url, e)))
    }
}

#[async_trait]
impl BlockSource for InsightMirror {
    async fn raw_transaction(&self, txid: &str) -> Result<String, ConversionError> {
        let raw: RawTx = self.get(&format!("rawtx/{}", txid)).await?;
        Ok(raw.rawtx)
    }

    async fn transaction(&self, txid: &str) -> Result<TxInfo, ConversionError> {
        self.get(&format!("tx/{}", txid)).await
    }

    async fn block(&self, hash: &str) -> Result<BlockSummary, ConversionError> {
        self.get(&format!("block/{}", hash)).await
    }

    async fn block_hash(&self, height: u64) -> Result<String, ConversionError> {
        let index: BlockIndex = self.get(&format!("block-index/{}", height)).await?;
        Ok(index.block_hash)
    }

    async fn block_header(&self, hash: &str) -> Result<BlockHeaderInfo, ConversionError> {
        self.get(&format!("block/{}", hash)).await
    }

    fn source_id(&self) -> &str {
        &self.base_url
    }
}

/// Quorum over untrusted mirrors.
pub struct InsightQuorum {
    mirrors: Vec<InsightMirror>,
}

impl InsightQuorum {
    /// Quorum over `mirrors`.
    pub fn new(mirrors: Vec<InsightMirror>) -> Self {
        Self { mirrors }
    }

    /// Quorum over the configured mirror list.
    pub fn from_config(config: &QuorumConfig) -> Result<Self, ConversionError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let mirrors = config
            .mirrors
            .iter()
            .map(|url| InsightMirror::new(url.as_str(), timeout))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(mirrors))
    }

    /// Number of mirrors.
    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    /// No mirrors configured.
    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    /// Ask every mirror for `path` and apply the quorum rule.
    ///
    /// Waits for every mirror to settle; failed mirrors are logged and dropped.
    async fn agree<R>(&self, path: &str) -> Result<R, ConversionError>
    where
        R: DeserializeOwned + Serialize,
    {
        let mut pending: FuturesUnordered<_> = self
            .mirrors
            .iter()
            .map(|mirror| async move { (mirror.base_url(), mirror.get::<R>(path).await) })
            .collect();

        let mut responses = Vec::with_capacity(self.mirrors.len());
        while let Some((mirror, result)) = pending.next().await {
            match result {
                Ok(value) => responses.push(value),
                Err(e) => warn!(mirror = %mirror, error = %e, "[insight] dropping response for {}", path),
            }
        }

        let answered = responses.len();
        let value = check_quorum(responses, path)?;
        info!("[insight] quorum reached for {} ({} of {} mirrors answered)", path, answered, self.mirrors.len());
        Ok(value)
    }
}

#[async_trait]
impl BlockSource for InsightQuorum {
    async fn raw_transaction(&self, txid: &str) -> Result<String, ConversionError> {
        let raw: RawTx = self.agree(&format!("rawtx/{}", txid)).await?;
        Ok(raw.rawtx)
    }

    async fn transaction(&self, txid: &str) -> Result<TxInfo, ConversionError> {
        self.agree(&format!("tx/{}", txid)).await
    }

    async fn block(&self, hash: &str) -> Result<BlockSummary, ConversionError> {
        self.agree(&format!("block/{}", hash)).await
    }

    async fn block_hash(&self, height: u64) -> Result<String, ConversionError> {
        let index: BlockIndex = self.agree(&format!("block-index/{}", height)).await?;
        Ok(index.block_hash)
    }

    async fn block_header(&self, hash: &str) -> Result<BlockHeaderInfo, ConversionError> {
        self.agree(&format!("block/{}", hash)).await
    }

    fn source_id(&self) -> &str {
        "insight-quorum"
    }
}
