//! bitcoind JSON-RPC Adapter
//!
//! Implements `BlockSource` against a single trusted node.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::BitcoindConfig;
use crate::domain::{BlockHeaderInfo, BlockSummary, ConversionError, TxInfo};
use crate::ports::outbound::BlockSource;

/// JSON-RPC request structure.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

/// JSON-RPC response structure.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Trusted bitcoind peer.
pub struct BitcoindRpcClient {
    http_client: reqwest::Client,
    url: String,
    user: String,
    password: String,
    request_id: AtomicU64,
}

impl BitcoindRpcClient {
    /// Client for the node described by `config`.
    pub fn new(config: &BitcoindConfig) -> Result<Self, ConversionError> {
        Self::with_url(config.url(), config)
    }

    /// Client for `url`, taking credentials and timeout from `config`.
    pub fn with_url(url: impl Into<String>, config: &BitcoindConfig) -> Result<Self, ConversionError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConversionError::InvalidConfig(format!("http client: {}", e)))?;

        Ok(Self {
            http_client,
            url: url.into(),
            user: config.user.clone(),
            password: config.password.clone(),
            request_id: AtomicU64::new(1),
        })
    }

    /// Make a JSON-RPC call.
    ///
    /// bitcoind reports RPC errors with HTTP 500 and a JSON body, so the body
    /// is parsed whatever the status.
    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R, ConversionError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        debug!("[bitcoind] #{} {} {}", id, method, params);

        let request = JsonRpcRequest {
            jsonrpc: "1.0",
            id,
            method,
            params,
        };

        let response = self
            .http_client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("[bitcoind] {} transport failure: {}", method, e);
                ConversionError::RpcError(format!("{}: {}", method, e))
            })?;

        let status = response.status();
        let body: JsonRpcResponse = response.json().await.map_err(|e| {
            ConversionError::RpcError(format!("{}: malformed response (HTTP {}): {}", method, status, e))
        })?;

        if let Some(error) = body.error {
            return Err(ConversionError::RpcError(format!(
                "{} failed: {} {}",
                method, error.code, error.message
            )));
        }

        let result = body
            .result
            .filter(|value| !value.is_null())
            .ok_or_else(|| ConversionError::RpcError(format!("{}: response missing result", method)))?;

        serde_json::from_value(result)
            .map_err(|e| ConversionError::RpcError(format!("{}: unexpected result: {}", method, e)))
    }
}

#[async_trait]
impl BlockSource for BitcoindRpcClient {
    async fn raw_transaction(&self, txid: &str) -> Result<String, ConversionError> {
        self.call("getrawtransaction", json!([txid])).await
    }

    async fn transaction(&self, txid: &str) -> Result<TxInfo, ConversionError> {
        self.call("getrawtransaction", json!([txid, true])).await
    }

    async fn block(&self, hash: &str) -> Result<BlockSummary, ConversionError> {
        self.call("getblock", json!([hash])).await
    }

    async fn block_hash(&self, height: u64) -> Result<String, ConversionError> {
        self.call("getblockhash", json!([height])).await
    }

    async fn block_header(&self, hash: &str) -> Result<BlockHeaderInfo, ConversionError> {
        self.call("getblockheader", json!([hash])).await
    }

    fn source_id(&self) -> &str {
        &self.url
    }
}
