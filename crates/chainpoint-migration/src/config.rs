//! # Converter Configuration
//!
//! Built once at startup and handed to the data source constructors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::adapters::DEFAULT_MIRRORS;
use crate::domain::ConversionError;

/// Default bitcoind RPC port.
pub const DEFAULT_RPC_PORT: u16 = 8332;

/// Default bitcoind RPC host.
pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";

/// Per-call timeout for the trusted node, in seconds.
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

/// How attestations are resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// Public mirror quorum only.
    #[default]
    Disabled,
    /// Trusted node first, one fallback to the quorum.
    Enabled,
    /// Trusted node only.
    Strict,
}

impl ResolutionMode {
    /// Does this mode talk to the trusted node?
    pub fn uses_node(self) -> bool {
        !matches!(self, ResolutionMode::Disabled)
    }
}

impl FromStr for ResolutionMode {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "false" | "disabled" | "" => Ok(ResolutionMode::Disabled),
            "true" | "enabled" => Ok(ResolutionMode::Enabled),
            "strict" => Ok(ResolutionMode::Strict),
            other => Err(ConversionError::InvalidConfig(format!(
                "unknown resolution mode {:?} (expected true, false or strict)",
                other
            ))),
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionMode::Disabled => "disabled",
            ResolutionMode::Enabled => "enabled",
            ResolutionMode::Strict => "strict",
        };
        f.write_str(name)
    }
}

/// Trusted bitcoind connection settings.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BitcoindConfig {
    /// RPC user.
    pub user: String,
    /// RPC password.
    pub password: String,
    /// RPC host.
    pub host: String,
    /// RPC port.
    pub port: u16,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl BitcoindConfig {
    /// Settings for `user:password` on the default host and port.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// RPC endpoint URL.
    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

impl Default for BitcoindConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            password: String::new(),
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
            timeout_secs: DEFAULT_RPC_TIMEOUT_SECS,
        }
    }
}

// Password stays out of logs.
impl fmt::Debug for BitcoindConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitcoindConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Public mirror quorum settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuorumConfig {
    /// Mirror base URLs.
    pub mirrors: Vec<String>,
    /// Per-mirror request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            mirrors: DEFAULT_MIRRORS.iter().map(|m| m.to_string()).collect(),
            timeout_secs: 15,
        }
    }
}

/// Converter configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConverterConfig {
    /// Resolution mode.
    pub mode: ResolutionMode,
    /// Trusted node; required unless `mode` is `Disabled`.
    pub bitcoind: Option<BitcoindConfig>,
    /// Mirror quorum.
    pub quorum: QuorumConfig,
}

impl ConverterConfig {
    /// Trusted node first, falling back to the default mirrors.
    pub fn with_node(bitcoind: BitcoindConfig) -> Self {
        Self {
            mode: ResolutionMode::Enabled,
            bitcoind: Some(bitcoind),
            quorum: QuorumConfig::default(),
        }
    }

    /// Create a config for testing (short timeouts, no mirrors).
    pub fn for_testing() -> Self {
        Self {
            mode: ResolutionMode::Disabled,
            bitcoind: None,
            quorum: QuorumConfig {
                mirrors: Vec::new(),
                timeout_secs: 2,
            },
        }
    }

    /// Check that the mode has what it needs.
    pub fn validate(&self) -> Result<(), ConversionError> {
        if self.mode.uses_node() {
            let node = self.bitcoind.as_ref().ok_or_else(|| {
                ConversionError::InvalidConfig(format!(
                    "mode {} requires bitcoind settings",
                    self.mode
                ))
            })?;
            if node.user.is_empty() || node.password.is_empty() {
                return Err(ConversionError::InvalidConfig(
                    "bitcoind user and password are required".to_string(),
                ));
            }
            if node.timeout_secs == 0 {
                return Err(ConversionError::InvalidConfig(
                    "bitcoind timeout must be positive".to_string(),
                ));
            }
        }
        if self.mode != ResolutionMode::Strict && self.quorum.timeout_secs == 0 {
            return Err(ConversionError::InvalidConfig(
                "mirror timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
