//! Command-line arguments and their mapping onto `ConverterConfig`.

use std::path::PathBuf;

use chainpoint_migration::config::{DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use chainpoint_migration::{BitcoindConfig, ConverterConfig, ResolutionMode};
use clap::{Parser, Subcommand};

/// chainpoint2ots: Chainpoint v2 receipts to OpenTimestamps proofs
#[derive(Parser, Debug)]
#[command(name = "chainpoint2ots")]
#[command(about = "Convert Chainpoint v2 receipts into OpenTimestamps proofs")]
#[command(version)]
pub struct Args {
    /// Attestation resolution: false (mirrors), true (node, then mirrors), strict (node only).
    /// Defaults to true when RPC credentials are given, false otherwise
    #[arg(long, env = "OTS_USE_BITCOIND")]
    pub use_bitcoind: Option<ResolutionMode>,

    /// bitcoind RPC user
    #[arg(long, env = "OTS_BITCOIND_RPC_USER", default_value = "")]
    pub rpc_user: String,

    /// bitcoind RPC password
    #[arg(long, env = "OTS_BITCOIND_RPC_PASSWORD", default_value = "", hide_env_values = true)]
    pub rpc_password: String,

    /// bitcoind RPC host
    #[arg(long, env = "OTS_BITCOIND_RPC_CONNECT", default_value = DEFAULT_RPC_HOST)]
    pub rpc_connect: String,

    /// bitcoind RPC port
    #[arg(long, env = "OTS_BITCOIND_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Explorer mirror base URL (repeatable; replaces the built-in list)
    #[arg(long = "mirror")]
    pub mirrors: Vec<String>,

    /// Per-mirror timeout in seconds
    #[arg(long, default_value = "15")]
    pub mirror_timeout: u64,

    /// Log filter directive (RUST_LOG syntax)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Convert a receipt file and print the resolved proof tree
    Convert {
        /// Chainpoint v2 receipt (JSON)
        file: PathBuf,
    },
    /// Look up a block header by height
    Header {
        /// Block height
        height: u64,
    },
}

impl Args {
    /// Converter configuration described by these arguments.
    pub fn converter_config(&self) -> ConverterConfig {
        let credentials = !self.rpc_user.is_empty() && !self.rpc_password.is_empty();
        let node = BitcoindConfig {
            host: self.rpc_connect.clone(),
            port: self.rpc_port,
            ..BitcoindConfig::new(self.rpc_user.clone(), self.rpc_password.clone())
        };

        let mut config = match self.use_bitcoind {
            None if credentials => ConverterConfig::with_node(node),
            None | Some(ResolutionMode::Disabled) => ConverterConfig::default(),
            Some(mode) => ConverterConfig {
                mode,
                ..ConverterConfig::with_node(node)
            },
        };

        config.quorum.timeout_secs = self.mirror_timeout;
        if !self.mirrors.is_empty() {
            config.quorum.mirrors = self.mirrors.clone();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainpoint_migration::config::DEFAULT_RPC_TIMEOUT_SECS;
    use chainpoint_migration::QuorumConfig;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("chainpoint2ots").chain(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults_use_public_mirrors() {
        let args = parse(&["--use-bitcoind", "false", "convert", "receipt.json"]);
        assert_eq!(
            args.command,
            Command::Convert {
                file: PathBuf::from("receipt.json")
            }
        );

        let config = args.converter_config();
        assert_eq!(config.mode, ResolutionMode::Disabled);
        assert!(config.bitcoind.is_none());
        assert_eq!(config.quorum, QuorumConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_node_settings() {
        let args = parse(&[
            "--use-bitcoind",
            "strict",
            "--rpc-user",
            "alice",
            "--rpc-password",
            "secret",
            "--rpc-connect",
            "10.0.0.2",
            "--rpc-port",
            "18332",
            "header",
            "447669",
        ]);
        assert_eq!(args.command, Command::Header { height: 447_669 });

        let config = args.converter_config();
        assert_eq!(config.mode, ResolutionMode::Strict);
        let node = config.bitcoind.as_ref().unwrap();
        assert_eq!(node.url(), "http://10.0.0.2:18332/");
        assert_eq!(node.timeout_secs, DEFAULT_RPC_TIMEOUT_SECS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials_without_mode_enable_node() {
        let args = parse(&[
            "--rpc-user",
            "alice",
            "--rpc-password",
            "secret",
            "header",
            "1",
        ]);
        if args.use_bitcoind.is_some() {
            // OTS_USE_BITCOIND set in the test environment
            return;
        }
        let config = args.converter_config();
        assert_eq!(config.mode, ResolutionMode::Enabled);
        assert!(config.bitcoind.is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rpc_timeout_is_not_configurable() {
        let argv = ["chainpoint2ots", "--rpc-timeout", "30", "header", "1"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_node_mode_without_credentials_is_invalid() {
        let args = parse(&[
            "--use-bitcoind",
            "true",
            "--rpc-user",
            "",
            "--rpc-password",
            "",
            "header",
            "1",
        ]);
        assert!(args.converter_config().validate().is_err());
    }

    #[test]
    fn test_mirror_override() {
        let args = parse(&[
            "--use-bitcoind",
            "false",
            "--mirror",
            "http://a.example",
            "--mirror",
            "http://b.example",
            "--mirror-timeout",
            "3",
            "header",
            "1",
        ]);
        let quorum = args.converter_config().quorum;
        assert_eq!(quorum.mirrors, vec!["http://a.example", "http://b.example"]);
        assert_eq!(quorum.timeout_secs, 3);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let argv = ["chainpoint2ots", "--use-bitcoind", "maybe", "header", "1"];
        assert!(Args::try_parse_from(argv).is_err());
    }
}
