//! # chainpoint2ots
//!
//! Reads a Chainpoint v2 receipt, migrates it to an OpenTimestamps proof,
//! resolves its Bitcoin attestations and prints the resulting tree.
//!
//! ## Environment
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `OTS_USE_BITCOIND` | `false`, `true` or `strict`; `true` when RPC credentials are set |
//! | `OTS_BITCOIND_RPC_USER` | RPC user |
//! | `OTS_BITCOIND_RPC_PASSWORD` | RPC password |
//! | `OTS_BITCOIND_RPC_CONNECT` | RPC host |
//! | `OTS_BITCOIND_RPC_PORT` | RPC port |

mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use chainpoint_migration::{ChainpointReceipt, ConverterApi, ConverterService};
use clap::Parser;
use shared_ots::Attestation;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_new(&args.log).context("invalid log filter")?)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = args.converter_config();
    config.validate().context("invalid configuration")?;
    info!(
        "[chainpoint2ots] mode {}, {} mirrors",
        config.mode,
        config.quorum.mirrors.len()
    );
    let service = ConverterService::from_config(&config).context("failed to build converter")?;

    match &args.command {
        Command::Convert { file } => convert(&service, file).await,
        Command::Header { height } => {
            let header = service
                .block_header(*height)
                .await
                .with_context(|| format!("block header lookup failed at height {}", height))?;
            println!("{}", serde_json::to_string_pretty(&header)?);
            Ok(())
        }
    }
}

async fn convert(service: &ConverterService, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let receipt = ChainpointReceipt::from_json(&json)
        .with_context(|| format!("{} is not a Chainpoint receipt", file.display()))?;

    let resolved = service
        .convert(&receipt)
        .await
        .with_context(|| format!("conversion of {} failed", file.display()))?;

    let heights: Vec<u64> = resolved
        .attestations()
        .into_iter()
        .filter_map(|attestation| match attestation {
            Attestation::BitcoinBlockHeader { height } => Some(*height),
            Attestation::PendingOpReturn { .. } => None,
        })
        .collect();
    info!(
        "[chainpoint2ots] {} attestations resolved, block heights {:?}",
        resolved.resolved, heights
    );

    println!("{}", resolved.str_tree());
    Ok(())
}
