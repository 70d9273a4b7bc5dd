//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the `BlockSource` port over HTTP.

mod bitcoind;
mod insight;

pub use bitcoind::BitcoindRpcClient;
pub use insight::{InsightMirror, InsightQuorum, DEFAULT_MIRRORS, USER_AGENT};
