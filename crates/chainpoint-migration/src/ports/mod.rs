//! # Ports Module
//!
//! Hexagonal architecture ports (inbound API, outbound block sources).

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
