//! # Application Module
//!
//! Application services orchestrating the algorithms and outbound ports.

pub mod policy;
pub mod resolver;
pub mod service;

pub use policy::ResolutionPolicy;
pub use resolver::{AnchorProof, AttestationResolver, TX_EXTENSION_DEPTH};
pub use service::ConverterService;
