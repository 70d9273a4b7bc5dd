//! # SHA-256 Hashing
//!
//! One-shot SHA-256 helpers used by proof operations and Bitcoin
//! transaction/Merkle hashing.

use sha2::{Digest, Sha256};

/// SHA-256 output (256-bit).
pub type Hash = [u8; 32];

/// Hash data with SHA-256 (one-shot).
pub fn sha256(data: &[u8]) -> Hash {
    let mut output = [0u8; 32];
    output.copy_from_slice(&Sha256::digest(data));
    output
}

/// Double SHA-256, as used for Bitcoin txids and Merkle nodes.
pub fn sha256d(data: &[u8]) -> Hash {
    sha256(&sha256(data))
}

/// Hash the concatenation of several inputs.
pub fn sha256_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update(input);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}
