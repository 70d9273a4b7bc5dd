//! # Proof Operations
//!
//! Pure `bytes -> bytes` transforms labelling the edges of a timestamp tree.

use std::fmt;

use crate::hashing::{sha256, sha256d};

/// A message transform.
///
/// `Sha256d` is a composite: [`crate::TimestampTree::add`] expands it into two
/// `Sha256` edges, so it never appears as a stored edge key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    /// `msg || arg`
    Append(Vec<u8>),
    /// `arg || msg`
    Prepend(Vec<u8>),
    /// `sha256(msg)`
    Sha256,
    /// `sha256(sha256(msg))`
    Sha256d,
}

impl Operation {
    /// Apply the operation to a message.
    pub fn apply(&self, msg: &[u8]) -> Vec<u8> {
        match self {
            Operation::Append(arg) => [msg, arg.as_slice()].concat(),
            Operation::Prepend(arg) => [arg.as_slice(), msg].concat(),
            Operation::Sha256 => sha256(msg).to_vec(),
            Operation::Sha256d => sha256d(msg).to_vec(),
        }
    }

    /// Whether this operation is stored as a single edge.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Operation::Sha256d)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Append(arg) => write!(f, "append {}", hex::encode(arg)),
            Operation::Prepend(arg) => write!(f, "prepend {}", hex::encode(arg)),
            Operation::Sha256 => write!(f, "sha256"),
            Operation::Sha256d => write!(f, "sha256d"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_prepend() {
        let msg = [0x01, 0x02];
        assert_eq!(Operation::Append(vec![0xff]).apply(&msg), vec![0x01, 0x02, 0xff]);
        assert_eq!(Operation::Prepend(vec![0xff]).apply(&msg), vec![0xff, 0x01, 0x02]);
    }

    #[test]
    fn test_sha256d_equals_two_rounds() {
        let msg = b"tx";
        let twice = Operation::Sha256.apply(&Operation::Sha256.apply(msg));
        assert_eq!(Operation::Sha256d.apply(msg), twice);
        assert!(!Operation::Sha256d.is_primitive());
        assert!(Operation::Sha256.is_primitive());
    }

    #[test]
    fn test_display() {
        assert_eq!(Operation::Append(vec![0xab, 0xcd]).to_string(), "append abcd");
        assert_eq!(Operation::Sha256.to_string(), "sha256");
    }
}
