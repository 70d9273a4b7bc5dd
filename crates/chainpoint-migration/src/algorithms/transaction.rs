//! # Transaction Codec
//!
//! Minimal Bitcoin transaction parsing: enough to drop segwit witness data so
//! the commitment is searched in (and the txid computed over) the legacy
//! serialization.
//!
//! ```text
//! legacy: version | vin | vout | locktime
//! segwit: version | 0x00 0x01 | vin | vout | witness | locktime
//! ```

use shared_ots::{sha256d, Hash};

use crate::domain::ConversionError;

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ConversionError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                ConversionError::MalformedTransaction(format!(
                    "truncated at byte {} (wanted {} more)",
                    self.pos, len
                ))
            })?;
        let data: &'a [u8] = self.data;
        let slice = &data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    fn compact_size(&mut self) -> Result<usize, ConversionError> {
        let first = self.take(1)?[0];
        let value = match first {
            0xfd => u16::from_le_bytes([self.take(1)?[0], self.take(1)?[0]]) as u64,
            0xfe => {
                let bytes = self.take(4)?;
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64
            }
            0xff => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(self.take(8)?);
                u64::from_le_bytes(buf)
            }
            n => n as u64,
        };
        usize::try_from(value).map_err(|_| {
            ConversionError::MalformedTransaction(format!("length {} out of range", value))
        })
    }

    /// Skip a length-prefixed byte string.
    fn skip_var_bytes(&mut self) -> Result<(), ConversionError> {
        let len = self.compact_size()?;
        self.take(len)?;
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.pos == self.data.len()
    }
}

/// Legacy serialization of a raw transaction (witness data removed).
///
/// A transaction that is already legacy is returned unchanged.
pub fn strip_witness(raw: &[u8]) -> Result<Vec<u8>, ConversionError> {
    let mut reader = Reader::new(raw);
    let version = reader.take(4)?;

    let segwit = reader.peek(0) == Some(0x00) && reader.peek(1) == Some(0x01);
    if segwit {
        reader.take(2)?;
    }

    let body_start = reader.pos;
    let inputs = reader.compact_size()?;
    for _ in 0..inputs {
        reader.take(36)?; // outpoint
        reader.skip_var_bytes()?; // scriptSig
        reader.take(4)?; // sequence
    }
    let outputs = reader.compact_size()?;
    for _ in 0..outputs {
        reader.take(8)?; // value
        reader.skip_var_bytes()?; // scriptPubKey
    }
    let body_end = reader.pos;

    if segwit {
        for _ in 0..inputs {
            let items = reader.compact_size()?;
            for _ in 0..items {
                reader.skip_var_bytes()?;
            }
        }
    }

    let locktime = reader.take(4)?;
    if !reader.is_done() {
        return Err(ConversionError::MalformedTransaction(format!(
            "{} trailing bytes",
            raw.len() - reader.pos
        )));
    }

    let mut legacy = Vec::with_capacity(8 + body_end - body_start);
    legacy.extend_from_slice(version);
    legacy.extend_from_slice(&raw[body_start..body_end]);
    legacy.extend_from_slice(locktime);
    Ok(legacy)
}

/// Transaction hash of a legacy serialization, internal byte order.
///
/// Reverse it to get the displayed txid.
pub fn transaction_hash(legacy: &[u8]) -> Hash {
    sha256d(legacy)
}

/// Byte offset of the first occurrence of `needle` in `haystack`.
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
