//! # 32-Byte-Word ABI Reader and Writer
//!
//! Minimal Ethereum ABI support for the fixed layouts this workspace
//! produces and consumes: unsigned integers, `bytes32`, dynamic `bytes`,
//! and `bytes32[]`. Integers are big-endian and left-padded; dynamic data is
//! referenced by an offset word and right-padded to a word boundary.
//!
//! The reader never indexes past the input. Every offset and length word is
//! checked against the remaining input before it is followed, so a hostile
//! length cannot trigger a large allocation.

use crate::error::AbiError;
use alloy_primitives::{B256, U256};

/// Width of one ABI word.
pub const WORD: usize = 32;

/// Round `n` up to the next multiple of [`WORD`].
pub fn padded_len(n: usize) -> usize {
    n.div_ceil(WORD) * WORD
}

/// Append-only builder of ABI words.
#[derive(Debug, Default, Clone)]
pub struct AbiWriter {
    buf: Vec<u8>,
}

impl AbiWriter {
    /// An empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append a raw 32-byte word.
    pub fn word(&mut self, word: [u8; 32]) -> &mut Self {
        self.buf.extend_from_slice(&word);
        self
    }

    /// Append an unsigned integer, left-padded.
    pub fn uint(&mut self, v: u128) -> &mut Self {
        self.word(U256::from(v).to_be_bytes::<32>())
    }

    /// Append a full-width integer.
    pub fn u256(&mut self, v: U256) -> &mut Self {
        self.word(v.to_be_bytes::<32>())
    }

    /// Append a `bytes32`.
    pub fn b256(&mut self, h: B256) -> &mut Self {
        self.word(h.0)
    }

    /// Append the tail of a dynamic `bytes` value: length word then data,
    /// right-padded.
    pub fn bytes_tail(&mut self, data: &[u8]) -> &mut Self {
        self.uint(data.len() as u128);
        self.buf.extend_from_slice(data);
        self.buf.resize(self.buf.len() + padded_len(data.len()) - data.len(), 0);
        self
    }

    /// Append the tail of a `bytes32[]`: length word then each element.
    pub fn b256_array_tail(&mut self, items: &[B256]) -> &mut Self {
        self.uint(items.len() as u128);
        for item in items {
            self.b256(*item);
        }
        self
    }

    /// Append pre-encoded bytes verbatim.
    pub fn raw(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    /// Consume the writer.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// ABI encoding of a single `bytes` argument: offset word `0x20`, length
/// word, then the padded data.
pub fn encode_single_bytes(data: &[u8]) -> Vec<u8> {
    let mut w = AbiWriter::new();
    w.uint(WORD as u128).bytes_tail(data);
    w.finish()
}

/// Decode the ABI encoding of a single `bytes` argument.
pub fn decode_single_bytes(data: &[u8]) -> Result<Vec<u8>, AbiError> {
    let r = AbiReader::new(data);
    let at = r.offset_at(0)?;
    Ok(r.bytes_at(at)?.to_vec())
}

/// Bounds-checked reader over an ABI-encoded region.
///
/// All offsets are relative to the start of the region the reader was
/// built over.
#[derive(Debug, Clone, Copy)]
pub struct AbiReader<'a> {
    data: &'a [u8],
}

impl<'a> AbiReader<'a> {
    /// Wrap an encoded region.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Total region length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the region is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// A reader over the sub-region starting at `offset`.
    pub fn sub(&self, offset: usize) -> Result<AbiReader<'a>, AbiError> {
        if offset > self.data.len() {
            return Err(AbiError::OutOfRange {
                offset,
                value: offset,
            });
        }
        Ok(AbiReader::new(&self.data[offset..]))
    }

    fn slice(&self, offset: usize, needed: usize) -> Result<&'a [u8], AbiError> {
        let end = offset.checked_add(needed).ok_or(AbiError::Truncated {
            offset,
            needed,
            available: self.data.len(),
        })?;
        self.data.get(offset..end).ok_or(AbiError::Truncated {
            offset,
            needed,
            available: self.data.len(),
        })
    }

    /// The raw word at `offset`.
    pub fn word_at(&self, offset: usize) -> Result<[u8; 32], AbiError> {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.slice(offset, WORD)?);
        Ok(out)
    }

    /// An unsigned integer of `bits` width (at most 128). High-order bytes
    /// beyond the declared width must be zero.
    pub fn uint_at(&self, offset: usize, bits: u32) -> Result<u128, AbiError> {
        debug_assert!(bits % 8 == 0 && bits <= 128);
        let word = self.word_at(offset)?;
        let width = (bits / 8) as usize;
        if word[..WORD - width].iter().any(|b| *b != 0) {
            return Err(AbiError::Overflow { offset, bits });
        }
        let mut lo = [0u8; 16];
        lo.copy_from_slice(&word[16..]);
        Ok(u128::from_be_bytes(lo))
    }

    /// A full-width integer.
    pub fn u256_at(&self, offset: usize) -> Result<U256, AbiError> {
        Ok(U256::from_be_bytes(self.word_at(offset)?))
    }

    /// A `bytes32`.
    pub fn b256_at(&self, offset: usize) -> Result<B256, AbiError> {
        Ok(B256::new(self.word_at(offset)?))
    }

    /// An offset or length word, which must not exceed the region length.
    pub fn offset_at(&self, offset: usize) -> Result<usize, AbiError> {
        let word = self.word_at(offset)?;
        let value = u64::try_from(U256::from_be_bytes(word))
            .ok()
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(usize::MAX);
        if value > self.data.len() {
            return Err(AbiError::OutOfRange { offset, value });
        }
        Ok(value)
    }

    /// The dynamic `bytes` whose length word sits at `at`.
    pub fn bytes_at(&self, at: usize) -> Result<&'a [u8], AbiError> {
        let len = self.offset_at(at)?;
        self.slice(at + WORD, len)
    }

    /// The `bytes32[]` whose length word sits at `at`.
    pub fn b256_array_at(&self, at: usize) -> Result<Vec<B256>, AbiError> {
        let count = self.offset_at(at)?;
        let start = at + WORD;
        let room = self.data.len().saturating_sub(start) / WORD;
        if count > room {
            return Err(AbiError::OutOfRange {
                offset: at,
                value: count,
            });
        }
        (0..count)
            .map(|i| self.b256_at(start + i * WORD))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bytes_layout() {
        let enc = encode_single_bytes(b"abc");
        assert_eq!(enc.len(), 96);
        assert_eq!(enc[31], 0x20);
        assert_eq!(enc[63], 3);
        assert_eq!(&enc[64..67], b"abc");
        assert!(enc[67..].iter().all(|b| *b == 0));
        assert_eq!(decode_single_bytes(&enc).unwrap(), b"abc");
    }

    #[test]
    fn empty_bytes_has_no_data_words() {
        let enc = encode_single_bytes(&[]);
        assert_eq!(enc.len(), 64);
        assert!(decode_single_bytes(&enc).unwrap().is_empty());
    }

    #[test]
    fn exact_word_multiple_is_not_padded_further() {
        let enc = encode_single_bytes(&[7u8; 64]);
        assert_eq!(enc.len(), 64 + 64);
    }

    #[test]
    fn uint_rejects_dirty_high_bytes() {
        let mut w = AbiWriter::new();
        w.uint(0x1_0000_0000);
        let data = w.finish();
        let r = AbiReader::new(&data);
        assert_eq!(
            r.uint_at(0, 32),
            Err(AbiError::Overflow { offset: 0, bits: 32 })
        );
        assert_eq!(r.uint_at(0, 64).unwrap(), 0x1_0000_0000);
    }

    #[test]
    fn truncated_word_is_reported() {
        let r = AbiReader::new(&[0u8; 31]);
        assert!(matches!(r.word_at(0), Err(AbiError::Truncated { .. })));
    }

    #[test]
    fn huge_length_does_not_allocate() {
        let mut w = AbiWriter::new();
        w.uint(0x20).word([0xff; 32]);
        let data = w.finish();
        assert!(matches!(
            decode_single_bytes(&data),
            Err(AbiError::OutOfRange { .. })
        ));
    }

    #[test]
    fn array_count_capped_by_remaining_input() {
        let mut w = AbiWriter::new();
        w.uint(3).b256(B256::ZERO);
        let data = w.finish();
        assert!(matches!(
            AbiReader::new(&data).b256_array_at(0),
            Err(AbiError::OutOfRange { .. })
        ));
    }
}
