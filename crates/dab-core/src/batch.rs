//! Batch list encoding for chain submission.
//!
//! A sequence of batches is submitted as one blob: the RLP encoding of a list
//! of byte strings. Decoding is strict (canonical headers only, no trailing
//! bytes, no nested lists) so that every accepted blob re-encodes to itself
//! and the commitment over it stays meaningful.

use alloy_rlp::{Bytes, Decodable};

use crate::error::CodecError;

/// Encode a sequence of batches.
pub fn encode_batches<B: AsRef<[u8]>>(batches: &[B]) -> Vec<u8> {
    let items: Vec<&[u8]> = batches.iter().map(AsRef::as_ref).collect();
    let mut out = Vec::new();
    alloy_rlp::encode_list::<&[u8], [u8]>(&items, &mut out);
    out
}

/// Decode a blob produced by [`encode_batches`].
pub fn decode_batches(data: &[u8]) -> Result<Vec<Vec<u8>>, CodecError> {
    let mut buf = data;
    let batches = Vec::<Bytes>::decode(&mut buf).map_err(|e| malformed(e.to_string()))?;
    if !buf.is_empty() {
        return Err(malformed(format!("{} trailing bytes after list", buf.len())));
    }
    Ok(batches.into_iter().map(Vec::from).collect())
}

fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::MalformedBatchEncoding(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_encodings() {
        assert_eq!(encode_batches::<&[u8]>(&[]), vec![0xc0]);
        assert_eq!(encode_batches(&[b"dog"]), vec![0xc4, 0x83, b'd', b'o', b'g']);
        assert_eq!(encode_batches(&[[0x05u8]]), vec![0xc1, 0x05]);
        assert_eq!(encode_batches(&[[0x80u8]]), vec![0xc2, 0x81, 0x80]);
        assert_eq!(encode_batches(&[b""]), vec![0xc1, 0x80]);
    }

    #[test]
    fn long_string_and_list() {
        let batch = vec![0xabu8; 1024];
        let enc = encode_batches(&[&batch]);
        // list header f9 04 03, string header b9 04 00
        assert_eq!(&enc[..6], &[0xf9, 0x04, 0x03, 0xb9, 0x04, 0x00]);
        assert_eq!(decode_batches(&enc).unwrap(), vec![batch]);
    }

    #[test]
    fn multiple_batches_round_trip() {
        let batches = vec![b"hello-data".to_vec(), vec![], vec![0x7f], vec![1u8; 56]];
        assert_eq!(decode_batches(&encode_batches(&batches)).unwrap(), batches);
    }

    #[test]
    fn rejects_trailing_bytes() {
        assert!(matches!(
            decode_batches(&[0xc0, 0x00]),
            Err(CodecError::MalformedBatchEncoding(_))
        ));
    }

    #[test]
    fn rejects_non_list() {
        assert!(decode_batches(&[0x83, b'd', b'o', b'g']).is_err());
        assert!(decode_batches(&[]).is_err());
    }

    #[test]
    fn rejects_non_canonical_forms() {
        // single byte wrapped in a string header
        assert!(decode_batches(&[0xc2, 0x81, 0x05]).is_err());
        // long form for a 3-byte string
        assert!(decode_batches(&[0xc5, 0xb8, 0x03, b'd', b'o', b'g']).is_err());
        // leading zero in length prefix
        assert!(decode_batches(&[0xf9, 0x00, 0x38]).is_err());
    }

    #[test]
    fn rejects_overlong_item() {
        assert!(decode_batches(&[0xc3, 0x85, b'a', b'b']).is_err());
    }

    #[test]
    fn rejects_nested_list() {
        assert!(decode_batches(&[0xc1, 0xc0]).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn batches_round_trip(
                batches in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..120), 0..8)
            ) {
                prop_assert_eq!(decode_batches(&encode_batches(&batches)).unwrap(), batches);
            }

            #[test]
            fn decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..64)) {
                let _ = decode_batches(&data);
            }
        }
    }
}
