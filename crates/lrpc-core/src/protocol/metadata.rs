//! Flat length-prefixed encoding of call metadata.
//!
//! Wire format, repeated until the enclosing section ends:
//! ```text
//! [key_len:4][key:key_len][val_len:4][val:val_len]
//! ```
//! There is no pair count and no terminator; the framer supplies the block
//! length.  Lengths are big-endian `u32`.

use std::collections::HashMap;

use crate::protocol::error::MetadataError;

/// Call metadata: an unordered string-to-string map.
pub type Metadata = HashMap<String, String>;

const LEN_PREFIX: usize = 4;

/// Appends the encoding of `metadata` to `buf`, in map iteration order.
pub fn encode_metadata(metadata: &Metadata, buf: &mut Vec<u8>) {
    buf.reserve(encoded_metadata_len(metadata));
    for (key, value) in metadata {
        write_length_prefixed(buf, key.as_bytes());
        write_length_prefixed(buf, value.as_bytes());
    }
}

/// Number of bytes [`encode_metadata`] will append for `metadata`.
pub fn encoded_metadata_len(metadata: &Metadata) -> usize {
    metadata
        .iter()
        .map(|(k, v)| 2 * LEN_PREFIX + k.len() + v.len())
        .sum()
}

/// Decodes a complete metadata block.
///
/// Duplicate keys keep the last value.
///
/// # Errors
///
/// Returns [`MetadataError::Truncated`] if a length prefix or the bytes it
/// declares extend past the end of `block`, and
/// [`MetadataError::InvalidUtf8`] if a key or value is not UTF-8.  In both
/// cases the error carries every pair parsed before the failure.
///
/// # Examples
///
/// ```rust
/// use lrpc_core::protocol::metadata::{decode_metadata, encode_metadata, Metadata};
///
/// let mut md = Metadata::new();
/// md.insert("trace-id".to_string(), "f00d".to_string());
///
/// let mut block = Vec::new();
/// encode_metadata(&md, &mut block);
/// assert_eq!(decode_metadata(&block).unwrap(), md);
/// ```
pub fn decode_metadata(block: &[u8]) -> Result<Metadata, MetadataError> {
    let mut metadata = Metadata::new();
    let mut off = 0;
    while off < block.len() {
        let Some((key, next)) = read_length_prefixed(block, off) else {
            return Err(MetadataError::Truncated { partial: metadata });
        };
        let Some((value, next)) = read_length_prefixed(block, next) else {
            return Err(MetadataError::Truncated { partial: metadata });
        };
        off = next;

        match (std::str::from_utf8(key), std::str::from_utf8(value)) {
            (Ok(key), Ok(value)) => {
                metadata.insert(key.to_string(), value.to_string());
            }
            _ => return Err(MetadataError::InvalidUtf8 { partial: metadata }),
        }
    }
    Ok(metadata)
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn write_length_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

/// Reads a 4-byte length and that many bytes starting at `offset`.
/// Returns the bytes and the offset just past them, or `None` on overrun.
fn read_length_prefixed(buf: &[u8], offset: usize) -> Option<(&[u8], usize)> {
    let prefix = buf.get(offset..offset.checked_add(LEN_PREFIX)?)?;
    let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    let start = offset + LEN_PREFIX;
    let end = start.checked_add(len)?;
    Some((buf.get(start..end)?, end))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn md(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn encode(metadata: &Metadata) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_metadata(metadata, &mut buf);
        buf
    }

    #[test]
    fn test_empty_metadata_encodes_to_nothing() {
        let block = encode(&Metadata::new());
        assert!(block.is_empty());
        assert_eq!(decode_metadata(&block).unwrap(), Metadata::new());
    }

    #[test]
    fn test_single_pair_wire_layout() {
        let block = encode(&md(&[("ab", "xyz")]));
        assert_eq!(
            block,
            vec![0, 0, 0, 2, b'a', b'b', 0, 0, 0, 3, b'x', b'y', b'z']
        );
    }

    #[test]
    fn test_round_trip_with_empty_and_unicode_strings() {
        let original = md(&[
            ("", "empty key"),
            ("empty value", ""),
            ("ключ", "значение"),
            ("emoji-🚀", "\u{0}\u{7f}"),
            ("meta-1", "hello"),
        ]);
        let block = encode(&original);

        assert_eq!(block.len(), encoded_metadata_len(&original));
        assert_eq!(decode_metadata(&block).unwrap(), original);
    }

    #[test]
    fn test_duplicate_key_last_write_wins() {
        let mut block = Vec::new();
        write_length_prefixed(&mut block, b"k");
        write_length_prefixed(&mut block, b"first");
        write_length_prefixed(&mut block, b"k");
        write_length_prefixed(&mut block, b"second");

        let decoded = decode_metadata(&block).unwrap();
        assert_eq!(decoded, md(&[("k", "second")]));
    }

    #[test]
    fn test_truncated_key_returns_partial_pairs() {
        let mut block = encode(&md(&[("meta-1", "hello")]));
        // Second pair claims a 100-byte key but supplies only 3 bytes
        block.extend_from_slice(&100u32.to_be_bytes());
        block.extend_from_slice(b"abc");

        let err = decode_metadata(&block).unwrap_err();
        assert!(matches!(err, MetadataError::Truncated { .. }));
        assert_eq!(err.partial(), &md(&[("meta-1", "hello")]));
    }

    #[test]
    fn test_truncated_value_returns_partial_pairs() {
        let mut block = encode(&md(&[("a", "1")]));
        write_length_prefixed(&mut block, b"b");
        block.extend_from_slice(&9u32.to_be_bytes());
        block.extend_from_slice(b"short");

        let err = decode_metadata(&block).unwrap_err();
        assert_eq!(err.into_partial(), md(&[("a", "1")]));
    }

    #[test]
    fn test_truncated_length_prefix_is_rejected() {
        // Two stray bytes cannot form a length prefix
        let err = decode_metadata(&[0, 0]).unwrap_err();
        assert!(matches!(err, MetadataError::Truncated { .. }));
        assert!(err.partial().is_empty());
    }

    #[test]
    fn test_key_without_value_is_rejected() {
        let mut block = Vec::new();
        write_length_prefixed(&mut block, b"lonely");

        let err = decode_metadata(&block).unwrap_err();
        assert!(matches!(err, MetadataError::Truncated { .. }));
    }

    #[test]
    fn test_huge_declared_length_does_not_overflow() {
        let block = u32::MAX.to_be_bytes();
        let err = decode_metadata(&block).unwrap_err();
        assert!(matches!(err, MetadataError::Truncated { .. }));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let mut block = encode(&md(&[("ok", "fine")]));
        write_length_prefixed(&mut block, &[0xFF, 0xFE]);
        write_length_prefixed(&mut block, b"v");

        let err = decode_metadata(&block).unwrap_err();
        assert!(matches!(err, MetadataError::InvalidUtf8 { .. }));
        assert_eq!(err.partial(), &md(&[("ok", "fine")]));
    }
}
