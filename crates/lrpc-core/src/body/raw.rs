//! Pass-through codec for payloads that are already bytes.

use crate::body::{Codec, CodecError};
use crate::protocol::header::SerializeKind;

/// Copies bytes in and out unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCodec;

impl Codec<[u8]> for RawCodec {
    fn serialize_kind(&self) -> SerializeKind {
        SerializeKind::Raw
    }

    fn encode(&self, value: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(value.to_vec())
    }

    /// Copies `data` into the fixed-size `target`.  The lengths must match;
    /// a mismatch is reported rather than silently truncated or padded.
    fn decode(&self, data: &[u8], target: &mut [u8]) -> Result<(), CodecError> {
        if data.len() != target.len() {
            return Err(CodecError::RawLength {
                expected: target.len(),
                actual: data.len(),
            });
        }
        target.copy_from_slice(data);
        Ok(())
    }
}

impl Codec<Vec<u8>> for RawCodec {
    fn serialize_kind(&self) -> SerializeKind {
        SerializeKind::Raw
    }

    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone())
    }

    /// Replaces the contents of `target` with `data`.
    fn decode(&self, data: &[u8], target: &mut Vec<u8>) -> Result<(), CodecError> {
        target.clear();
        target.extend_from_slice(data);
        Ok(())
    }
}
