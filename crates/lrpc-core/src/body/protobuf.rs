//! Protocol-Buffers payloads via `prost`.

use crate::body::{Codec, CodecError};
use crate::protocol::header::SerializeKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtobufCodec;

impl<T> Codec<T> for ProtobufCodec
where
    T: prost::Message + Default,
{
    fn serialize_kind(&self) -> SerializeKind {
        SerializeKind::Protobuf
    }

    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(value.encoded_len());
        value.encode(&mut buf)?;
        Ok(buf)
    }

    /// Replaces `target` with the decoded message; fields absent from `data`
    /// take their defaults rather than keeping old values.
    fn decode(&self, data: &[u8], target: &mut T) -> Result<(), CodecError> {
        *target = T::decode(data)?;
        Ok(())
    }
}
