//! JSON payloads via `serde_json`.
//!
//! The workspace enables `serde_json`'s `arbitrary_precision` feature, so a
//! number decoded into a [`serde_json::Value`] keeps its exact textual form
//! instead of being rounded through `f64`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::body::{Codec, CodecError};
use crate::protocol::header::SerializeKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn serialize_kind(&self) -> SerializeKind {
        SerializeKind::Json
    }

    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, data: &[u8], target: &mut T) -> Result<(), CodecError> {
        *target = serde_json::from_slice(data)?;
        Ok(())
    }
}
