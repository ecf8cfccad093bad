//! Body codecs: conversion between typed values and the opaque payload bytes
//! carried in [`Message::data`].
//!
//! The framer never looks inside the payload.  The header's
//! [`SerializeKind`] tells the receiver which codec produced it, and
//! [`MessageBody::decode_body`] refuses to decode with a codec of a different
//! kind.
//!
//! | kind | codec | accepted values |
//! |---|---|---|
//! | `Raw` | [`RawCodec`] | `Vec<u8>`, `[u8]` |
//! | `Json` | [`JsonCodec`] | any `Serialize + DeserializeOwned` |
//! | `Protobuf` | [`ProtobufCodec`] | any `prost::Message + Default` |
//!
//! Handing a codec a value of the wrong shape (a struct to `RawCodec`, a
//! non-protobuf type to `ProtobufCodec`) does not compile.

pub mod json;
pub mod protobuf;
pub mod raw;

pub use json::JsonCodec;
pub use protobuf::ProtobufCodec;
pub use raw::RawCodec;

use thiserror::Error;

use crate::protocol::header::SerializeKind;
use crate::protocol::message::Message;

/// Errors raised while encoding or decoding a payload.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("json codec: {0}")]
    Json(#[from] serde_json::Error),

    #[error("protobuf decode: {0}")]
    ProtobufDecode(#[from] prost::DecodeError),

    #[error("protobuf encode: {0}")]
    ProtobufEncode(#[from] prost::EncodeError),

    /// A raw payload does not fit the fixed-size target buffer.
    #[error("raw payload is {actual} bytes but target buffer holds {expected}")]
    RawLength { expected: usize, actual: usize },

    /// The message announces a different serialization than the codec used.
    #[error("payload is serialized as {found:?}, codec expects {expected:?}")]
    KindMismatch {
        expected: SerializeKind,
        found: Option<SerializeKind>,
    },
}

/// Converts values of type `T` to and from payload bytes.
pub trait Codec<T: ?Sized> {
    /// The header value announcing this codec's output.
    fn serialize_kind(&self) -> SerializeKind;

    /// Serializes `value` into payload bytes.
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Deserializes `data` into `target`.
    fn decode(&self, data: &[u8], target: &mut T) -> Result<(), CodecError>;
}

/// Encoding and decoding of a [`Message`]'s payload through a [`Codec`].
///
/// # Examples
///
/// ```rust
/// use lrpc_core::body::{JsonCodec, MessageBody};
/// use lrpc_core::protocol::header::SerializeKind;
/// use lrpc_core::protocol::message::Message;
///
/// let mut msg = Message::new();
/// msg.set_body(&JsonCodec, &vec![1, 2, 3]).unwrap();
/// assert_eq!(msg.header().serialize_kind(), Some(SerializeKind::Json));
///
/// let mut out: Vec<i32> = Vec::new();
/// msg.decode_body(&JsonCodec, &mut out).unwrap();
/// assert_eq!(out, vec![1, 2, 3]);
/// ```
pub trait MessageBody {
    /// Encodes `value` as the payload and records the codec's kind in the
    /// header.
    fn set_body<T, C>(&mut self, codec: &C, value: &T) -> Result<(), CodecError>
    where
        T: ?Sized,
        C: Codec<T>;

    /// Decodes the payload into `target`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::KindMismatch`] without decoding if the header's
    /// serialize kind is not the codec's.
    fn decode_body<T, C>(&self, codec: &C, target: &mut T) -> Result<(), CodecError>
    where
        T: ?Sized,
        C: Codec<T>;
}

impl MessageBody for Message {
    fn set_body<T, C>(&mut self, codec: &C, value: &T) -> Result<(), CodecError>
    where
        T: ?Sized,
        C: Codec<T>,
    {
        let data = codec.encode(value)?;
        self.set_data(data);
        self.header_mut().set_serialize_kind(codec.serialize_kind());
        Ok(())
    }

    fn decode_body<T, C>(&self, codec: &C, target: &mut T) -> Result<(), CodecError>
    where
        T: ?Sized,
        C: Codec<T>,
    {
        let expected = codec.serialize_kind();
        let found = self.header().serialize_kind();
        if found != Some(expected) {
            return Err(CodecError::KindMismatch { expected, found });
        }
        codec.decode(self.data(), target)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
