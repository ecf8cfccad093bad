//! # lrpc-core
//!
//! Wire protocol for lrpc, a small request/response RPC system.
//!
//! Every call, reply, notification and keep-alive travels as one
//! [`Message`]: a fixed 10-byte [`Header`] followed by a length-prefixed body
//! carrying the target service, the method, a string-to-string metadata map
//! and an opaque payload.
//!
//! - **`protocol`** – the header bit layout, the metadata codec, the framer
//!   that writes and reads whole messages on any `std::io` stream, and a
//!   [`MessagePool`] for reusing decode buffers across calls.
//!
//! - **`body`** – codecs that turn typed values into the payload bytes and
//!   back (raw bytes, JSON, Protocol Buffers).  The header's
//!   [`SerializeKind`] names the codec a payload was produced with.
//!
//! This crate performs no I/O of its own beyond the stream it is handed, and
//! it never logs.  Transports live in `lrpc-node`.

pub mod body;
pub mod protocol;

pub use body::{Codec, CodecError, JsonCodec, MessageBody, ProtobufCodec, RawCodec};
pub use protocol::error::{MetadataError, ProtocolError};
pub use protocol::header::{Header, MessageKind, SerializeKind};
pub use protocol::message::Message;
pub use protocol::metadata::Metadata;
pub use protocol::pool::MessagePool;
