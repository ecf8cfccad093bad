//! Protocol layer: header, metadata block, message framing and pooling.

pub mod error;
pub mod header;
pub mod message;
pub mod metadata;
pub mod pool;
pub mod sequence;

pub use error::{MetadataError, ProtocolError};
pub use header::{Header, MessageKind, SerializeKind, HEADER_SIZE, MAGIC_NUMBER};
pub use message::Message;
pub use metadata::{decode_metadata, encode_metadata, encoded_metadata_len, Metadata};
pub use pool::{MessagePool, PoolStatsSnapshot};
pub use sequence::SequenceCounter;
