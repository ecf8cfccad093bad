//! Error types returned by the framer and the metadata codec.
//!
//! Every decode/encode failure is handed back to the immediate caller.  The
//! protocol layer never logs, retries, or closes a connection on its own;
//! those decisions belong to the transport.

use std::io;

use thiserror::Error;

use crate::protocol::metadata::Metadata;

/// Errors produced while decoding a metadata block.
///
/// Both variants carry every key/value pair that was fully parsed before the
/// failure point, so callers can inspect what arrived for diagnostics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// A length prefix, or the bytes it declares, would read past the end of
    /// the block.
    #[error("incomplete key value pair in metadata ({} pairs parsed)", .partial.len())]
    Truncated { partial: Metadata },

    /// A key or value is not valid UTF-8.
    #[error("metadata key or value is not valid UTF-8 ({} pairs parsed)", .partial.len())]
    InvalidUtf8 { partial: Metadata },
}

impl MetadataError {
    /// The pairs decoded before the error was detected.
    pub fn partial(&self) -> &Metadata {
        match self {
            MetadataError::Truncated { partial } | MetadataError::InvalidUtf8 { partial } => {
                partial
            }
        }
    }

    /// Consumes the error and returns the partially decoded metadata.
    pub fn into_partial(self) -> Metadata {
        match self {
            MetadataError::Truncated { partial } | MetadataError::InvalidUtf8 { partial } => {
                partial
            }
        }
    }
}

/// Errors that can occur while writing or reading a frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The underlying stream failed, or ended before the required number of
    /// bytes was transferred.
    #[error("i/o error after {transferred} bytes: {source}")]
    Io {
        transferred: u64,
        #[source]
        source: io::Error,
    },

    /// The metadata section could not be decoded.
    #[error("malformed metadata after {transferred} bytes: {source}")]
    Metadata {
        transferred: u64,
        #[source]
        source: MetadataError,
    },

    /// A section's declared length runs past the end of the frame body.
    #[error("{section} section overruns frame body: need {needed} bytes at offset {offset}, body is {body_len} bytes")]
    SectionOverrun {
        section: &'static str,
        offset: usize,
        needed: usize,
        body_len: usize,
    },

    /// The sections end before the declared body length does.
    #[error("frame body has {extra} bytes after the data section")]
    TrailingBytes { extra: usize },

    /// The sections of an outgoing message do not fit the 32-bit length field.
    #[error("frame body of {len} bytes does not fit a 32-bit length")]
    BodyTooLong { len: u64 },

    /// The service name or service method is not valid UTF-8.
    #[error("{section} section is not valid UTF-8")]
    InvalidUtf8 { section: &'static str },

    /// The declared body length is larger than the caller's limit.
    #[error("frame body of {declared} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { declared: u32, limit: u32 },
}

impl ProtocolError {
    /// Number of bytes moved over the stream before the failure, when known.
    pub fn transferred(&self) -> Option<u64> {
        match self {
            ProtocolError::Io { transferred, .. } | ProtocolError::Metadata { transferred, .. } => {
                Some(*transferred)
            }
            _ => None,
        }
    }

    /// The metadata pairs decoded before a metadata failure.
    pub fn partial_metadata(&self) -> Option<&Metadata> {
        match self {
            ProtocolError::Metadata { source, .. } => Some(source.partial()),
            _ => None,
        }
    }

    /// Returns `true` when the stream ended cleanly before the first byte of a
    /// frame, i.e. the peer closed the connection between frames.
    pub fn is_clean_eof(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io { transferred: 0, source }
                if source.kind() == io::ErrorKind::UnexpectedEof
        )
    }
}
