//! Blocking client for one lrpc connection.
//!
//! Calls are strictly sequential: each [`Client::call`] writes a request and
//! reads exactly one reply before returning, and the reply must carry the
//! request's sequence number.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use lrpc_core::body::{Codec, CodecError, MessageBody};
use lrpc_core::protocol::{
    Message, MessageKind, Metadata, ProtocolError, SequenceCounter, SerializeKind,
};
use thiserror::Error;
use tracing::debug;

use crate::infrastructure::network::send_frame;

/// Error type for client calls.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect: {0}")]
    Connect(#[source] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("reply has an invalid magic number")]
    BadMagic,

    #[error("reply sequence {found} does not match request {expected}")]
    SequenceMismatch { expected: u64, found: u64 },

    #[error("expected {expected:?} reply, got {found:?}")]
    UnexpectedKind {
        expected: MessageKind,
        found: Option<MessageKind>,
    },

    /// The server answered with an `Error` frame.
    #[error("remote error: {0}")]
    Remote(String),
}

/// The decoded answer to a [`Client::call`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub seq: u64,
    pub serialize_kind: Option<SerializeKind>,
    pub metadata: Metadata,
    pub data: Vec<u8>,
}

/// A connection used for calls, notifications and pings.
pub struct Client<S = TcpStream> {
    stream: S,
    seq: SequenceCounter,
    request: Message,
    reply: Message,
    max_body_len: u32,
}

impl Client<TcpStream> {
    /// Opens a TCP connection to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] if the connection cannot be made.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).map_err(ClientError::Connect)?;
        stream.set_nodelay(true).map_err(ClientError::Connect)?;
        Ok(Self::from_stream(stream))
    }

    /// Bounds how long a call waits for its reply.
    pub fn set_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }
}

impl<S: Read + Write> Client<S> {
    pub fn from_stream(stream: S) -> Self {
        Self {
            stream,
            seq: SequenceCounter::new(),
            request: Message::new(),
            reply: Message::new(),
            max_body_len: u32::MAX,
        }
    }

    /// Rejects replies whose declared body exceeds `limit` bytes.
    pub fn with_max_body_len(mut self, limit: u32) -> Self {
        self.max_body_len = limit;
        self
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Calls `service.method` with a pre-encoded payload and waits for the
    /// reply.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Remote`] if the handler failed; the server's error
    ///   text is included.
    /// - [`ClientError::SequenceMismatch`] if the reply answers a different
    ///   request.
    /// - [`ClientError::Protocol`] if the stream fails.
    pub fn call(
        &mut self,
        service: &str,
        method: &str,
        metadata: Metadata,
        kind: SerializeKind,
        body: Vec<u8>,
    ) -> Result<Reply, ClientError> {
        let seq = self.send(MessageKind::Request, service, method, metadata, kind, body)?;
        self.receive(seq, MessageKind::Response)?;

        Ok(Reply {
            seq,
            serialize_kind: self.reply.header().serialize_kind(),
            metadata: std::mem::take(self.reply.metadata_mut()),
            data: self.reply.take_data(),
        })
    }

    /// Encodes `request` with `codec`, calls `service.method` and decodes
    /// the reply payload into `response` with the same codec.
    pub fn call_with<C, T, R>(
        &mut self,
        service: &str,
        method: &str,
        codec: &C,
        request: &T,
        response: &mut R,
    ) -> Result<(), ClientError>
    where
        C: Codec<T> + Codec<R>,
        T: ?Sized,
        R: ?Sized,
    {
        let body = Codec::<T>::encode(codec, request)?;
        let kind = Codec::<T>::serialize_kind(codec);
        let seq = self.send(MessageKind::Request, service, method, Metadata::new(), kind, body)?;
        self.receive(seq, MessageKind::Response)?;
        self.reply.decode_body(codec, response)?;
        Ok(())
    }

    /// Sends a oneway call; the server sends nothing back.
    ///
    /// Returns the sequence number used.
    pub fn notify(
        &mut self,
        service: &str,
        method: &str,
        metadata: Metadata,
        kind: SerializeKind,
        body: Vec<u8>,
    ) -> Result<u64, ClientError> {
        self.send(MessageKind::Oneway, service, method, metadata, kind, body)
    }

    /// Round-trips a keep-alive, returning the sequence number the server
    /// echoed.
    pub fn ping(&mut self) -> Result<u64, ClientError> {
        let seq = self.send(
            MessageKind::Ping,
            "",
            "",
            Metadata::new(),
            SerializeKind::Raw,
            Vec::new(),
        )?;
        self.receive(seq, MessageKind::Pong)?;
        Ok(seq)
    }

    fn send(
        &mut self,
        kind: MessageKind,
        service: &str,
        method: &str,
        metadata: Metadata,
        serialize: SerializeKind,
        body: Vec<u8>,
    ) -> Result<u64, ClientError> {
        let seq = self.seq.next();
        let request = &mut self.request;
        request.reset();
        request.header_mut().set_kind(kind);
        request.header_mut().set_serialize_kind(serialize);
        request.header_mut().set_seq(seq);
        request.set_service_name(service);
        request.set_service_method(method);
        request.set_metadata(metadata);
        request.set_data(body);

        send_frame(request, &mut self.stream)?;
        debug!(seq, ?kind, "{service}.{method} sent");
        Ok(seq)
    }

    fn receive(&mut self, seq: u64, expected: MessageKind) -> Result<(), ClientError> {
        self.reply
            .read_from_limited(&mut self.stream, self.max_body_len)?;

        let header = self.reply.header();
        if !header.check_magic_number() {
            return Err(ClientError::BadMagic);
        }
        if header.seq() != seq {
            return Err(ClientError::SequenceMismatch {
                expected: seq,
                found: header.seq(),
            });
        }
        match header.kind() {
            Some(kind) if kind == expected => Ok(()),
            Some(MessageKind::Error) => Err(ClientError::Remote(
                String::from_utf8_lossy(self.reply.data()).into_owned(),
            )),
            found => Err(ClientError::UnexpectedKind { expected, found }),
        }
    }
}

impl<S> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("next_seq", &self.seq.peek())
            .field("max_body_len", &self.max_body_len)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
