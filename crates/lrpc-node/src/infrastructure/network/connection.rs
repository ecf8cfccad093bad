//! The per-connection serving loop.
//!
//! For every frame the peer sends:
//!
//! | kind | action |
//! |---|---|
//! | `Ping` | reply `Pong` with the same sequence number |
//! | `Request` | dispatch, reply `Response` or `Error` with the same sequence number |
//! | `Oneway` | dispatch, no reply |
//! | anything else | log and ignore |
//!
//! A frame with a bad magic number closes the connection: the stream is no
//! longer aligned on frame boundaries, so nothing after it can be trusted.
//! The peer closing the stream between frames ends the loop normally.
//!
//! Request and reply messages come from the shared [`MessagePool`] and go
//! back to it on every path, including errors.

use std::io::{Read, Write};
use std::sync::Arc;

use lrpc_core::protocol::{Header, Message, MessageKind, MessagePool, SerializeKind};
use tracing::{debug, warn};

use crate::application::dispatch::Handler;
use crate::infrastructure::network::send_frame;
use crate::infrastructure::network::server::ServerError;

enum Flow {
    Continue,
    Close,
}

/// One accepted stream and the resources it serves with.
pub struct Connection<S> {
    stream: S,
    peer: String,
    pool: Arc<MessagePool>,
    handler: Arc<dyn Handler>,
    max_body_len: u32,
}

impl<S: Read + Write> Connection<S> {
    pub fn new(stream: S, pool: Arc<MessagePool>, handler: Arc<dyn Handler>) -> Self {
        Self {
            stream,
            peer: "unknown".to_string(),
            pool,
            handler,
            max_body_len: u32::MAX,
        }
    }

    /// Label used in log lines for this connection.
    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = peer.into();
        self
    }

    /// Rejects frames whose declared body exceeds `limit` bytes.
    pub fn with_max_body_len(mut self, limit: u32) -> Self {
        self.max_body_len = limit;
        self
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Serves frames until the peer disconnects or sends a bad magic number.
    ///
    /// Returns the number of frames handled.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Protocol`] if a frame cannot be read or a reply
    /// cannot be written.  The stream is unusable afterwards.
    pub fn serve(&mut self) -> Result<u64, ServerError> {
        let mut frames = 0;
        loop {
            let mut request = self.pool.acquire();
            let flow = self.serve_frame(&mut request);
            self.pool.release(request);

            match flow? {
                Flow::Continue => frames += 1,
                Flow::Close => return Ok(frames),
            }
        }
    }

    fn serve_frame(&mut self, request: &mut Message) -> Result<Flow, ServerError> {
        match request.read_from_limited(&mut self.stream, self.max_body_len) {
            Ok(_) => {}
            Err(e) if e.is_clean_eof() => {
                debug!(peer = %self.peer, "peer closed connection");
                return Ok(Flow::Close);
            }
            Err(e) => return Err(e.into()),
        }

        let header = *request.header();
        if !header.check_magic_number() {
            warn!(peer = %self.peer, "invalid magic number, closing connection");
            return Ok(Flow::Close);
        }

        match header.kind() {
            Some(MessageKind::Ping) => {
                self.reply(&header, request, MessageKind::Pong, Vec::new())?;
            }
            Some(MessageKind::Request) => {
                let (kind, data) = match self.handler.handle(request) {
                    Ok(data) => (MessageKind::Response, data),
                    Err(e) => {
                        debug!(
                            peer = %self.peer,
                            seq = header.seq(),
                            "{}.{} failed: {e}",
                            request.service_name(),
                            request.service_method()
                        );
                        (MessageKind::Error, e.to_string().into_bytes())
                    }
                };
                self.reply(&header, request, kind, data)?;
            }
            Some(MessageKind::Oneway) => {
                if let Err(e) = self.handler.handle(request) {
                    warn!(
                        peer = %self.peer,
                        seq = header.seq(),
                        "oneway {}.{} failed: {e}",
                        request.service_name(),
                        request.service_method()
                    );
                }
            }
            other => {
                warn!(
                    peer = %self.peer,
                    kind = ?other,
                    bits = header.kind_bits(),
                    "ignoring unexpected message kind"
                );
            }
        }
        Ok(Flow::Continue)
    }

    fn reply(
        &mut self,
        request_header: &Header,
        request: &Message,
        kind: MessageKind,
        data: Vec<u8>,
    ) -> Result<(), ServerError> {
        let serialize = match kind {
            // Error text is always plain UTF-8
            MessageKind::Error => SerializeKind::Raw,
            _ => request_header
                .serialize_kind()
                .unwrap_or(SerializeKind::Raw),
        };

        let mut reply = self.pool.acquire();
        reply.reset();
        reply.header_mut().set_kind(kind);
        reply.header_mut().set_serialize_kind(serialize);
        reply.header_mut().set_seq(request_header.seq());
        reply.set_service_name(request.service_name());
        reply.set_service_method(request.service_method());
        reply.set_data(data);

        let sent = send_frame(&reply, &mut self.stream);
        self.pool.release(reply);
        sent?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
