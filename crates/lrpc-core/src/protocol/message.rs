//! The message framer: one logical call or reply and its wire encoding.
//!
//! Wire format (all lengths big-endian `u32`):
//! ```text
//! [header:10][body_len:4]
//! [sn_len:4][service name][sm_len:4][service method]
//! [md_len:4][metadata block][data_len:4][data]
//! ```
//! `body_len = 16 + sn_len + sm_len + md_len + data_len`.
//!
//! Decoding reads the whole body with a single exact read into a scratch
//! buffer owned by the [`Message`], then walks it with a bounds-checked
//! cursor.  The scratch buffer only ever grows, so a message reused through
//! the [`crate::protocol::pool::MessagePool`] stops allocating once it has
//! seen its largest frame.

use std::io::{self, Read, Write};
use std::ops::Range;

use crate::protocol::error::ProtocolError;
use crate::protocol::header::{Header, HEADER_SIZE};
use crate::protocol::metadata::{decode_metadata, encode_metadata, encoded_metadata_len, Metadata};

/// Size of every length field in the frame.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Bytes preceding the body: header plus the total body length.
pub const FRAME_PREFIX_SIZE: usize = HEADER_SIZE + LENGTH_PREFIX_SIZE;

/// Body bytes taken by the four section length prefixes alone.
pub const MIN_BODY_LEN: usize = 4 * LENGTH_PREFIX_SIZE;

/// Payload storage: caller-supplied bytes on the encode path, or a range of
/// the scratch buffer after a decode.
#[derive(Debug, Clone)]
enum Data {
    Owned(Vec<u8>),
    Scratch(Range<usize>),
}

/// One RPC frame: header, target method, metadata and opaque payload.
///
/// # Examples
///
/// ```rust
/// use lrpc_core::protocol::header::{MessageKind, SerializeKind};
/// use lrpc_core::protocol::message::Message;
///
/// let mut msg = Message::new();
/// msg.header_mut().set_kind(MessageKind::Request);
/// msg.header_mut().set_serialize_kind(SerializeKind::Raw);
/// msg.header_mut().set_seq(7);
/// msg.set_service_name("greeter");
/// msg.set_service_method("Hello");
/// msg.set_data(b"hi".to_vec());
///
/// let mut wire = Vec::new();
/// let written = msg.write_to(&mut wire).unwrap();
///
/// let mut decoded = Message::new();
/// let read = decoded.read_from(&mut wire.as_slice()).unwrap();
/// assert_eq!(written, read);
/// assert_eq!(decoded.service_method(), "Hello");
/// assert_eq!(decoded.data(), b"hi");
/// ```
#[derive(Debug, Clone)]
pub struct Message {
    header: Header,
    metadata: Metadata,
    service_name: String,
    service_method: String,
    data: Data,
    scratch: Vec<u8>,
}

impl Message {
    /// Creates an empty message whose header already carries the magic number.
    pub fn new() -> Self {
        Self {
            header: Header::new(),
            metadata: Metadata::new(),
            service_name: String::new(),
            service_method: String::new(),
            data: Data::Owned(Vec::new()),
            scratch: Vec::new(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn set_service_name(&mut self, name: impl Into<String>) {
        self.service_name = name.into();
    }

    pub fn service_method(&self) -> &str {
        &self.service_method
    }

    pub fn set_service_method(&mut self, method: impl Into<String>) {
        self.service_method = method.into();
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.metadata = metadata;
    }

    /// The payload.  After [`Message::read_from`] this borrows the scratch
    /// buffer, so it stays valid only until the next read into this message.
    pub fn data(&self) -> &[u8] {
        match &self.data {
            Data::Owned(bytes) => bytes.as_slice(),
            Data::Scratch(range) => &self.scratch[range.clone()],
        }
    }

    pub fn set_data(&mut self, data: impl Into<Vec<u8>>) {
        self.data = Data::Owned(data.into());
    }

    /// Moves the payload out, leaving the message with empty data.
    ///
    /// A decoded payload is copied out of the scratch buffer; the scratch
    /// storage itself is kept for the next read.
    pub fn take_data(&mut self) -> Vec<u8> {
        match std::mem::replace(&mut self.data, Data::Owned(Vec::new())) {
            Data::Owned(bytes) => bytes,
            Data::Scratch(range) => self.scratch[range].to_vec(),
        }
    }

    /// Clears the header fields and the body while keeping the magic number
    /// and the scratch buffer's capacity.
    pub fn reset(&mut self) {
        self.header = Header::new();
        self.metadata.clear();
        self.service_name.clear();
        self.service_method.clear();
        self.data = Data::Owned(Vec::new());
    }

    /// Current capacity of the decode scratch buffer.
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.capacity()
    }

    /// Total number of bytes [`Message::write_to`] will produce.
    pub fn encoded_len(&self) -> usize {
        FRAME_PREFIX_SIZE
            + MIN_BODY_LEN
            + self.service_name.len()
            + self.service_method.len()
            + encoded_metadata_len(&self.metadata)
            + self.data().len()
    }

    // ── Encoding ──────────────────────────────────────────────────────────────

    /// Writes the complete frame to `writer`.
    ///
    /// Bytes go straight to the writer in wire order with no intermediate
    /// buffering, so whatever was accepted before a failure has already
    /// reached the sink.
    ///
    /// Returns the total number of bytes written (`14 + body_len`).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Io`] carrying the number of bytes the writer
    /// accepted before the first failure, or [`ProtocolError::BodyTooLong`]
    /// if the sections do not fit a 32-bit length (nothing is written then).
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<u64, ProtocolError> {
        let mut meta = Vec::new();
        encode_metadata(&self.metadata, &mut meta);

        let sections: [&[u8]; 4] = [
            self.service_name.as_bytes(),
            self.service_method.as_bytes(),
            &meta,
            self.data(),
        ];
        let body_len = sections
            .iter()
            .map(|s| (LENGTH_PREFIX_SIZE + s.len()) as u64)
            .sum::<u64>();
        let body_len =
            u32::try_from(body_len).map_err(|_| ProtocolError::BodyTooLong { len: body_len })?;

        let mut out = FrameWriter::new(writer);
        out.put(self.header.as_bytes())?;
        out.put(&body_len.to_be_bytes())?;
        for section in sections {
            // Each section fits since the sum does
            out.put(&(section.len() as u32).to_be_bytes())?;
            out.put(section)?;
        }
        Ok(out.written)
    }

    // ── Decoding ──────────────────────────────────────────────────────────────

    /// Reads one complete frame from `reader` into this message.
    ///
    /// The magic number is not checked; callers must call
    /// [`Header::check_magic_number`] before trusting the frame.  The body
    /// length field is trusted as-is; see [`Message::read_from_limited`] for
    /// untrusted peers.
    ///
    /// Returns the total number of bytes read (`14 + body_len`).
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Io`] if the stream fails or ends early, with the
    ///   number of bytes consumed so far.
    /// - [`ProtocolError::Metadata`] if the metadata block is malformed; the
    ///   pairs parsed before the failure are available through
    ///   [`ProtocolError::partial_metadata`].
    /// - [`ProtocolError::SectionOverrun`] / [`ProtocolError::TrailingBytes`]
    ///   if the section lengths disagree with the body length.
    /// - [`ProtocolError::InvalidUtf8`] if the service name or method is not
    ///   UTF-8.
    pub fn read_from<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<u64, ProtocolError> {
        self.read_frame(reader, None)
    }

    /// Like [`Message::read_from`], but fails with
    /// [`ProtocolError::FrameTooLarge`] before allocating if the declared
    /// body length exceeds `max_body_len`.
    pub fn read_from_limited<R: Read + ?Sized>(
        &mut self,
        reader: &mut R,
        max_body_len: u32,
    ) -> Result<u64, ProtocolError> {
        self.read_frame(reader, Some(max_body_len))
    }

    fn read_frame<R: Read + ?Sized>(
        &mut self,
        reader: &mut R,
        limit: Option<u32>,
    ) -> Result<u64, ProtocolError> {
        // The previous payload range may not fit the resized scratch buffer
        self.data = Data::Owned(Vec::new());

        let mut input = FrameReader::new(reader);
        input.fill(self.header.as_mut_bytes())?;

        let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
        input.fill(&mut len_buf)?;
        let body_len = u32::from_be_bytes(len_buf);
        if let Some(limit) = limit {
            if body_len > limit {
                return Err(ProtocolError::FrameTooLarge {
                    declared: body_len,
                    limit,
                });
            }
        }

        // `resize` reuses the existing allocation whenever it is big enough
        self.scratch.clear();
        self.scratch.resize(body_len as usize, 0);
        input.fill(&mut self.scratch)?;

        self.parse_body(input.read)?;
        Ok(input.read)
    }

    /// Splits the scratch buffer into the four sections.
    fn parse_body(&mut self, transferred: u64) -> Result<(), ProtocolError> {
        let mut cursor = SectionCursor::new(&self.scratch);
        let name = cursor.next_section("service name")?;
        let method = cursor.next_section("service method")?;
        let meta = cursor.next_section("metadata")?;
        let data = cursor.next_section("data")?;
        cursor.finish()?;

        copy_utf8(&mut self.service_name, &self.scratch[name], "service name")?;
        copy_utf8(&mut self.service_method, &self.scratch[method], "service method")?;
        self.metadata = decode_metadata(&self.scratch[meta])
            .map_err(|source| ProtocolError::Metadata {
                transferred,
                source,
            })?;
        self.data = Data::Scratch(data);
        Ok(())
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

// ── Stream helpers ────────────────────────────────────────────────────────────

/// Writes through to the sink while counting accepted bytes.
struct FrameWriter<'a, W: Write + ?Sized> {
    writer: &'a mut W,
    written: u64,
}

impl<'a, W: Write + ?Sized> FrameWriter<'a, W> {
    fn new(writer: &'a mut W) -> Self {
        Self { writer, written: 0 }
    }

    fn put(&mut self, mut bytes: &[u8]) -> Result<(), ProtocolError> {
        while !bytes.is_empty() {
            match self.writer.write(bytes) {
                Ok(0) => return Err(self.fail(io::ErrorKind::WriteZero.into())),
                Ok(n) => {
                    self.written += n as u64;
                    bytes = &bytes[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(self.fail(e)),
            }
        }
        Ok(())
    }

    fn fail(&self, source: io::Error) -> ProtocolError {
        ProtocolError::Io {
            transferred: self.written,
            source,
        }
    }
}

/// Exact reads with a running count of consumed bytes.
struct FrameReader<'a, R: Read + ?Sized> {
    reader: &'a mut R,
    read: u64,
}

impl<'a, R: Read + ?Sized> FrameReader<'a, R> {
    fn new(reader: &'a mut R) -> Self {
        Self { reader, read: 0 }
    }

    /// Fills `buf` completely or fails; short reads are retried.
    fn fill(&mut self, mut buf: &mut [u8]) -> Result<(), ProtocolError> {
        while !buf.is_empty() {
            match self.reader.read(buf) {
                Ok(0) => return Err(self.fail(io::ErrorKind::UnexpectedEof.into())),
                Ok(n) => {
                    self.read += n as u64;
                    buf = &mut buf[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(self.fail(e)),
            }
        }
        Ok(())
    }

    fn fail(&self, source: io::Error) -> ProtocolError {
        ProtocolError::Io {
            transferred: self.read,
            source,
        }
    }
}

/// Walks `[len:4][bytes]` sections of a frame body.
struct SectionCursor<'a> {
    body: &'a [u8],
    offset: usize,
}

impl<'a> SectionCursor<'a> {
    fn new(body: &'a [u8]) -> Self {
        Self { body, offset: 0 }
    }

    fn next_section(&mut self, section: &'static str) -> Result<Range<usize>, ProtocolError> {
        let prefix_end = self.offset + LENGTH_PREFIX_SIZE;
        let Some(prefix) = self.body.get(self.offset..prefix_end) else {
            return Err(self.overrun(section, LENGTH_PREFIX_SIZE));
        };
        let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        if self.body.len() - prefix_end < len {
            return Err(self.overrun(section, LENGTH_PREFIX_SIZE + len));
        }
        self.offset = prefix_end + len;
        Ok(prefix_end..self.offset)
    }

    fn finish(&self) -> Result<(), ProtocolError> {
        match self.body.len() - self.offset {
            0 => Ok(()),
            extra => Err(ProtocolError::TrailingBytes { extra }),
        }
    }

    fn overrun(&self, section: &'static str, needed: usize) -> ProtocolError {
        ProtocolError::SectionOverrun {
            section,
            offset: self.offset,
            needed,
            body_len: self.body.len(),
        }
    }
}

/// Replaces `dst` with `src`, reusing `dst`'s allocation.
fn copy_utf8(dst: &mut String, src: &[u8], section: &'static str) -> Result<(), ProtocolError> {
    let s = std::str::from_utf8(src).map_err(|_| ProtocolError::InvalidUtf8 { section })?;
    dst.clear();
    dst.push_str(s);
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
