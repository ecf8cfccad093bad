//! The fixed 10-byte frame header.
//!
//! Wire layout:
//! ```text
//! [magic:1][kind:4 bits|serialize:4 bits][seq:8]
//! ```
//! The sequence number is big-endian.  The message kind occupies the high
//! nibble of byte 1 and the serialize kind the low nibble; each setter masks
//! so that writing one nibble never disturbs the other.

/// Sentinel value stored in byte 0 of every frame.
pub const MAGIC_NUMBER: u8 = 0xFE;

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 10;

const KIND_SHIFT: u8 = 4;
const LOW_NIBBLE: u8 = 0x0F;
const HIGH_NIBBLE: u8 = 0xF0;

// ── Message kind ──────────────────────────────────────────────────────────────

/// Role of a frame in the request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// A call that expects a `Response` or `Error`.
    Request = 0,
    /// A call that expects no reply.
    Oneway = 1,
    /// Heartbeat probe.
    Ping = 2,
    /// Successful reply to a `Request`.
    Response = 3,
    /// Heartbeat reply.
    Pong = 4,
    /// Failed reply to a `Request`.
    Error = 5,
}

impl TryFrom<u8> for MessageKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(MessageKind::Request),
            1 => Ok(MessageKind::Oneway),
            2 => Ok(MessageKind::Ping),
            3 => Ok(MessageKind::Response),
            4 => Ok(MessageKind::Pong),
            5 => Ok(MessageKind::Error),
            _ => Err(()),
        }
    }
}

// ── Serialize kind ────────────────────────────────────────────────────────────

/// Identifies the body codec that produced the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SerializeKind {
    /// Payload bytes are passed through untouched.
    Raw = 0,
    /// Payload is JSON.
    Json = 1,
    /// Payload is a Protocol-Buffers message.
    Protobuf = 2,
}

impl TryFrom<u8> for SerializeKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(SerializeKind::Raw),
            1 => Ok(SerializeKind::Json),
            2 => Ok(SerializeKind::Protobuf),
            _ => Err(()),
        }
    }
}

// ── Header ────────────────────────────────────────────────────────────────────

/// The 10-byte control block at the start of every frame.
///
/// # Examples
///
/// ```rust
/// use lrpc_core::protocol::header::{Header, MessageKind, SerializeKind};
///
/// let mut header = Header::new();
/// header.set_kind(MessageKind::Request);
/// header.set_serialize_kind(SerializeKind::Json);
/// header.set_seq(42);
///
/// assert!(header.check_magic_number());
/// assert_eq!(header.kind(), Some(MessageKind::Request));
/// assert_eq!(header.serialize_kind(), Some(SerializeKind::Json));
/// assert_eq!(header.seq(), 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header([u8; HEADER_SIZE]);

impl Header {
    /// Creates a header with the magic byte set and every other field zeroed
    /// (`Request`, `Raw`, seq 0).
    pub fn new() -> Self {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0] = MAGIC_NUMBER;
        Self(bytes)
    }

    /// Wraps raw header bytes as received from the wire.  No validation is
    /// performed; call [`Header::check_magic_number`] before trusting them.
    pub fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HEADER_SIZE] {
        &self.0
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; HEADER_SIZE] {
        &mut self.0
    }

    /// Returns `true` iff byte 0 equals [`MAGIC_NUMBER`].
    pub fn check_magic_number(&self) -> bool {
        self.0[0] == MAGIC_NUMBER
    }

    /// Raw high nibble of byte 1.
    pub fn kind_bits(&self) -> u8 {
        self.0[1] >> KIND_SHIFT
    }

    /// Raw low nibble of byte 1.
    pub fn serialize_bits(&self) -> u8 {
        self.0[1] & LOW_NIBBLE
    }

    /// The message kind, or `None` when the nibble holds an undefined value.
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::try_from(self.kind_bits()).ok()
    }

    /// Writes the high nibble of byte 1, preserving the serialize kind.
    pub fn set_kind(&mut self, kind: MessageKind) {
        self.0[1] = (self.0[1] & LOW_NIBBLE) | ((kind as u8) << KIND_SHIFT);
    }

    /// The serialize kind, or `None` when the nibble holds an undefined value.
    pub fn serialize_kind(&self) -> Option<SerializeKind> {
        SerializeKind::try_from(self.serialize_bits()).ok()
    }

    /// Writes the low nibble of byte 1, preserving the message kind.
    pub fn set_serialize_kind(&mut self, kind: SerializeKind) {
        self.0[1] = (self.0[1] & HIGH_NIBBLE) | (kind as u8 & LOW_NIBBLE);
    }

    /// Sequence number (bytes 2..10, big-endian).
    pub fn seq(&self) -> u64 {
        let mut seq = [0u8; 8];
        seq.copy_from_slice(&self.0[2..HEADER_SIZE]);
        u64::from_be_bytes(seq)
    }

    pub fn set_seq(&mut self, seq: u64) {
        self.0[2..HEADER_SIZE].copy_from_slice(&seq.to_be_bytes());
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
