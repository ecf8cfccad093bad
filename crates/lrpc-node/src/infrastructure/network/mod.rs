//! Network infrastructure: blocking TCP transport for lrpc frames.
//!
//! - **`server`** – binds the listener and runs one thread per accepted
//!   connection.
//! - **`connection`** – the per-connection read/dispatch/reply loop.
//! - **`client`** – issues calls over a single connection.

use std::io::Write;

use lrpc_core::protocol::{Message, ProtocolError};

pub mod client;
pub mod connection;
pub mod server;

/// Writes `msg` and flushes, so a buffered stream never holds a frame back.
pub(crate) fn send_frame<W: Write + ?Sized>(
    msg: &Message,
    writer: &mut W,
) -> Result<u64, ProtocolError> {
    let written = msg.write_to(writer)?;
    writer.flush().map_err(|source| ProtocolError::Io {
        transferred: written,
        source,
    })?;
    Ok(written)
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
pub(crate) fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

/// In-memory duplex stream for driving connections and clients in tests.
#[cfg(test)]
pub(crate) mod test_stream {
    use std::io::{self, Cursor, Read, Write};

    use lrpc_core::protocol::Message;

    #[derive(Debug, Default)]
    pub struct MemoryStream {
        input: Cursor<Vec<u8>>,
        pub output: Vec<u8>,
    }

    impl MemoryStream {
        /// A stream whose read side yields `frames` back to back.
        pub fn with_frames(frames: &[Message]) -> Self {
            let mut input = Vec::new();
            for frame in frames {
                frame.write_to(&mut input).expect("encode test frame");
            }
            Self::with_bytes(input)
        }

        pub fn with_bytes(input: Vec<u8>) -> Self {
            Self {
                input: Cursor::new(input),
                output: Vec::new(),
            }
        }

        /// Decodes everything written so far.
        pub fn written_frames(&self) -> Vec<Message> {
            let mut frames = Vec::new();
            let mut rest = self.output.as_slice();
            while !rest.is_empty() {
                let mut msg = Message::new();
                msg.read_from(&mut rest).expect("decode written frame");
                frames.push(msg);
            }
            frames
        }
    }

    impl Read for MemoryStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for MemoryStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
