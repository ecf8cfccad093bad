//! Sequence numbers for correlating replies with the calls that caused them.
//!
//! A caller stamps every outgoing frame with a fresh value from a
//! [`SequenceCounter`]; the peer copies it into the reply header.  The
//! framer itself never interprets the value.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free source of sequence numbers, shareable between threads.
///
/// Values wrap from `u64::MAX` back to 0.
///
/// # Examples
///
/// ```rust
/// use lrpc_core::protocol::SequenceCounter;
///
/// let counter = SequenceCounter::starting_at(7);
/// assert_eq!(counter.next(), 7);
/// assert_eq!(counter.next(), 8);
/// assert_eq!(counter.peek(), 9);
/// ```
#[derive(Debug, Default)]
pub struct SequenceCounter {
    next: AtomicU64,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Returns a number no other caller of this counter has received since
    /// the last wrap.
    pub fn next(&self) -> u64 {
        // fetch_add wraps on overflow
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The value the next call to [`next`](Self::next) would return, racy
    /// under concurrent use.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
