//! Reuse of [`Message`] instances and their decode buffers.
//!
//! A decode-heavy connection reads thousands of frames per second.  Returning
//! each message to a [`MessagePool`] after use lets the next read reuse the
//! message's scratch buffer, strings and metadata map instead of allocating
//! fresh ones.
//!
//! The pool is an ordinary value: create one and share it (usually behind an
//! `Arc`) between the connections that should draw from it.  Nothing here is
//! global.
//!
//! Correctness never depends on a pool hit.  A message from
//! [`MessagePool::acquire`] behaves exactly like [`Message::new`] once the
//! caller has written the fields it uses.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::protocol::message::Message;

/// Idle instances kept by [`MessagePool::default`].
pub const DEFAULT_MAX_IDLE: usize = 1024;

/// A thread-safe free list of boxed [`Message`]s.
///
/// # Examples
///
/// ```rust
/// use lrpc_core::protocol::pool::MessagePool;
///
/// let pool = MessagePool::new(16);
/// let msg = pool.acquire();
/// assert!(msg.header().check_magic_number());
/// pool.release(msg);
/// assert_eq!(pool.idle_len(), 1);
/// ```
pub struct MessagePool {
    idle: Mutex<Vec<Box<Message>>>,
    max_idle: usize,
    stats: PoolStats,
}

/// Counters describing pool effectiveness.
#[derive(Debug, Default)]
struct PoolStats {
    hits: AtomicU64,
    misses: AtomicU64,
    released: AtomicU64,
    discarded: AtomicU64,
}

/// Point-in-time copy of the pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStatsSnapshot {
    /// `acquire` calls served from the idle list.
    pub hits: u64,
    /// `acquire` calls that allocated a new message.
    pub misses: u64,
    /// `release` calls that kept the message.
    pub released: u64,
    /// `release` calls that dropped the message because the pool was full.
    pub discarded: u64,
}

impl PoolStatsSnapshot {
    /// Fraction of acquisitions served from the pool, in percent.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        (self.hits as f64 / total as f64) * 100.0
    }
}

impl MessagePool {
    /// Creates an empty pool that keeps at most `max_idle` released messages.
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            stats: PoolStats::default(),
        }
    }

    /// Returns an idle message, or a fresh one when none is idle.
    ///
    /// A reused message still holds the fields of its previous use; only the
    /// magic number is guaranteed.  Overwrite every header and body field
    /// you rely on, or call [`Message::reset`].
    pub fn acquire(&self) -> Box<Message> {
        let reused = self.idle.lock().pop();
        match reused {
            Some(msg) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                msg
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                Box::new(Message::new())
            }
        }
    }

    /// Hands a message back for reuse.
    ///
    /// The caller must be finished with the message's data and metadata: the
    /// next [`Message::read_from`] on this instance overwrites the scratch
    /// buffer that backs them.  Because `release` takes the box by value, the
    /// borrow checker rejects any reference into the message that outlives
    /// this call.
    ///
    /// Once `max_idle` messages are idle, further releases drop the message
    /// so the pool cannot grow without bound.
    pub fn release(&self, msg: Box<Message>) {
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(msg);
            self.stats.released.fetch_add(1, Ordering::Relaxed);
        } else {
            drop(idle);
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of messages currently waiting for reuse.
    pub fn idle_len(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn max_idle(&self) -> usize {
        self.max_idle
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            released: self.stats.released.load(Ordering::Relaxed),
            discarded: self.stats.discarded.load(Ordering::Relaxed),
        }
    }
}

impl Default for MessagePool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE)
    }
}

impl std::fmt::Debug for MessagePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePool")
            .field("idle", &self.idle_len())
            .field("max_idle", &self.max_idle)
            .field("stats", &self.stats())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::header::MessageKind;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fresh_message_has_magic_number() {
        let pool = MessagePool::new(4);
        let msg = pool.acquire();

        assert!(msg.header().check_magic_number());
        assert_eq!(pool.stats().misses, 1);
    }

    #[test]
    fn test_release_then_acquire_reuses_allocation() {
        let pool = MessagePool::new(4);
        let msg = pool.acquire();
        let addr = &*msg as *const Message;
        pool.release(msg);

        let again = pool.acquire();
        assert_eq!(&*again as *const Message, addr);
        assert_eq!(pool.stats().hits, 1);
    }

    #[test]
    fn test_reused_message_keeps_stale_fields_and_magic() {
        let pool = MessagePool::new(4);
        let mut msg = pool.acquire();
        msg.header_mut().set_kind(MessageKind::Pong);
        msg.set_service_name("stale");
        pool.release(msg);

        let msg = pool.acquire();
        assert!(msg.header().check_magic_number());
        assert_eq!(msg.service_name(), "stale");
    }

    #[test]
    fn test_release_beyond_max_idle_discards() {
        let pool = MessagePool::new(2);
        let messages: Vec<_> = (0..3).map(|_| pool.acquire()).collect();
        for msg in messages {
            pool.release(msg);
        }

        assert_eq!(pool.idle_len(), 2);
        let stats = pool.stats();
        assert_eq!(stats.released, 2);
        assert_eq!(stats.discarded, 1);
    }

    #[test]
    fn test_zero_capacity_pool_still_serves_messages() {
        let pool = MessagePool::new(0);
        let msg = pool.acquire();
        pool.release(msg);
        let msg = pool.acquire();

        assert!(msg.header().check_magic_number());
        assert_eq!(pool.idle_len(), 0);
        assert_eq!(pool.stats().hits, 0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = PoolStatsSnapshot {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 75.0).abs() < f64::EPSILON);
        assert_eq!(PoolStatsSnapshot::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_concurrent_acquirers_never_share_an_instance() {
        let pool = Arc::new(MessagePool::new(64));
        let thread_count = 8;
        let rounds = 500;

        let handles: Vec<_> = (0..thread_count)
            .map(|t| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for round in 0..rounds {
                        let mut msg = pool.acquire();
                        // Tag the instance, then check nobody else changed it
                        let tag = (t * rounds + round) as u64;
                        msg.header_mut().set_seq(tag);
                        thread::yield_now();
                        assert_eq!(msg.header().seq(), tag, "instance shared between threads");
                        pool.release(msg);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("worker panicked");
        }

        let stats = pool.stats();
        assert_eq!(stats.hits + stats.misses, (thread_count * rounds) as u64);
        // Steady load never needs more instances than concurrent holders
        assert!(stats.misses <= thread_count as u64);
        assert!(pool.idle_len() <= thread_count);
    }

    #[test]
    fn test_idle_instances_are_distinct() {
        let pool = MessagePool::new(8);
        let held: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
        let addrs: HashSet<_> = held.iter().map(|m| &**m as *const Message).collect();
        assert_eq!(addrs.len(), 5);
    }
}
