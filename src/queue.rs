//! Fixed-capacity single-producer/single-consumer queue between pipeline stages.
//!
//! The ring keeps one slot free so the writer never catches up with the reader: a
//! queue created with capacity `n > 1` holds at most `n - 1` items. A queue of
//! capacity one holds a single item. Neither side blocks; a rejected `push` hands the
//! item back and an empty `pop` is the caller's cue to retry.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::error::{Result, VocEvalError};

struct Ring<T> {
    slots: Vec<Option<T>>,
    read: usize,
    len: usize,
}

impl<T> Ring<T> {
    fn limit(&self) -> usize {
        self.slots.len().saturating_sub(1).max(1)
    }
}

/// Bounded FIFO queue with mutex-protected index bookkeeping.
///
/// # Example
///
/// ```
/// use voc_eval::queue::BoundedQueue;
///
/// let queue = BoundedQueue::new(3).unwrap();
/// assert!(queue.push("a").is_ok());
/// assert!(queue.push("b").is_ok());
/// assert_eq!(queue.push("c"), Err("c"));
/// assert_eq!(queue.pop(), Some("a"));
/// assert_eq!(queue.pop(), Some("b"));
/// assert_eq!(queue.pop(), None);
/// ```
pub struct BoundedQueue<T> {
    ring: Mutex<Ring<T>>,
}

impl<T> BoundedQueue<T> {
    /// Create a queue with `capacity` ring slots.
    ///
    /// # Errors
    ///
    /// Returns [`VocEvalError::InvalidSettings`] for a capacity of zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(VocEvalError::InvalidSettings(
                "queue capacity must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            ring: Mutex::new(Ring {
                slots: (0..capacity).map(|_| None).collect(),
                read: 0,
                len: 0,
            }),
        })
    }

    // Indices are only written under the lock, so a poisoned ring is still consistent.
    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of ring slots, including the one kept free.
    pub fn capacity(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.lock().len == 0
    }

    pub fn is_full(&self) -> bool {
        let ring = self.lock();
        ring.len >= ring.limit()
    }

    /// Append `item`, or give it back when the queue is full.
    pub fn push(&self, item: T) -> std::result::Result<(), T> {
        let mut ring = self.lock();
        if ring.len >= ring.limit() {
            trace!(len = ring.len, "queue full");
            return Err(item);
        }

        let write = (ring.read + ring.len) % ring.slots.len();
        ring.slots[write] = Some(item);
        ring.len += 1;
        trace!(slot = write, len = ring.len, "queue push");
        Ok(())
    }

    /// Take the oldest item, or `None` when the queue is empty.
    pub fn pop(&self) -> Option<T> {
        let mut ring = self.lock();
        if ring.len == 0 {
            return None;
        }

        let read = ring.read;
        let item = ring.slots[read].take();
        ring.read = (read + 1) % ring.slots.len();
        ring.len -= 1;
        trace!(slot = read, len = ring.len, "queue pop");
        item
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ring = self.lock();
        f.debug_struct("BoundedQueue")
            .field("capacity", &ring.slots.len())
            .field("len", &ring.len)
            .finish()
    }
}
