//! # frame_relay
//!
//! A latest-value slot shared by one producer and one consumer that run at
//! their own, uncoordinated rates.
//!
//! * [`Relay::publish`] replaces whatever is stored.  It never blocks and never
//!   queues, so a slow consumer silently misses intermediate values.
//! * [`Relay::fetch_latest`] returns the most recent value, or `None` before
//!   the first publish.  It never blocks.
//!
//! Values are stored behind an `Arc` and swapped in as a whole, so a reader
//! always sees one complete published value, never a mix of two.
//!
//! ```rust
//! use frame_relay::Relay;
//!
//! let relay = Relay::new();
//! assert!(relay.fetch_latest().is_none());
//!
//! relay.publish(1);
//! relay.publish(2);
//! let latest = relay.fetch_latest().unwrap();
//! assert_eq!(*latest, 2);
//! assert_eq!(latest.seq(), 2);
//! ```

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

// ════════════════════════════════════════════════════════════════════════════
// Latest — a fetched snapshot
// ════════════════════════════════════════════════════════════════════════════

struct Slot<T> {
    seq:   u64,
    value: T,
}

/// A published value as seen by the consumer.
///
/// Holding a `Latest` keeps that value alive even after the producer has
/// published a newer one.
pub struct Latest<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Latest<T> {
    /// 1-based publish number of this value.
    pub fn seq(&self) -> u64 { self.slot.seq }
}

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Latest { slot: Arc::clone(&self.slot) }
    }
}

impl<T> Deref for Latest<T> {
    type Target = T;
    fn deref(&self) -> &T { &self.slot.value }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Latest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Latest")
            .field("seq", &self.slot.seq)
            .field("value", &self.slot.value)
            .finish()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Relay
// ════════════════════════════════════════════════════════════════════════════

struct Shared<T> {
    slot: ArcSwapOption<Slot<T>>,
    /// Publish counter.  Only the producer writes it.
    seq:  AtomicU64,
}

/// Cloneable handle to a shared latest-value slot.
pub struct Relay<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Relay<T> {
    pub fn new() -> Self {
        Relay {
            shared: Arc::new(Shared {
                slot: ArcSwapOption::empty(),
                seq:  AtomicU64::new(0),
            }),
        }
    }

    /// Overwrite the slot with `value`.
    pub fn publish(&self, value: T) {
        let seq = self.shared.seq.fetch_add(1, Ordering::AcqRel) + 1;
        self.shared.slot.store(Some(Arc::new(Slot { seq, value })));
    }

    /// The most recently published value, if any.
    pub fn fetch_latest(&self) -> Option<Latest<T>> {
        self.shared.slot.load_full().map(|slot| Latest { slot })
    }

    /// The latest value only if it was published after `last_seen`.
    ///
    /// Pass `0` to accept any value.
    pub fn fetch_newer(&self, last_seen: u64) -> Option<Latest<T>> {
        self.fetch_latest().filter(|l| l.seq() > last_seen)
    }

    /// Number of publishes so far.
    pub fn published(&self) -> u64 {
        self.shared.seq.load(Ordering::Acquire)
    }
}

impl<T> Clone for Relay<T> {
    fn clone(&self) -> Self {
        Relay { shared: Arc::clone(&self.shared) }
    }
}

impl<T> Default for Relay<T> {
    fn default() -> Self { Relay::new() }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
