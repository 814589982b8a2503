//! Lock-free SPSC queue for in-process (inter-thread) communication.
//!
//! A bounded queue over a heap-allocated [`Ring`] with one write end and one
//! read end.
//!
//! # Overview
//!
//! - [`Producer`] - Write end (single producer per queue)
//! - [`Consumer`] - Read end (single consumer per queue)
//! - Lock-free: no mutexes or syscalls anywhere; a full queue makes `push`
//!   spin and an empty queue makes `front` return `None`
//!
//! # Example
//!
//! ```
//! use tandem::sync::spsc::{self, InlineLayout};
//!
//! let (producer, mut consumer) = spsc::channel::<u64, InlineLayout<u64>>(1024)?;
//!
//! // Producer thread
//! producer.push(42);
//!
//! // Consumer thread
//! assert_eq!(consumer.front(), Some(&42));
//! assert!(consumer.pop());
//! # Ok::<(), tandem::QueueError>(())
//! ```
//!
//! # Variants
//!
//! The storage parameter selects placement and cursor strategy together:
//!
//! | Alias             | Placement                 | Ordering                     |
//! |-------------------|---------------------------|------------------------------|
//! | [`HeapLayout`]    | header and slots apart    | acquire/release atomics      |
//! | [`InlineLayout`]  | slots trail the header    | acquire/release atomics      |
//! | [`FenceLayout`]   | fixed `N` slots, one block| relaxed words + CPU fences   |
//!
//! Any other [`Storage`] combination works the same way, e.g.
//! `Inline<T, FencedCursors<Line128, Portable>>`.
//!
//! # Role enforcement
//!
//! Each handle is [`Send`] but not [`Sync`], so exactly one thread can act as
//! producer and one as consumer:
//!
//! ```compile_fail
//! use tandem::sync::spsc::{channel, HeapLayout};
//!
//! fn assert_sync<T: Sync>(_: &T) {}
//!
//! let (producer, _consumer) = channel::<u64, HeapLayout<u64>>(8).unwrap();
//! assert_sync(&producer);
//! ```
//!
//! A reference from [`Consumer::front`] cannot outlive the next `pop`:
//!
//! ```compile_fail
//! use tandem::sync::spsc::{channel, HeapLayout};
//!
//! let (producer, mut consumer) = channel::<String, HeapLayout<String>>(8).unwrap();
//! producer.push("a".to_string());
//! let first = consumer.front().unwrap();
//! consumer.pop();
//! println!("{first}");
//! ```

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::barrier::Hardware;
use crate::cache::Line64;
use crate::config::QueueConfig;
use crate::error::Result;
use crate::spsc::cursors::{AtomicCursors, FencedCursors};
use crate::spsc::ring::Ring;
use crate::spsc::storage::{Fixed, Inline, Separate, Storage};

/// Separately allocated header and slots, acquire/release cursors.
pub type HeapLayout<T, L = Line64> = Separate<T, AtomicCursors<L>>;

/// Single allocation with trailing slots, acquire/release cursors.
pub type InlineLayout<T, L = Line64> = Inline<T, AtomicCursors<L>>;

/// Single allocation with `N` compile-time slots, cursors ordered by x86
/// fence instructions (portable fences on other targets).
pub type FenceLayout<T, const N: usize, L = Line64> = Fixed<T, N, FencedCursors<L, Hardware>>;

/// Marker type to opt-out of `Sync` while remaining `Send`.
type PhantomUnsync = PhantomData<Cell<&'static ()>>;

/// Write end of the SPSC queue.
///
/// # Thread Safety
///
/// `Producer` is [`Send`] but **not** [`Sync`]:
/// - Can transfer ownership to another thread
/// - Cannot share `&Producer` (no concurrent `push()`)
pub struct Producer<T: Send, S: Storage<T>> {
    ring: Arc<Ring<T, S>>,
    _unsync: PhantomUnsync,
}

/// Read end of the SPSC queue.
///
/// See [`Producer`] for thread safety details (same semantics apply).
pub struct Consumer<T: Send, S: Storage<T>> {
    ring: Arc<Ring<T, S>>,
    _unsync: PhantomUnsync,
}

/// Creates a queue holding at least `requested` elements.
///
/// The ring gets `max(requested + 1, 4)` slots; one is always kept empty.
/// The storage is released once both handles have been dropped, after every
/// element still in the queue has been dropped.
///
/// # Errors
///
/// Fails if the capacity overflows, a [`Fixed`] placement is too small, or
/// the allocator returns null.
///
/// # Example
///
/// ```
/// use tandem::sync::spsc::{self, HeapLayout};
///
/// let (tx, mut rx) = spsc::channel::<String, HeapLayout<String>>(16)?;
///
/// tx.push("hello".to_string());
/// assert_eq!(rx.take(), Some("hello".to_string()));
/// # Ok::<(), tandem::QueueError>(())
/// ```
pub fn channel<T: Send, S: Storage<T>>(requested: usize) -> Result<(Producer<T, S>, Consumer<T, S>)> {
    let ring = Arc::new(Ring::with_capacity(requested)?);

    let producer = Producer {
        ring: Arc::clone(&ring),
        _unsync: PhantomData,
    };

    let consumer = Consumer {
        ring,
        _unsync: PhantomData,
    };

    Ok((producer, consumer))
}

/// Creates a queue from a [`QueueConfig`].
///
/// # Errors
///
/// See [`channel`].
pub fn channel_with<T: Send, S: Storage<T>>(config: QueueConfig) -> Result<(Producer<T, S>, Consumer<T, S>)> {
    channel(config.capacity)
}

impl<T: Send, S: Storage<T>> Producer<T, S> {
    /// Pushes an item, spinning while the queue is full.
    ///
    /// Always returns `true`. If the consumer stops popping, this never
    /// returns; wrap [`try_push`](Self::try_push) to bound the wait.
    #[inline]
    pub fn push(&self, item: T) -> bool {
        // SAFETY: Producer has exclusive access to the producer side of the ring.
        unsafe { self.ring.push(item) };
        true
    }

    /// Spins until a slot is free, then stores the value built by `make`.
    ///
    /// If `make` panics the queue is left exactly as it was.
    #[inline]
    pub fn push_with<F: FnOnce() -> T>(&self, make: F) -> bool {
        // SAFETY: Producer has exclusive access to the producer side of the ring.
        unsafe { self.ring.push_with(make) };
        true
    }

    /// Attempts to push an item without waiting.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` if the queue is full, allowing retry.
    #[inline]
    pub fn try_push(&self, item: T) -> std::result::Result<(), T> {
        // SAFETY: Producer has exclusive access to the producer side of the ring.
        unsafe { self.ring.try_push(item) }
    }

    /// Snapshot of the number of queued elements; see [`Ring::size`].
    pub fn size(&self) -> usize {
        self.ring.size()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Number of slots, one more than the number of elements that fit.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl<T: Send, S: Storage<T>> Consumer<T, S> {
    /// Returns the oldest element without removing it, or `None` if empty.
    ///
    /// The reference stays valid until the next [`pop`](Self::pop) or
    /// [`take`](Self::take).
    #[inline]
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        // SAFETY: Consumer has exclusive access to the consumer side of the
        // ring, and pop/take need &mut self, so the borrow cannot overlap them.
        unsafe { self.ring.front() }
    }

    /// Spins until an element is available, then returns it without removing it.
    #[inline]
    #[must_use]
    pub fn wait_front(&self) -> &T {
        loop {
            if let Some(item) = self.front() {
                return item;
            }
            self.ring.relax();
        }
    }

    /// Drops the oldest element.
    ///
    /// Returns `false` and does nothing if the queue is empty.
    #[inline]
    pub fn pop(&mut self) -> bool {
        // SAFETY: Consumer has exclusive access to the consumer side of the
        // ring; &mut self rules out live `front` borrows.
        unsafe { self.ring.pop() }
    }

    /// Removes and returns the oldest element, or `None` if empty.
    #[inline]
    #[must_use]
    pub fn take(&mut self) -> Option<T> {
        // SAFETY: as for pop.
        unsafe { self.ring.take() }
    }

    /// Snapshot of the number of queued elements; see [`Ring::size`].
    pub fn size(&self) -> usize {
        self.ring.size()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Number of slots, one more than the number of elements that fit.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl<T: Send, S: Storage<T>> fmt::Debug for Producer<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").field("ring", &self.ring).finish()
    }
}

impl<T: Send, S: Storage<T>> fmt::Debug for Consumer<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("ring", &self.ring).finish()
    }
}
