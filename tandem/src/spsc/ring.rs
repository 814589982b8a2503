//! Core lock-free SPSC ring buffer algorithm.
//!
//! [`Ring`] composes a [`Storage`] placement with the [`Cursors`] strategy
//! embedded in its header and implements the queue operations on top of
//! them. It owns the element lifetime discipline: an element is constructed
//! by `push`, dropped by `pop` (or moved out by `take`), and every element
//! still live when the ring is dropped is drained first.
//!
//! Slots live in the half-open range `[tail, head)` modulo `capacity`. One
//! slot is always left empty so that `head == tail` means empty and
//! `head + 1 == tail` means full without a separate count.
//!
//! # Safety
//!
//! The role operations are unsafe because they require the caller to uphold
//! the SPSC invariant: at most one thread acts as producer and at most one as
//! consumer at any time. [`crate::sync::spsc`] wraps them in handle types
//! that enforce this statically.

use std::fmt;
use std::marker::PhantomData;

use crate::error::{QueueError, Result};
use crate::spsc::cursors::Cursors;
use crate::spsc::storage::Storage;
use crate::trace::{debug, trace};

/// Smallest number of slots a ring is built with.
pub const MIN_CAPACITY: usize = 4;

/// Internal slot count for a requested usable capacity: `max(requested + 1, 4)`.
///
/// # Errors
///
/// Returns [`QueueError::CapacityOverflow`] if `requested + 1` overflows.
pub fn slots_for(requested: usize) -> Result<usize> {
    requested
        .checked_add(1)
        .map(|slots| slots.max(MIN_CAPACITY))
        .ok_or(QueueError::CapacityOverflow { requested })
}

/// A bounded SPSC ring of `T` stored in `S`.
pub struct Ring<T, S: Storage<T>> {
    storage: S,
    _owns: PhantomData<T>,
}

impl<T, S: Storage<T>> Ring<T, S> {
    /// Creates a ring able to hold at least `requested` elements.
    ///
    /// # Errors
    ///
    /// Fails if the capacity overflows, the placement rejects it, or the
    /// allocator returns null. No ring exists after a failure.
    pub fn with_capacity(requested: usize) -> Result<Self> {
        let storage = S::allocate(slots_for(requested)?)?;

        debug!(
            placement = S::NAME,
            cursors = <S::Cursors as Cursors>::NAME,
            requested,
            capacity = storage.header().capacity(),
            bytes = storage.footprint(),
            "ring created"
        );

        Ok(Self {
            storage,
            _owns: PhantomData,
        })
    }

    #[inline(always)]
    fn cursors(&self) -> &S::Cursors {
        self.storage.header().cursors()
    }

    /// Advances a cursor to the next slot index, wrapping to 0 at capacity.
    ///
    /// Equivalent to `(cursor + 1) % capacity` without the division.
    #[inline(always)]
    fn bump(&self, cursor: usize) -> usize {
        let next = cursor + 1;
        if next == self.capacity() { 0 } else { next }
    }

    /// Number of slots, including the one that is always kept empty.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.header().capacity()
    }

    /// Elements currently stored.
    ///
    /// A diagnostic snapshot: under concurrent use the value may be stale by
    /// the time it is returned. Never use it to decide whether `pop` is safe.
    pub fn size(&self) -> usize {
        let (head, tail) = self.cursors().snapshot();
        if head >= tail {
            head - tail
        } else {
            head + self.capacity() - tail
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Attempts to push an item without waiting.
    ///
    /// # Safety
    ///
    /// Caller must ensure only one thread acts as producer.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` if the queue is full.
    #[inline]
    pub unsafe fn try_push(&self, item: T) -> std::result::Result<(), T> {
        let head = self.cursors().head();
        let next = self.bump(head);
        if next == self.cursors().observe_tail() {
            return Err(item);
        }
        // SAFETY: the slot at head is outside [tail, head) and so owned by
        // the producer until publishing next hands it to the consumer.
        unsafe {
            self.storage.slot(head).write(item);
            self.cursors().publish_head(next);
        }
        Ok(())
    }

    /// Waits for a free slot, then constructs an element with `make` and
    /// publishes it.
    ///
    /// Spins for as long as the queue is full; if the consumer never pops,
    /// this never returns. `make` runs after space is found and before any
    /// shared state changes, so a panic inside it leaves the ring untouched.
    ///
    /// # Safety
    ///
    /// Caller must ensure only one thread acts as producer.
    #[inline]
    pub unsafe fn push_with<F: FnOnce() -> T>(&self, make: F) {
        let cursors = self.cursors();
        let head = cursors.head();
        let next = self.bump(head);

        while next == cursors.observe_tail() {
            cursors.relax();
        }

        // SAFETY: see try_push. `make()` is evaluated before the write.
        unsafe {
            self.storage.slot(head).write(make());
            cursors.publish_head(next);
        }
    }

    /// Waits for a free slot, then pushes `item`.
    ///
    /// # Safety
    ///
    /// Caller must ensure only one thread acts as producer.
    #[inline]
    pub unsafe fn push(&self, item: T) {
        // SAFETY: forwarded to the caller.
        unsafe { self.push_with(move || item) }
    }

    /// Returns the oldest element, or `None` if the queue is empty.
    ///
    /// # Safety
    ///
    /// Caller must ensure only one thread acts as consumer, and must not call
    /// `pop` or `take` while the returned reference is alive.
    #[inline]
    pub unsafe fn front(&self) -> Option<&T> {
        let tail = self.cursors().tail();
        if self.cursors().observe_head() == tail {
            return None;
        }
        // SAFETY: tail is inside [tail, head), so the slot holds an element
        // the producer finished writing before publishing head.
        Some(unsafe { &*self.storage.slot(tail) })
    }

    /// Drops the oldest element. Returns `false` if the queue was empty.
    ///
    /// # Safety
    ///
    /// Caller must ensure only one thread acts as consumer and that no
    /// reference returned by `front` is still alive.
    #[inline]
    pub unsafe fn pop(&self) -> bool {
        let cursors = self.cursors();
        let tail = cursors.tail();
        if cursors.observe_head() == tail {
            return false;
        }

        // Publishes tail even if T's destructor panics, so the slot is never
        // dropped twice.
        let _advance = Advance {
            cursors,
            tail: self.bump(tail),
        };
        // SAFETY: the slot holds a live element owned by the consumer.
        unsafe { std::ptr::drop_in_place(self.storage.slot(tail)) };
        true
    }

    /// Moves the oldest element out, or returns `None` if the queue is empty.
    ///
    /// # Safety
    ///
    /// Same as [`pop`](Self::pop).
    #[inline]
    pub unsafe fn take(&self) -> Option<T> {
        let cursors = self.cursors();
        let tail = cursors.tail();
        if cursors.observe_head() == tail {
            return None;
        }
        // SAFETY: the slot holds a live element; it is logically moved out
        // before tail hands the slot back to the producer.
        let item = unsafe { self.storage.slot(tail).read() };
        // SAFETY: the slot at tail no longer holds a live element.
        unsafe { cursors.publish_tail(self.bump(tail)) };
        Some(item)
    }

    /// Spin-wait hint of the ring's cursor strategy.
    #[inline(always)]
    pub(crate) fn relax(&self) {
        self.cursors().relax();
    }

    /// Storage placement backing this ring, for layout inspection.
    ///
    /// The cursors stay out of reach, so the queue state cannot be changed
    /// through it:
    ///
    /// ```compile_fail
    /// use tandem::Separate;
    /// use tandem::spsc::ring::Ring;
    ///
    /// let ring = Ring::<u64, Separate<u64>>::with_capacity(3).unwrap();
    /// ring.storage().header().cursors().publish_head(2);
    /// ```
    ///
    /// Publishing a cursor is unsafe even on a standalone instance:
    ///
    /// ```compile_fail
    /// use tandem::{AtomicCursors, Cursors};
    ///
    /// let cursors = AtomicCursors::<tandem::cache::Line64>::new();
    /// cursors.publish_head(2);
    /// ```
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

/// Publishes the consumer's next tail when dropped.
struct Advance<'a, C: Cursors> {
    cursors: &'a C,
    tail: usize,
}

impl<C: Cursors> Drop for Advance<'_, C> {
    #[inline(always)]
    fn drop(&mut self) {
        // SAFETY: only built by `pop` after it checked the slot was live, and
        // dropped once that slot's element has been dropped.
        unsafe { self.cursors.publish_tail(self.tail) };
    }
}

impl<T, S: Storage<T>> Drop for Ring<T, S> {
    fn drop(&mut self) {
        // SAFETY: &mut self proves no producer or consumer is active, so this
        // thread may act as consumer.
        #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
        let drained = std::iter::from_fn(|| unsafe { self.pop() }.then_some(())).count();
        trace!(placement = S::NAME, drained, "ring dropped");
    }
}

impl<T, S: Storage<T>> fmt::Debug for Ring<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (head, tail) = self.cursors().snapshot();
        f.debug_struct("Ring")
            .field("placement", &S::NAME)
            .field("cursors", &<S::Cursors as Cursors>::NAME)
            .field("capacity", &self.capacity())
            .field("head", &head)
            .field("tail", &tail)
            .finish()
    }
}

// SAFETY: Ring is Send because it owns its elements (T: Send) and its
// storage, which is a uniquely owned allocation.
unsafe impl<T: Send, S: Storage<T>> Send for Ring<T, S> {}

// SAFETY: Ring is Sync because concurrent access through &Ring is limited to
// the unsafe role operations, whose contract admits one producer and one
// consumer; head/tail publication orders every slot handoff.
unsafe impl<T: Send, S: Storage<T>> Sync for Ring<T, S> {}
