//! Head/tail cursor strategies.
//!
//! A [`Cursors`] implementation owns the two ring indices and decides how
//! their publication and observation are ordered:
//!
//! - `head` is written only by the producer and read by the consumer.
//! - `tail` is written only by the consumer and read by the producer.
//!
//! Each cursor sits on its own cache line so the producer's stores to `head`
//! never invalidate the line the consumer polls for `tail`, and vice versa.
//!
//! The correctness property both strategies provide is the same edge:
//!
//! ```text
//! producer: write slot ──► publish head ┐
//!                                       │ happens-before
//! consumer:           observe head ◄────┘ ──► read slot
//! ```
//!
//! and the mirror image for `tail` when the consumer frees a slot.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::barrier::{Barrier, Portable};
use crate::cache::{CacheLine, CachePadded, Line64};

/// Ownership and ordering rules for the `head`/`tail` pair.
///
/// Methods are split by role. A producer only calls `head`, `observe_tail`
/// and `publish_head`; a consumer only calls `tail`, `observe_head` and
/// `publish_tail`.
///
/// # Safety
///
/// The ring indexes slots and drops elements based on these values alone.
/// Implementors must guarantee:
/// - `Default` yields `head == tail == 0`.
/// - `head` and `observe_head` return the value most recently passed to
///   `publish_head` (or 0), and likewise for `tail` and `publish_tail`. No
///   other value is ever returned.
/// - Every write made before `publish_head(h)` happens-before everything the
///   caller of an `observe_head` that returned `h` does afterwards, and the
///   same for `publish_tail`/`observe_tail`.
pub unsafe trait Cursors: Default + Send + Sync + 'static {
    /// Cache-line size used for padding (and for trailing slot alignment in
    /// the inline placement).
    type Line: CacheLine;

    /// Short name used in logs.
    const NAME: &'static str;

    /// Producer reading its own cursor.
    fn head(&self) -> usize;

    /// Consumer reading its own cursor.
    fn tail(&self) -> usize;

    /// Consumer reading the producer's cursor before touching the slots it covers.
    fn observe_head(&self) -> usize;

    /// Producer reading the consumer's cursor before reusing the slots it freed.
    fn observe_tail(&self) -> usize;

    /// Producer handing slots up to `head` (exclusive) to the consumer.
    ///
    /// # Safety
    ///
    /// Caller must be the only producer of the ring these cursors belong to,
    /// `head` must be below its capacity, and every slot between the old and
    /// the new head must hold an initialised element.
    unsafe fn publish_head(&self, head: usize);

    /// Consumer handing slots up to `tail` (exclusive) back to the producer.
    ///
    /// # Safety
    ///
    /// Caller must be the only consumer of the ring these cursors belong to,
    /// `tail` must be below its capacity, and every slot between the old and
    /// the new tail must no longer hold a live element.
    unsafe fn publish_tail(&self, tail: usize);

    /// Best-effort `(head, tail)` pair. Each value is individually fresh; the
    /// pair is not an atomic snapshot.
    fn snapshot(&self) -> (usize, usize) {
        (self.observe_head(), self.observe_tail())
    }

    /// Called once per iteration of a busy-wait loop.
    #[inline(always)]
    fn relax(&self) {
        std::hint::spin_loop();
    }
}

/// Cursors published with release stores and observed with acquire loads.
///
/// This is the weakest ordering that still makes an element written before
/// `publish_head` visible to a consumer that observed the new head.
#[repr(C)]
pub struct AtomicCursors<L: CacheLine = Line64> {
    head: CachePadded<AtomicUsize, L>,
    tail: CachePadded<AtomicUsize, L>,
}

impl<L: CacheLine> AtomicCursors<L> {
    pub const fn new() -> Self {
        Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }
}

impl<L: CacheLine> Default for AtomicCursors<L> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: both words start at 0, only change through the publish methods,
// and each publish is a release store paired with an acquire observe.
unsafe impl<L: CacheLine> Cursors for AtomicCursors<L> {
    type Line = L;

    const NAME: &'static str = "acquire-release";

    #[inline(always)]
    fn head(&self) -> usize {
        // Only the producer stores head, so its own read needs no ordering.
        self.head.load(Ordering::Relaxed)
    }

    #[inline(always)]
    fn tail(&self) -> usize {
        self.tail.load(Ordering::Relaxed)
    }

    #[inline(always)]
    fn observe_head(&self) -> usize {
        self.head.load(Ordering::Acquire)
    }

    #[inline(always)]
    fn observe_tail(&self) -> usize {
        self.tail.load(Ordering::Acquire)
    }

    #[inline(always)]
    unsafe fn publish_head(&self, head: usize) {
        self.head.store(head, Ordering::Release);
    }

    #[inline(always)]
    unsafe fn publish_tail(&self, tail: usize) {
        self.tail.store(tail, Ordering::Release);
    }
}

impl<L: CacheLine> fmt::Debug for AtomicCursors<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicCursors")
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .finish()
    }
}

/// Cursors stored as plain machine words, ordered by explicit fences.
///
/// Every access to `head` and `tail` is a relaxed atomic load or store: the
/// Rust spelling of a word-sized volatile field, which the compiler may not
/// cache or tear but which carries no ordering of its own. All ordering comes
/// from `B`:
///
/// ```text
/// observe_*  = load word; B::load_fence()
/// publish_*  = B::store_fence(); store word
/// relax      = B::compiler_fence(); spin hint
/// ```
///
/// With `B = Portable` this is exactly as strong as [`AtomicCursors`]. With
/// [`Hardware`](crate::barrier::Hardware) it depends on x86_64 semantics; see
/// [`barrier`](crate::barrier).
#[repr(C)]
pub struct FencedCursors<L: CacheLine = Line64, B: Barrier = Portable> {
    head: CachePadded<AtomicUsize, L>,
    tail: CachePadded<AtomicUsize, L>,
    _barrier: PhantomData<B>,
}

impl<L: CacheLine, B: Barrier> FencedCursors<L, B> {
    pub const fn new() -> Self {
        Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            _barrier: PhantomData,
        }
    }

    #[inline(always)]
    fn read(word: &AtomicUsize) -> usize {
        word.load(Ordering::Relaxed)
    }

    #[inline(always)]
    fn write(word: &AtomicUsize, value: usize) {
        word.store(value, Ordering::Relaxed);
    }
}

impl<L: CacheLine, B: Barrier> Default for FencedCursors<L, B> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: both words start at 0 and only change through the publish methods.
// The store fence before each publish and the load fence after each observe
// give the same edge as release/acquire (see `barrier` for `Hardware`).
unsafe impl<L: CacheLine, B: Barrier> Cursors for FencedCursors<L, B> {
    type Line = L;

    const NAME: &'static str = "fenced";

    #[inline(always)]
    fn head(&self) -> usize {
        Self::read(&self.head)
    }

    #[inline(always)]
    fn tail(&self) -> usize {
        Self::read(&self.tail)
    }

    #[inline(always)]
    fn observe_head(&self) -> usize {
        let head = Self::read(&self.head);
        B::load_fence();
        head
    }

    #[inline(always)]
    fn observe_tail(&self) -> usize {
        let tail = Self::read(&self.tail);
        B::load_fence();
        tail
    }

    #[inline(always)]
    unsafe fn publish_head(&self, head: usize) {
        B::store_fence();
        Self::write(&self.head, head);
    }

    #[inline(always)]
    unsafe fn publish_tail(&self, tail: usize) {
        B::store_fence();
        Self::write(&self.tail, tail);
    }

    fn snapshot(&self) -> (usize, usize) {
        let head = Self::read(&self.head);
        let tail = Self::read(&self.tail);
        B::load_fence();
        (head, tail)
    }

    #[inline(always)]
    fn relax(&self) {
        B::compiler_fence();
        std::hint::spin_loop();
    }
}

impl<L: CacheLine, B: Barrier> fmt::Debug for FencedCursors<L, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FencedCursors")
            .field("barrier", &B::NAME)
            .field("head", &Self::read(&self.head))
            .field("tail", &Self::read(&self.tail))
            .finish()
    }
}
