//! Slot storage placements.
//!
//! A [`Storage`] owns the ring's control block ([`Header`]) and its `capacity`
//! element slots. Placements differ only in where those bytes live:
//!
//! - [`Separate`] - header and slots are two independent heap blocks.
//! - [`Inline`] - one block; slots trail the header on a cache-line boundary.
//! - [`Fixed`] - one block holding a compile-time sized slot array.
//!
//! Storage never constructs or drops elements. The ring decides which slots
//! are live and drains them before the storage is dropped.
//!
//! # Safety
//!
//! Every raw allocation goes through [`RawBlock`], which frees itself on drop.
//! A placement that fails halfway through `allocate` releases whatever it had
//! already acquired simply by returning.

mod fixed;
mod inline;
mod separate;

pub use fixed::Fixed;
pub use inline::Inline;
pub use separate::Separate;

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;

use crate::cache::CachePadded;
use crate::error::{QueueError, Result};
use crate::spsc::cursors::Cursors;
use crate::trace::warn;

/// Control block shared by both roles.
///
/// `capacity` is read-only after construction but gets its own line anyway:
/// both roles read it on every operation and it must not share a line with a
/// cursor the other role writes.
#[repr(C)]
pub struct Header<C: Cursors> {
    capacity: CachePadded<usize, C::Line>,
    cursors: C,
}

impl<C: Cursors> Header<C> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: CachePadded::new(capacity),
            cursors: C::default(),
        }
    }

    /// Number of slots, including the one that is always kept empty.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        *self.capacity
    }

    #[inline(always)]
    pub(crate) fn cursors(&self) -> &C {
        &self.cursors
    }
}

impl<C: Cursors + fmt::Debug> fmt::Debug for Header<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("capacity", &self.capacity())
            .field("cursors", &self.cursors)
            .finish()
    }
}

/// Backing memory for a ring of `T`.
///
/// # Safety
///
/// Implementors must guarantee, for the lifetime of `self`:
/// - `header()` returns a header whose capacity never changes.
/// - For every `index < header().capacity()`, `slot(index)` returns a
///   distinct pointer that is non-null, aligned for `T`, and valid for reads
///   and writes of one `T`.
/// - Dropping the storage never reads or drops a `T`.
/// - The storage may be moved to and shared with another thread whenever
///   `T: Send`; the ring relies on this for its own `Send`/`Sync`.
pub unsafe trait Storage<T>: Sized {
    /// Cursor strategy embedded in the header.
    type Cursors: Cursors;

    /// Short name used in logs.
    const NAME: &'static str;

    /// Allocates a header and `capacity` uninitialised slots.
    ///
    /// `capacity` already includes the reserved empty slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout is invalid, the allocator fails, or a
    /// fixed placement is too small.
    fn allocate(capacity: usize) -> Result<Self>;

    fn header(&self) -> &Header<Self::Cursors>;

    /// Address of slot `index`. `index` must be below the header capacity.
    fn slot(&self, index: usize) -> *mut T;

    /// Total bytes requested from the allocator.
    fn footprint(&self) -> usize;
}

/// An owned, untyped heap block that is released on drop.
///
/// Zero-sized layouts never reach the allocator; they are represented by a
/// dangling pointer carrying the layout's alignment.
pub(crate) struct RawBlock {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl RawBlock {
    pub(crate) fn allocate(layout: Layout) -> Result<Self> {
        if layout.size() == 0 {
            // SAFETY: alignments are never zero.
            let ptr = unsafe { NonNull::new_unchecked(std::ptr::without_provenance_mut(layout.align())) };
            return Ok(Self { ptr, layout });
        }

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        match NonNull::new(raw) {
            Some(ptr) => Ok(Self { ptr, layout }),
            None => {
                warn!(size = layout.size(), align = layout.align(), "allocation failed");
                Err(QueueError::AllocFailed {
                    size: layout.size(),
                    align: layout.align(),
                })
            }
        }
    }

    #[inline(always)]
    pub(crate) fn as_ptr<U>(&self) -> *mut U {
        self.ptr.as_ptr().cast()
    }

    pub(crate) fn layout(&self) -> Layout {
        self.layout
    }
}

impl Drop for RawBlock {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // SAFETY: ptr was returned by `alloc` with this exact layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
        }
    }
}

// SAFETY: RawBlock is an owning pointer to plain bytes.
unsafe impl Send for RawBlock {}
unsafe impl Sync for RawBlock {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Line128, Line64};
    use crate::spsc::cursors::{AtomicCursors, FencedCursors};
    use std::mem::{align_of, offset_of, size_of};

    #[test]
    fn test_header_layout() {
        type H = Header<AtomicCursors<Line64>>;
        assert_eq!(align_of::<H>(), 64);
        assert_eq!(offset_of!(H, cursors), 64);
        assert_eq!(size_of::<H>(), 3 * 64);

        type H128 = Header<FencedCursors<Line128>>;
        assert_eq!(size_of::<H128>(), 3 * 128);
    }

    #[test]
    fn test_header_starts_empty() {
        let header = Header::<AtomicCursors>::new(8);
        assert_eq!(header.capacity(), 8);
        assert_eq!(header.cursors().snapshot(), (0, 0));
    }

    #[test]
    fn test_raw_block_alignment() {
        let layout = Layout::from_size_align(256, 128).unwrap();
        let block = RawBlock::allocate(layout).unwrap();
        assert_eq!(block.as_ptr::<u8>() as usize % 128, 0);
        assert_eq!(block.layout(), layout);
    }

    #[test]
    fn test_raw_block_zero_sized() {
        let layout = Layout::from_size_align(0, 64).unwrap();
        let block = RawBlock::allocate(layout).unwrap();
        assert_eq!(block.as_ptr::<u8>() as usize, 64);
    }
}
