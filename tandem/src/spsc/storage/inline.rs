//! Header and slots in a single allocation.
//!
//! # Memory Layout
//!
//! ```text
//! base ──► ┌────────────────────────────────────────┐
//!          │ capacity        (one line)             │
//!          ├────────────────────────────────────────┤
//!          │ head            (one line)             │
//!          ├────────────────────────────────────────┤
//!          │ tail            (one line)             │
//! base +   ├────────────────────────────────────────┤  aligned to L::SIZE
//! offset ► │ slot[0] slot[1] ... slot[capacity - 1] │
//!          └────────────────────────────────────────┘
//! ```
//!
//! The block is `size_of::<Header>() + capacity * size_of::<T>()` bytes when
//! `T` is no more aligned than a cache line.

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;

use super::{Header, RawBlock, Storage};
use crate::cache::CacheLine;
use crate::error::Result;
use crate::spsc::cursors::{AtomicCursors, Cursors};

/// Single-allocation placement with trailing slot storage.
pub struct Inline<T, C: Cursors = AtomicCursors> {
    block: RawBlock,
    offset: usize,
    capacity: usize,
    _marker: PhantomData<(T, C)>,
}

impl<T, C: Cursors> Inline<T, C> {
    /// Layout of the whole block and the byte offset of slot 0.
    fn layout(capacity: usize) -> Result<(Layout, usize)> {
        let header = Layout::new::<Header<C>>();
        let slots = Layout::array::<T>(capacity)?.align_to(<C::Line as CacheLine>::SIZE)?;
        Ok(header.extend(slots)?)
    }

    /// Start of the block, which is also the header address.
    pub fn base(&self) -> *const u8 {
        self.block.as_ptr::<u8>()
    }

    /// Byte distance from [`base`](Self::base) to slot 0.
    pub fn slots_offset(&self) -> usize {
        self.offset
    }
}

// SAFETY:
// - The header occupies offset 0 of a block laid out for Header<C> and is
//   written before allocate returns.
// - Slots start at `offset`, which `Layout::extend` aligns for T (and to a
//   cache line), and the block extends `capacity * size_of::<T>()` past it.
// - Drop only destroys the header.
unsafe impl<T, C: Cursors> Storage<T> for Inline<T, C> {
    type Cursors = C;

    const NAME: &'static str = "inline";

    fn allocate(capacity: usize) -> Result<Self> {
        let (layout, offset) = Self::layout(capacity)?;
        let block = RawBlock::allocate(layout)?;

        // SAFETY: offset 0 of the block is sized and aligned for Header<C>.
        unsafe { block.as_ptr::<Header<C>>().write(Header::new(capacity)) };

        Ok(Self {
            block,
            offset,
            capacity,
            _marker: PhantomData,
        })
    }

    #[inline(always)]
    fn header(&self) -> &Header<C> {
        // SAFETY: initialised in allocate, destroyed only in drop.
        unsafe { &*self.block.as_ptr::<Header<C>>() }
    }

    #[inline(always)]
    fn slot(&self, index: usize) -> *mut T {
        debug_assert!(index < self.capacity);
        // SAFETY: offset and index stay within the block computed by layout().
        unsafe { self.block.as_ptr::<u8>().add(self.offset).cast::<T>().add(index) }
    }

    fn footprint(&self) -> usize {
        self.block.layout().size()
    }
}

impl<T, C: Cursors> Drop for Inline<T, C> {
    fn drop(&mut self) {
        // SAFETY: the header was written in allocate and is dropped exactly
        // once here; the block is freed afterwards by RawBlock.
        unsafe { std::ptr::drop_in_place(self.block.as_ptr::<Header<C>>()) };
    }
}

impl<T, C: Cursors + fmt::Debug> fmt::Debug for Inline<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inline")
            .field("header", self.header())
            .field("base", &self.base())
            .field("slots_offset", &self.offset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Line128, Line32, Line64};
    use crate::spsc::cursors::FencedCursors;
    use std::mem::size_of;

    fn check_layout<C: Cursors>(capacity: usize) {
        let storage = Inline::<u64, C>::allocate(capacity).unwrap();
        let line = <C::Line as CacheLine>::SIZE;
        let header = size_of::<Header<C>>();

        assert_eq!(storage.footprint(), header + capacity * size_of::<u64>());
        assert_eq!(storage.slots_offset(), header);
        assert_eq!(storage.slot(0) as usize, storage.base() as usize + header);
        assert_eq!(storage.slot(0) as usize % line, 0);
        assert_eq!(storage.base() as usize % line, 0);
        assert_eq!(
            storage.slot(capacity - 1) as usize,
            storage.slot(0) as usize + (capacity - 1) * size_of::<u64>()
        );
    }

    #[test]
    fn test_layout_per_line_size() {
        check_layout::<AtomicCursors<Line32>>(1025);
        check_layout::<AtomicCursors<Line64>>(1025);
        check_layout::<AtomicCursors<Line128>>(1025);
        check_layout::<FencedCursors<Line64>>(4);
    }

    #[test]
    fn test_header_sits_at_base() {
        let storage = Inline::<u8>::allocate(4).unwrap();
        assert_eq!(
            storage.header() as *const Header<AtomicCursors> as usize,
            storage.base() as usize
        );
        assert_eq!(storage.header().capacity(), 4);
    }

    #[allow(dead_code)]
    #[repr(align(256))]
    struct Wide([u8; 256]);

    #[test]
    fn test_over_aligned_elements() {
        let storage = Inline::<Wide>::allocate(4).unwrap();
        assert_eq!(storage.slot(0) as usize % 256, 0);
        assert_eq!(storage.slots_offset(), 256);
    }
}
