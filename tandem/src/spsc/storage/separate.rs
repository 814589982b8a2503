//! Header and slots in two independent allocations.

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;

use super::{Header, RawBlock, Storage};
use crate::error::Result;
use crate::spsc::cursors::{AtomicCursors, Cursors};

/// Two-allocation placement: the header block and the slot array are
/// allocated separately and may land far apart in memory.
pub struct Separate<T, C: Cursors = AtomicCursors> {
    header: RawBlock,
    slots: RawBlock,
    capacity: usize,
    _marker: PhantomData<(T, C)>,
}

// SAFETY:
// - header is allocated with Layout::new::<Header<C>>() and initialised
//   before allocate returns, so header() always points at a live Header.
// - slots is an array layout of `capacity` elements of T, so every index
//   below capacity yields a distinct, aligned, in-bounds pointer.
// - Drop only destroys the header; slot contents are never touched.
unsafe impl<T, C: Cursors> Storage<T> for Separate<T, C> {
    type Cursors = C;

    const NAME: &'static str = "separate";

    fn allocate(capacity: usize) -> Result<Self> {
        let slots = RawBlock::allocate(Layout::array::<T>(capacity)?)?;
        // If this fails, `slots` is released on return.
        let header = RawBlock::allocate(Layout::new::<Header<C>>())?;

        // SAFETY: header is a fresh block sized and aligned for Header<C>.
        unsafe { header.as_ptr::<Header<C>>().write(Header::new(capacity)) };

        Ok(Self {
            header,
            slots,
            capacity,
            _marker: PhantomData,
        })
    }

    #[inline(always)]
    fn header(&self) -> &Header<C> {
        // SAFETY: initialised in allocate, destroyed only in drop.
        unsafe { &*self.header.as_ptr::<Header<C>>() }
    }

    #[inline(always)]
    fn slot(&self, index: usize) -> *mut T {
        debug_assert!(index < self.capacity);
        // SAFETY: index < capacity keeps the offset inside the slot array.
        unsafe { self.slots.as_ptr::<T>().add(index) }
    }

    fn footprint(&self) -> usize {
        self.header.layout().size() + self.slots.layout().size()
    }
}

impl<T, C: Cursors> Drop for Separate<T, C> {
    fn drop(&mut self) {
        // SAFETY: the header was written in allocate and is dropped exactly
        // once here; both blocks are freed afterwards by RawBlock.
        unsafe { std::ptr::drop_in_place(self.header.as_ptr::<Header<C>>()) };
    }
}

impl<T, C: Cursors + fmt::Debug> fmt::Debug for Separate<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Separate")
            .field("header", self.header())
            .field("slots", &self.slots.as_ptr::<T>())
            .finish()
    }
}
