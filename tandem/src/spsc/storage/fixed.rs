//! Header and a compile-time sized slot array in a single allocation.
//!
//! This is the placement with no runtime address arithmetic: the block is one
//! `#[repr(C)]` struct, so the slot array's position is fixed by the type.

use std::alloc::Layout;
use std::fmt;
use std::mem::MaybeUninit;
use std::ptr::addr_of_mut;

use super::{Header, RawBlock, Storage};
use crate::error::{QueueError, Result};
use crate::spsc::cursors::{AtomicCursors, Cursors};

#[repr(C)]
struct FixedBlock<T, C: Cursors, const N: usize> {
    header: Header<C>,
    slots: [MaybeUninit<T>; N],
}

/// Single-allocation placement whose slot count `N` is fixed at compile time.
///
/// The ring always has exactly `N` slots (`N - 1` usable). Asking for more
/// usable slots than that fails at creation.
pub struct Fixed<T, const N: usize, C: Cursors = AtomicCursors> {
    block: RawBlock,
    _marker: std::marker::PhantomData<FixedBlock<T, C, N>>,
}

struct SlotCountCheck<const N: usize>;

impl<const N: usize> SlotCountCheck<N> {
    /// Compile-time assertion that the ring has at least the minimum slot count.
    const OK: () = assert!(
        N >= crate::spsc::ring::MIN_CAPACITY,
        "Fixed ring needs at least 4 slots"
    );
}

impl<T, const N: usize, C: Cursors> Fixed<T, N, C> {
    #[inline(always)]
    fn block(&self) -> *mut FixedBlock<T, C, N> {
        self.block.as_ptr()
    }
}

// SAFETY:
// - The block is allocated with Layout::new::<FixedBlock>() and its header
//   is written before allocate returns.
// - `slots` is an N-element array of MaybeUninit<T>, which has T's layout, so
//   every index below N is a distinct aligned slot.
// - Drop only destroys the header.
unsafe impl<T, const N: usize, C: Cursors> Storage<T> for Fixed<T, N, C> {
    type Cursors = C;

    const NAME: &'static str = "fixed";

    fn allocate(capacity: usize) -> Result<Self> {
        let () = SlotCountCheck::<N>::OK;

        if capacity > N {
            return Err(QueueError::ExceedsFixed {
                requested: capacity,
                fixed: N,
            });
        }

        let block = RawBlock::allocate(Layout::new::<FixedBlock<T, C, N>>())?;
        let ptr = block.as_ptr::<FixedBlock<T, C, N>>();

        // SAFETY: ptr is a fresh block laid out for FixedBlock. Only the
        // header is initialised; the slots are MaybeUninit.
        unsafe { addr_of_mut!((*ptr).header).write(Header::new(N)) };

        Ok(Self {
            block,
            _marker: std::marker::PhantomData,
        })
    }

    #[inline(always)]
    fn header(&self) -> &Header<C> {
        // SAFETY: initialised in allocate, destroyed only in drop.
        unsafe { &*addr_of_mut!((*self.block()).header) }
    }

    #[inline(always)]
    fn slot(&self, index: usize) -> *mut T {
        debug_assert!(index < N);
        // SAFETY: index < N stays inside the slot array; no reference to the
        // array is created, so slots owned by the other role are not aliased.
        unsafe { addr_of_mut!((*self.block()).slots).cast::<T>().add(index) }
    }

    fn footprint(&self) -> usize {
        self.block.layout().size()
    }
}

impl<T, const N: usize, C: Cursors> Drop for Fixed<T, N, C> {
    fn drop(&mut self) {
        // SAFETY: the header was written in allocate and is dropped exactly
        // once here; the block is freed afterwards by RawBlock.
        unsafe { std::ptr::drop_in_place(addr_of_mut!((*self.block()).header)) };
    }
}

impl<T, const N: usize, C: Cursors + fmt::Debug> fmt::Debug for Fixed<T, N, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fixed")
            .field("slots", &N)
            .field("header", self.header())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrier::Hardware;
    use crate::cache::Line64;
    use crate::spsc::cursors::FencedCursors;
    use std::mem::{offset_of, size_of};

    type Block = FixedBlock<u64, FencedCursors<Line64, Hardware>, 16>;

    #[test]
    fn test_slots_start_on_their_own_line() {
        assert_eq!(offset_of!(Block, slots), 3 * 64);
        assert_eq!(size_of::<Block>(), 3 * 64 + 16 * 8);
    }

    #[test]
    fn test_capacity_is_fixed() {
        let storage = Fixed::<u64, 16>::allocate(5).unwrap();
        assert_eq!(storage.header().capacity(), 16);
        assert_eq!(storage.slot(15) as usize - storage.slot(0) as usize, 15 * 8);
    }

    #[test]
    fn test_request_beyond_fixed_slots() {
        let err = Fixed::<u64, 16>::allocate(17).unwrap_err();
        assert_eq!(
            err,
            QueueError::ExceedsFixed {
                requested: 17,
                fixed: 16
            }
        );
    }

    #[test]
    fn test_footprint_is_one_block() {
        let storage = Fixed::<u64, 16, FencedCursors<Line64, Hardware>>::allocate(16).unwrap();
        assert_eq!(storage.footprint(), size_of::<Block>());
    }
}
