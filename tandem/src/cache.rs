//! Cache-line sizing.
//!
//! `#[repr(align(N))]` only accepts a literal, so the line size is chosen
//! with a marker type instead of a const generic. [`CachePadded`] borrows the
//! marker's alignment through a zero-length array, which pads the wrapped
//! value out to a whole number of lines without costing any bytes of its own.

use std::fmt;
use std::ops::Deref;

/// A cache-line size, selected at compile time.
pub trait CacheLine: Sized + Send + Sync + 'static {
    /// Line size in bytes. Always a power of two equal to `align_of::<Self>()`.
    const SIZE: usize;
}

/// 32-byte lines.
#[derive(Debug, Clone, Copy, Default)]
#[repr(align(32))]
pub struct Line32;

/// 64-byte lines, the common case on x86_64 and most aarch64 parts.
#[derive(Debug, Clone, Copy, Default)]
#[repr(align(64))]
pub struct Line64;

/// 128-byte lines (Apple silicon, adjacent-line prefetch on Intel).
#[derive(Debug, Clone, Copy, Default)]
#[repr(align(128))]
pub struct Line128;

impl CacheLine for Line32 {
    const SIZE: usize = 32;
}

impl CacheLine for Line64 {
    const SIZE: usize = 64;
}

impl CacheLine for Line128 {
    const SIZE: usize = 128;
}

/// Aligns and pads `V` to occupy whole cache lines of size `L::SIZE`.
///
/// Two `CachePadded` fields placed next to each other in a `#[repr(C)]`
/// struct never share a line, so writes to one do not invalidate the other.
#[repr(C)]
pub struct CachePadded<V, L: CacheLine> {
    _align: [L; 0],
    value: V,
}

impl<V, L: CacheLine> CachePadded<V, L> {
    /// Wraps `value`.
    pub const fn new(value: V) -> Self {
        Self { _align: [], value }
    }
}

impl<V, L: CacheLine> Deref for CachePadded<V, L> {
    type Target = V;

    #[inline(always)]
    fn deref(&self) -> &V {
        &self.value
    }
}

impl<V: Default, L: CacheLine> Default for CachePadded<V, L> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<V: fmt::Debug, L: CacheLine> fmt::Debug for CachePadded<V, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachePadded")
            .field("line", &L::SIZE)
            .field("value", &self.value)
            .finish()
    }
}
