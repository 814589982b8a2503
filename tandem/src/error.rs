//! Errors surfaced when a queue is created.
//!
//! Creation is the only fallible step: once a queue exists, `push` spins
//! instead of failing and `pop` on an empty queue is a no-op.

use std::alloc::LayoutError;

use thiserror::Error;

/// Result alias for queue construction.
pub type Result<T> = std::result::Result<T, QueueError>;

/// Reasons a queue could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The global allocator returned null.
    #[error("allocation of {size} bytes (align {align}) failed")]
    AllocFailed {
        /// Requested block size in bytes.
        size: usize,
        /// Requested block alignment in bytes.
        align: usize,
    },
    /// The header + slot layout does not fit in `isize::MAX` bytes.
    #[error("invalid storage layout: {0}")]
    Layout(#[from] LayoutError),
    /// `requested + 1` overflows `usize`.
    #[error("requested capacity {requested} is too large")]
    CapacityOverflow {
        /// Usable capacity asked for by the caller.
        requested: usize,
    },
    /// A fixed-size placement cannot hold the requested number of slots.
    #[error("{requested} slots requested but the fixed ring holds {fixed}")]
    ExceedsFixed {
        /// Internal slot count derived from the request.
        requested: usize,
        /// Compile-time slot count of the placement.
        fixed: usize,
    },
}
