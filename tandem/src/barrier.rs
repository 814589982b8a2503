//! Memory-barrier primitives.
//!
//! Only [`FencedCursors`](crate::spsc::cursors::FencedCursors) calls these;
//! the fencing protocol lives there once, never inline at queue call sites.
//!
//! Two backends implement [`Barrier`]:
//!
//! - [`Portable`] - built from [`std::sync::atomic::fence`]. This is the
//!   default and is correct under the Rust memory model on every target.
//! - [`Hardware`] - issues `lfence`/`sfence`/`mfence` directly on x86_64 and
//!   falls back to the portable fences on every other architecture. It exists
//!   to compare the instruction-level protocol with the atomic one and is not
//!   a portability guarantee: the Rust memory model only recognises
//!   happens-before edges created by atomic fences, so this backend relies on
//!   x86's total store order for its correctness.
//!
//! ```text
//! Barrier          Portable                Hardware (x86_64)
//! load_fence()     fence(Acquire)          lfence
//! store_fence()    fence(Release)          sfence
//! full_fence()     fence(SeqCst)           mfence
//! compiler_fence() compiler_fence(SeqCst)  compiler_fence(SeqCst)
//! ```

use std::sync::atomic::{self, Ordering};

/// A set of memory-fence operations.
///
/// Every method is infallible and has no return value. Implementations are
/// zero-sized markers; the trait exists so the fence-based cursor strategy
/// can be instantiated over either backend.
pub trait Barrier: Send + Sync + 'static {
    /// Short name used in logs and test output.
    const NAME: &'static str;

    /// Orders every load before the fence ahead of every load and store after it.
    ///
    /// Issued after reading the opposite role's cursor and before trusting it.
    fn load_fence();

    /// Orders every load and store before the fence ahead of every store after it.
    ///
    /// Issued after constructing or dropping an element and before publishing
    /// the cursor that hands the slot to the other role.
    fn store_fence();

    /// Orders all memory operations on both sides of the fence.
    fn full_fence();

    /// Prevents compiler reordering only; emits no instruction.
    fn compiler_fence();
}

/// Barrier backend built from the standard library's atomic fences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Portable;

impl Barrier for Portable {
    const NAME: &'static str = "portable";

    #[inline(always)]
    fn load_fence() {
        atomic::fence(Ordering::Acquire);
    }

    #[inline(always)]
    fn store_fence() {
        atomic::fence(Ordering::Release);
    }

    #[inline(always)]
    fn full_fence() {
        atomic::fence(Ordering::SeqCst);
    }

    #[inline(always)]
    fn compiler_fence() {
        atomic::compiler_fence(Ordering::SeqCst);
    }
}

/// Barrier backend issuing x86 fence instructions.
///
/// On targets other than x86_64 every method delegates to [`Portable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hardware;

#[cfg(target_arch = "x86_64")]
impl Barrier for Hardware {
    const NAME: &'static str = "x86_64";

    #[inline(always)]
    fn load_fence() {
        // SAFETY: `lfence` is part of the SSE2 baseline every x86_64 CPU
        // implements. It takes no operands, touches no registers or flags,
        // and the absence of `nomem` makes the block a compiler barrier.
        unsafe { std::arch::asm!("lfence", options(nostack, preserves_flags)) };
    }

    #[inline(always)]
    fn store_fence() {
        // SAFETY: as for `load_fence`; `sfence` is SSE baseline.
        unsafe { std::arch::asm!("sfence", options(nostack, preserves_flags)) };
    }

    #[inline(always)]
    fn full_fence() {
        // SAFETY: as for `load_fence`; `mfence` is SSE2 baseline.
        unsafe { std::arch::asm!("mfence", options(nostack, preserves_flags)) };
    }

    #[inline(always)]
    fn compiler_fence() {
        atomic::compiler_fence(Ordering::SeqCst);
    }
}

#[cfg(not(target_arch = "x86_64"))]
impl Barrier for Hardware {
    const NAME: &'static str = "portable-fallback";

    #[inline(always)]
    fn load_fence() {
        Portable::load_fence();
    }

    #[inline(always)]
    fn store_fence() {
        Portable::store_fence();
    }

    #[inline(always)]
    fn full_fence() {
        Portable::full_fence();
    }

    #[inline(always)]
    fn compiler_fence() {
        Portable::compiler_fence();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU64};

    fn exercise<B: Barrier>() {
        B::load_fence();
        B::store_fence();
        B::full_fence();
        B::compiler_fence();
    }

    #[test]
    fn test_all_fences_are_callable() {
        exercise::<Portable>();
        exercise::<Hardware>();
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(Portable::NAME, "portable");
        assert!(!Hardware::NAME.is_empty());
    }

    /// Message passing through a relaxed flag bracketed by fences.
    fn message_passing<B: Barrier>() {
        for _ in 0..1_000 {
            let data = Arc::new(AtomicU64::new(0));
            let ready = Arc::new(AtomicBool::new(false));

            let writer = {
                let data = Arc::clone(&data);
                let ready = Arc::clone(&ready);
                std::thread::spawn(move || {
                    data.store(0xDEAD_BEEF, Ordering::Relaxed);
                    B::store_fence();
                    ready.store(true, Ordering::Relaxed);
                })
            };

            while !ready.load(Ordering::Relaxed) {
                B::compiler_fence();
                std::hint::spin_loop();
            }
            B::load_fence();
            assert_eq!(data.load(Ordering::Relaxed), 0xDEAD_BEEF);

            writer.join().unwrap();
        }
    }

    #[test]
    fn test_portable_message_passing() {
        message_passing::<Portable>();
    }

    #[test]
    fn test_hardware_message_passing() {
        message_passing::<Hardware>();
    }
}
