//! Bounded single-producer single-consumer ring buffers.
//!
//! The queue is built from two independent choices:
//!
//! - a storage placement ([`Separate`], [`Inline`], [`Fixed`]) deciding where
//!   the control block and element slots live, and
//! - a cursor strategy ([`AtomicCursors`], [`FencedCursors`]) deciding how
//!   the head and tail indices are published and observed.
//!
//! [`sync::spsc::channel`] composes them into a `(Producer, Consumer)` pair.
//!
//! ```
//! use std::thread;
//! use tandem::sync::spsc::{self, FenceLayout};
//!
//! let (tx, mut rx) = spsc::channel::<u32, FenceLayout<u32, 1024>>(1023)?;
//!
//! let producer = thread::spawn(move || {
//!     for i in 0..10_000 {
//!         tx.push(i);
//!     }
//! });
//!
//! for expected in 0..10_000 {
//!     assert_eq!(*rx.wait_front(), expected);
//!     rx.pop();
//! }
//! producer.join().unwrap();
//! # Ok::<(), tandem::QueueError>(())
//! ```

pub mod barrier;
pub mod cache;
pub mod config;
pub mod error;
pub mod spsc;
pub mod sync;
mod trace;

pub use config::QueueConfig;
pub use error::QueueError;
pub use spsc::cursors::{AtomicCursors, Cursors, FencedCursors};
pub use spsc::storage::{Fixed, Inline, Separate, Storage};
pub use trace::init_tracing;
