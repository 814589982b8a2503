//! Core SPSC (Single-Producer Single-Consumer) queue primitives.
//!
//! The queue is split along two independent axes:
//! - [`storage`] - where the control block and slots live
//! - [`cursors`] - how head/tail publication is ordered
//!
//! [`ring::Ring`] composes one of each into the queue algorithm. The safe,
//! role-enforcing handles live in [`crate::sync::spsc`].

pub mod cursors;
pub mod ring;
pub mod storage;
