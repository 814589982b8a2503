//! Synchronization primitives for in-process communication.
//!
//! This module provides the safe, role-enforcing queue handles used to pass
//! elements between exactly two threads.

pub mod spsc;
