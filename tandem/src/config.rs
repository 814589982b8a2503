//! Construction-time queue settings.
//!
//! Everything else that shapes a queue (element type, placement, cursor
//! strategy, cache-line size) is a type parameter.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::spsc::ring::slots_for;

/// Usable capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Settings consumed by [`channel_with`](crate::sync::spsc::channel_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Number of elements the queue must hold without the producer spinning.
    pub capacity: usize,
}

impl QueueConfig {
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Internal slot count this configuration produces.
    ///
    /// # Errors
    ///
    /// Returns an error if the capacity overflows once the reserved slot is added.
    pub fn slots(&self) -> Result<usize> {
        slots_for(self.capacity)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
