//! Tuning for the in-memory engine.

use crate::error::{HashError, Result};
use serde::{Deserialize, Serialize};

/// Load factor out of 1000 used when none is configured (0.75).
pub const DEFAULT_LOAD_FACTOR: u32 = 750;

/// Bucket count allocated on first use. Must be a power of two.
pub const INITIAL_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Occupied-bucket ratio, out of 1000, at which the bucket array doubles.
    pub load_factor: u32,
    pub initial_capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            load_factor: DEFAULT_LOAD_FACTOR,
            initial_capacity: INITIAL_CAPACITY,
        }
    }
}

impl MemoryConfig {
    pub fn with_load_factor(mut self, load_factor: u32) -> Self {
        self.load_factor = load_factor;
        self
    }

    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.load_factor == 0 || self.load_factor >= 1000 {
            return Err(HashError::InvalidConfig {
                reason: format!(
                    "load_factor must be in 1..1000, got {}",
                    self.load_factor
                ),
            });
        }
        if !self.initial_capacity.is_power_of_two() {
            return Err(HashError::InvalidConfig {
                reason: format!(
                    "initial_capacity must be a power of two, got {}",
                    self.initial_capacity
                ),
            });
        }
        Ok(())
    }
}
