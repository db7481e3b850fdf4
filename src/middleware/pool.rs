//! Free list of built middleware chains.
//!
//! # Responsibilities
//! - Hand out a previously built chain instead of rebuilding one
//! - Refuse chains built for another generation
//! - Stay bounded so a burst of concurrent requests does not pin memory

use std::sync::{Mutex, PoisonError};

use crate::middleware::stack::StackInstance;

/// Maximum number of idle chains kept per generation.
pub const POOL_CAPACITY: usize = 32;

/// Idle chains of one generation.
#[derive(Debug)]
pub struct StackPool {
    generation: u64,
    free: Mutex<Vec<StackInstance>>,
}

impl StackPool {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            free: Mutex::new(Vec::new()),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Take an idle chain, if any.
    pub fn take(&self) -> Option<StackInstance> {
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
    }

    /// Return a chain. Chains from another generation, or beyond capacity,
    /// are dropped; the return value says whether it was kept.
    pub fn put(&self, instance: StackInstance) -> bool {
        if instance.generation() != self.generation {
            return false;
        }
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() >= POOL_CAPACITY {
            return false;
        }
        free.push(instance);
        true
    }

    /// Number of idle chains.
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
