//! Process Size Accounting
//!
//! `sbrk` grows the process lazily: only the size counter moves here, and
//! pages are faulted in on first touch elsewhere.
//!
//! # Invariants
//! - The size never wraps around
//! - The size stays strictly below `TRAPFRAME`
//! - A rejected request leaves the size untouched

use core::fmt;

use crate::param::TRAPFRAME;

/// Error type for size adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// Growth wrapped the address space.
    Overflow,
    /// Shrinking below zero.
    Underflow,
    /// The new size would reach the trap frame.
    Boundary,
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => write!(f, "size overflow"),
            Self::Underflow => write!(f, "size underflow"),
            Self::Boundary => write!(f, "size reaches trapframe"),
        }
    }
}

/// Size of a process's user memory in bytes (`p->sz`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcSize(u64);

impl ProcSize {
    /// Create a size counter.
    #[inline]
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Current size in bytes.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Adjust the size by `delta` bytes.
    ///
    /// Returns the previous size (the old break) on success.
    pub fn grow(&mut self, delta: i64) -> Result<u64, HeapError> {
        let old = self.0;
        let new = if delta >= 0 {
            old.checked_add(delta as u64).ok_or(HeapError::Overflow)?
        } else {
            old.checked_sub(delta.unsigned_abs())
                .ok_or(HeapError::Underflow)?
        };

        if new >= TRAPFRAME {
            return Err(HeapError::Boundary);
        }

        self.0 = new;
        Ok(old)
    }
}
