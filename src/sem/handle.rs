//! Semaphore Handles
//!
//! The only identifier user space ever sees. A handle packs the slot index
//! and the slot's generation into the 32-bit value copied to user memory:
//!
//! ```text
//!  31                          8 7         0
//! ┌─────────────────────────────┬───────────┐
//! │         generation          │   index   │
//! └─────────────────────────────┴───────────┘
//! ```

use crate::param::{HANDLE_INDEX_BITS, NSEM};

use super::semaphore::GENERATION_MASK;

const INDEX_MASK: u32 = (1 << HANDLE_INDEX_BITS) - 1;

/// A user-visible semaphore handle.
///
/// Decoding never fails; range and generation are checked when the handle
/// is used.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct SemHandle(u32);

impl SemHandle {
    /// Pack a slot index and generation.
    #[inline]
    pub const fn new(index: usize, generation: u32) -> Self {
        debug_assert!(index < NSEM);
        Self(((generation & GENERATION_MASK) << HANDLE_INDEX_BITS) | (index as u32 & INDEX_MASK))
    }

    /// Reinterpret a value read from user memory.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The value written to user memory.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Slot index. May be out of range for forged handles.
    #[inline]
    pub const fn index(self) -> usize {
        (self.0 & INDEX_MASK) as usize
    }

    /// Generation of the allocation this handle refers to.
    #[inline]
    pub const fn generation(self) -> u32 {
        self.0 >> HANDLE_INDEX_BITS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let handle = SemHandle::new(5, 9);
        assert_eq!(handle.index(), 5);
        assert_eq!(handle.generation(), 9);
        assert_eq!(handle.raw(), (9 << HANDLE_INDEX_BITS) | 5);
        assert_eq!(SemHandle::from_raw(handle.raw()), handle);
    }

    #[test]
    fn test_forged_index_out_of_range() {
        let handle = SemHandle::from_raw(NSEM as u32);
        assert_eq!(handle.index(), NSEM);
        assert_eq!(handle.generation(), 0);
    }
}
