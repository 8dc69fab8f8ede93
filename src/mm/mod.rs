//! Memory management for the syscall layer
//!
//! Provides:
//! - User address newtype
//! - Lazy process-size accounting for `sbrk`
//!
//! Page tables and the physical allocator live elsewhere in the kernel.

pub mod heap;
pub mod user_addr;

pub use heap::{HeapError, ProcSize};
pub use user_addr::UserAddr;
