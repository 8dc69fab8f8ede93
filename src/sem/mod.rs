//! Counting Semaphores
//!
//! Kernel-managed semaphores exposed to user processes as integer handles.
//!
//! # Components
//! - [`Semaphore`]: one counter, one lock, broadcast wakeups
//! - [`SemaphoreRegistry`]: fixed table of semaphores with a free list
//! - [`SemHandle`]: `(index, generation)` packed into 32 bits
//!
//! # Safety Properties
//! - The count never drops below zero through `wait`
//! - Handles are range- and generation-checked on every use
//! - A semaphore with parked waiters cannot be destroyed

pub mod handle;
pub mod registry;
pub mod semaphore;

pub use handle::SemHandle;
pub use registry::{RegistryGuard, SemaphoreRegistry};
pub use semaphore::{SemError, Semaphore};
