//! Synchronization Primitives
//!
//! The semaphore subsystem is built on two lower-level pieces:
//! - `spin::Mutex` for short critical sections (registry, slot and tick locks)
//! - [`BlockingChannel`] for parking a thread until another thread signals
//!   the same [`Channel`]
//!
//! # Lock Ordering
//! 1. **Registry lock** - slot allocation metadata
//! 2. **Slot lock** - one semaphore counter
//! 3. **Tick lock** - never held together with the others
//!
//! Only `sem_init`/`sem_destroy` nest 1 -> 2. Waiters park with exactly one
//! lock held, and `BlockingChannel::sleep` releases it while parked.

pub mod channel;

pub use channel::{BlockingChannel, Channel, SpinChannel};
