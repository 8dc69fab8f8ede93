//! System Call Interface
//!
//! Provides the system call interface for user-mode applications.
//!
//! # Security Model
//! - Whitelist approach: only explicitly implemented syscalls are allowed
//! - All parameters are validated before use
//! - Invalid inputs return errors, never panic
//! - User memory is only touched through [`UserMemory`]
//!
//! # Current Syscalls
//! - process: fork, exit, wait, kill, getpid, getprocs
//! - clock: sleep, uptime
//! - memory: sbrk, freepmem, memoryuser
//! - semaphores: sem_init, sem_destroy, sem_wait, sem_post

mod handler;
mod sem;
mod sysproc;
mod validate;

pub use handler::{numbers, Kernel, SyscallContext, SyscallError, SyscallResult};
pub use validate::{validate_user_range, Access, UserMemory, UserSpace};
