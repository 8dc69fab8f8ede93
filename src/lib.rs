//! Semaphore System-Call Layer
//!
//! The system-call layer of a small RISC-V teaching kernel, centered on
//! kernel-managed counting semaphores shared between processes.
//!
//! # Architecture
//! - `sync`: the sleep/wakeup contract the semaphores are built on
//! - `sem`: semaphores and the fixed-capacity registry
//! - `syscall`: argument decoding, user memory access, dispatch
//! - `proc`, `mm`: the slices of process state the syscalls touch
//!
//! # Security Features
//! - Handles carry a generation, so stale handles are rejected
//! - Every user copy is bounds- and permission-checked
//! - Failed calls never leave partial state (no leaked slots)
//!
//! The crate is `no_std`; the embedding kernel provides the scheduler
//! behind [`sync::BlockingChannel`] and installs the `log` backend.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod mm;
pub mod param;
pub mod proc;
pub mod sem;
pub mod sync;
pub mod syscall;
pub mod trap;

pub use param::{KernelConfig, WaitMode, NSEM};
pub use proc::{Proc, ProcessServices};
pub use sem::{SemError, SemHandle, SemaphoreRegistry};
pub use sync::{BlockingChannel, Channel, SpinChannel};
pub use syscall::{Kernel, SyscallContext, SyscallError, UserMemory, UserSpace};
pub use trap::TrapFrame;
