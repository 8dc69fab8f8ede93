//! Kernel Parameters
//!
//! Compile-time limits plus the small amount of runtime policy the
//! syscall layer needs.
//!
//! # Memory Layout (Sv39)
//! ```text
//! MAXVA      ┌──────────────┐
//!            │  trampoline  │
//! TRAPFRAME  ├──────────────┤
//!            │  trapframe   │
//!            ├──────────────┤  <- heap may never reach this page
//!            │     heap     │
//!            │      ...     │
//! 0          └──────────────┘
//! ```

/// Maximum number of kernel semaphores alive at once.
pub const NSEM: usize = 64;

/// Page size (4 KiB)
pub const PAGE_SIZE: u64 = 4096;

/// One beyond the highest user virtual address.
/// Sv39 leaves one bit unused to avoid sign extension.
pub const MAXVA: u64 = 1 << (9 + 9 + 9 + 12 - 1);

/// Trampoline page, mapped at the top of every address space.
pub const TRAMPOLINE: u64 = MAXVA - PAGE_SIZE;

/// Per-process trap frame, directly below the trampoline.
/// The heap must stay strictly below this address.
pub const TRAPFRAME: u64 = TRAMPOLINE - PAGE_SIZE;

/// Bits of a semaphore handle used for the slot index.
/// The remaining high bits carry the slot generation.
pub const HANDLE_INDEX_BITS: u32 = 8;

const _: () = assert!(NSEM <= 1 << HANDLE_INDEX_BITS);

/// How `sem_wait` reacts to the caller being killed while parked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Park until a permit is available, ignoring kills (POSIX behavior).
    Blocking,
    /// Re-check the kill flag on every wake and give up with `EINTR`.
    Interruptible,
}

/// Runtime policy for the semaphore syscalls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Wait behavior for `sem_wait`.
    pub wait_mode: WaitMode,
    /// Reject `sem_init` with a negative initial count.
    pub reject_negative_count: bool,
}

impl KernelConfig {
    /// Default policy: blocking waits, non-negative initial counts.
    pub const fn new() -> Self {
        Self {
            wait_mode: WaitMode::Blocking,
            reject_negative_count: true,
        }
    }

    /// Same policy with a different wait mode.
    pub const fn with_wait_mode(self, wait_mode: WaitMode) -> Self {
        Self { wait_mode, ..self }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}
