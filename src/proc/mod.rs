//! Process View for System Calls
//!
//! The syscall layer needs only a thin slice of the calling process: its
//! pid, its kill flag, and its size counter. Everything else about process
//! lifecycle is provided by the kernel through [`ProcessServices`].

pub mod clock;

use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use crate::mm::{ProcSize, UserAddr};
use crate::syscall::{SyscallError, UserMemory};

pub use clock::{Killed, TickClock};

/// Per-process state read by syscalls.
#[derive(Debug)]
pub struct Proc {
    pid: i32,
    killed: AtomicBool,
    size: Mutex<ProcSize>,
}

impl Proc {
    /// Create a process record with `size` bytes of user memory.
    pub const fn new(pid: i32, size: u64) -> Self {
        Self {
            pid,
            killed: AtomicBool::new(false),
            size: Mutex::new(ProcSize::new(size)),
        }
    }

    /// Process id.
    #[inline]
    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// Whether the process has been asked to die.
    #[inline]
    pub fn killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    /// Mark the process killed. Sleepers notice on their next wake.
    #[inline]
    pub fn set_killed(&self) {
        self.killed.store(true, Ordering::Release);
    }

    /// Current size in bytes.
    pub fn size(&self) -> u64 {
        self.size.lock().get()
    }

    /// Lock the size counter for adjustment.
    pub fn size_mut(&self) -> spin::MutexGuard<'_, ProcSize> {
        self.size.lock()
    }
}

/// Process lifecycle services the syscall layer delegates to.
pub trait ProcessServices {
    /// Terminate `proc` with `status`. Does not return in a real kernel.
    fn exit(&self, proc: &Proc, status: i32);

    /// Duplicate `proc`. Returns the child's pid.
    fn fork(&self, proc: &Proc) -> Result<i32, SyscallError>;

    /// Wait for a child to exit, storing its status at `status` unless null.
    /// Returns the child's pid.
    fn wait(
        &self,
        proc: &Proc,
        status: UserAddr,
        memory: &mut dyn UserMemory,
    ) -> Result<i32, SyscallError>;

    /// Set the kill flag of process `pid`.
    fn kill(&self, pid: i32) -> Result<(), SyscallError>;

    /// Fill the caller's process table buffer at `addr`.
    /// Returns the number of active processes.
    fn procinfo(&self, addr: UserAddr, memory: &mut dyn UserMemory) -> Result<i32, SyscallError>;

    /// Number of free physical pages.
    fn free_pages(&self) -> u64;
}
