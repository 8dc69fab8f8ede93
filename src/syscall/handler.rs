//! System Call Handler
//!
//! Decodes the syscall number and dispatches to the individual handlers.
//!
//! # Security Considerations
//! - All syscall numbers are validated against the whitelist
//! - Unknown syscalls return ENOSYS
//! - Parameters are validated before use
//! - A failing call never leaves partial kernel state behind

use core::fmt;

use log::{debug, warn};

use crate::mm::HeapError;
use crate::param::KernelConfig;
use crate::proc::{Killed, Proc, ProcessServices, TickClock};
use crate::sem::{SemError, SemaphoreRegistry};
use crate::sync::BlockingChannel;
use crate::trap::TrapFrame;

use super::validate::UserMemory;

/// System call numbers
pub mod numbers {
    pub const SYS_FORK: usize = 1;
    pub const SYS_EXIT: usize = 2;
    pub const SYS_WAIT: usize = 3;
    pub const SYS_KILL: usize = 6;
    pub const SYS_GETPID: usize = 11;
    pub const SYS_SBRK: usize = 12;
    pub const SYS_SLEEP: usize = 13;
    pub const SYS_UPTIME: usize = 14;
    pub const SYS_GETPROCS: usize = 22;
    pub const SYS_FREEPMEM: usize = 23;
    pub const SYS_MEMORYUSER: usize = 24;
    pub const SYS_SEM_INIT: usize = 25;
    pub const SYS_SEM_DESTROY: usize = 26;
    pub const SYS_SEM_WAIT: usize = 27;
    pub const SYS_SEM_POST: usize = 28;
}

/// System call error codes
#[repr(i64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// Invalid system call number
    Enosys = -38,
    /// No such process
    Esrch = -3,
    /// Interrupted by a kill
    Eintr = -4,
    /// Out of memory or address space
    Enomem = -12,
    /// Bad address (invalid pointer)
    Efault = -14,
    /// Resource busy
    Ebusy = -16,
    /// Invalid argument
    Einval = -22,
    /// No space left (semaphore table full)
    Enospc = -28,
}

impl SyscallError {
    /// Value placed in a0.
    #[inline]
    pub const fn as_i64(self) -> i64 {
        self as i64
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Enosys => "ENOSYS",
            Self::Esrch => "ESRCH",
            Self::Eintr => "EINTR",
            Self::Enomem => "ENOMEM",
            Self::Efault => "EFAULT",
            Self::Ebusy => "EBUSY",
            Self::Einval => "EINVAL",
            Self::Enospc => "ENOSPC",
        };
        write!(f, "{} ({})", name, self.as_i64())
    }
}

impl From<SemError> for SyscallError {
    fn from(err: SemError) -> Self {
        match err {
            SemError::Exhausted => Self::Enospc,
            SemError::InvalidHandle
            | SemError::StaleHandle
            | SemError::NotAllocated
            | SemError::NegativeCount
            | SemError::Overflow => Self::Einval,
            SemError::Busy => Self::Ebusy,
            SemError::Interrupted => Self::Eintr,
        }
    }
}

impl From<HeapError> for SyscallError {
    fn from(_: HeapError) -> Self {
        Self::Enomem
    }
}

impl From<Killed> for SyscallError {
    fn from(_: Killed) -> Self {
        Self::Eintr
    }
}

/// Result of an individual handler.
pub type SyscallResult = Result<i64, SyscallError>;

/// Everything a handler knows about its caller.
pub struct SyscallContext<'a, M: UserMemory> {
    /// The calling process.
    pub proc: &'a Proc,
    /// The caller's address space.
    pub memory: &'a mut M,
}

impl<'a, M: UserMemory> SyscallContext<'a, M> {
    /// Bundle a process and its address space.
    pub fn new(proc: &'a Proc, memory: &'a mut M) -> Self {
        Self { proc, memory }
    }
}

/// Kernel state shared by every syscall.
pub struct Kernel<S, C> {
    pub(super) config: KernelConfig,
    pub(super) semaphores: SemaphoreRegistry,
    pub(super) clock: TickClock,
    pub(super) channels: C,
    pub(super) services: S,
}

impl<S: ProcessServices, C: BlockingChannel> Kernel<S, C> {
    /// Create kernel state with an empty semaphore table at tick 0.
    pub const fn new(config: KernelConfig, services: S, channels: C) -> Self {
        Self {
            config,
            semaphores: SemaphoreRegistry::new(),
            clock: TickClock::new(),
            channels,
            services,
        }
    }

    /// Active policy.
    #[inline]
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// The semaphore table.
    #[inline]
    pub fn semaphores(&self) -> &SemaphoreRegistry {
        &self.semaphores
    }

    /// The tick clock.
    #[inline]
    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    /// The process services this kernel delegates to.
    #[inline]
    pub fn services(&self) -> &S {
        &self.services
    }

    /// The sleep/wakeup channels.
    #[inline]
    pub fn channels(&self) -> &C {
        &self.channels
    }

    /// Timer interrupt entry point.
    pub fn tick(&self) {
        self.clock.tick(&self.channels);
    }

    /// Handle the syscall in `frame` and store the result in a0.
    pub fn handle<M: UserMemory>(&self, frame: &mut TrapFrame, ctx: &mut SyscallContext<'_, M>) {
        let result = self.dispatch(frame.syscall_num(), frame, ctx);
        frame.set_return(result);
    }

    /// Dispatch a system call
    ///
    /// # Returns
    /// Result value to be placed in a0: non-negative on success, a negated
    /// errno on failure.
    ///
    /// # Security
    /// - Unknown syscall numbers are rejected with ENOSYS
    /// - Each handler validates its own arguments
    pub fn dispatch<M: UserMemory>(
        &self,
        syscall_num: usize,
        frame: &TrapFrame,
        ctx: &mut SyscallContext<'_, M>,
    ) -> i64 {
        use numbers::*;

        let result = match syscall_num {
            SYS_FORK => self.sys_fork(ctx),
            SYS_EXIT => self.sys_exit(frame, ctx),
            SYS_WAIT => self.sys_wait(frame, ctx),
            SYS_KILL => self.sys_kill(frame),
            SYS_GETPID => self.sys_getpid(ctx),
            SYS_SBRK => self.sys_sbrk(frame, ctx),
            SYS_SLEEP => self.sys_sleep(frame, ctx),
            SYS_UPTIME => self.sys_uptime(),
            SYS_GETPROCS => self.sys_getprocs(frame, ctx),
            SYS_FREEPMEM => self.sys_freepmem(),
            SYS_MEMORYUSER => self.sys_memoryuser(),
            SYS_SEM_INIT => self.sys_sem_init(frame, ctx),
            SYS_SEM_DESTROY => self.sys_sem_destroy(frame, ctx),
            SYS_SEM_WAIT => self.sys_sem_wait(frame, ctx),
            SYS_SEM_POST => self.sys_sem_post(frame, ctx),
            _ => {
                warn!("[SYSCALL] pid {}: unknown syscall {}", ctx.proc.pid(), syscall_num);
                Err(SyscallError::Enosys)
            }
        };

        match result {
            Ok(value) => value,
            Err(err) => {
                debug!(
                    "[SYSCALL] pid {}: syscall {} failed: {}",
                    ctx.proc.pid(),
                    syscall_num,
                    err
                );
                err.as_i64()
            }
        }
    }
}
