//! Process, Clock and Memory System Calls
//!
//! Thin wrappers: argument decoding here, the work in [`ProcessServices`],
//! [`TickClock`](crate::proc::TickClock) or the process size counter.

use log::debug;

use crate::param::PAGE_SIZE;
use crate::proc::ProcessServices;
use crate::sync::BlockingChannel;
use crate::trap::TrapFrame;

use super::handler::{Kernel, SyscallContext, SyscallError, SyscallResult};
use super::validate::UserMemory;

impl<S: ProcessServices, C: BlockingChannel> Kernel<S, C> {
    /// `exit(status)`
    pub(super) fn sys_exit<M: UserMemory>(
        &self,
        frame: &TrapFrame,
        ctx: &mut SyscallContext<'_, M>,
    ) -> SyscallResult {
        let status = frame.argint(0)?;
        self.services.exit(ctx.proc, status);
        Ok(0) // not reached in a real kernel
    }

    /// `getpid()`
    pub(super) fn sys_getpid<M: UserMemory>(&self, ctx: &mut SyscallContext<'_, M>) -> SyscallResult {
        Ok(ctx.proc.pid() as i64)
    }

    /// `fork()`
    pub(super) fn sys_fork<M: UserMemory>(&self, ctx: &mut SyscallContext<'_, M>) -> SyscallResult {
        self.services.fork(ctx.proc).map(i64::from)
    }

    /// `wait(status)`
    pub(super) fn sys_wait<M: UserMemory>(
        &self,
        frame: &TrapFrame,
        ctx: &mut SyscallContext<'_, M>,
    ) -> SyscallResult {
        let status = frame.argaddr(0)?;
        self.services
            .wait(ctx.proc, status, &mut *ctx.memory)
            .map(i64::from)
    }

    /// `sbrk(n)`
    ///
    /// Moves the break by `n` bytes without reserving pages. Returns the
    /// old break; on failure the size is unchanged.
    pub(super) fn sys_sbrk<M: UserMemory>(
        &self,
        frame: &TrapFrame,
        ctx: &mut SyscallContext<'_, M>,
    ) -> SyscallResult {
        let n = frame.argint(0)?;
        let old = ctx.proc.size_mut().grow(i64::from(n))?;
        debug!("[SYSCALL] pid {}: sbrk({}) from {:#x}", ctx.proc.pid(), n, old);
        Ok(old as i64)
    }

    /// `sleep(n)`
    ///
    /// Unlike `sem_wait`, a kill always ends the sleep early.
    pub(super) fn sys_sleep<M: UserMemory>(
        &self,
        frame: &TrapFrame,
        ctx: &mut SyscallContext<'_, M>,
    ) -> SyscallResult {
        let n = frame.argint(0)?;
        let n = u64::try_from(n).map_err(|_| SyscallError::Einval)?;
        let proc = ctx.proc;
        self.clock.sleep(n, &self.channels, || proc.killed())?;
        Ok(0)
    }

    /// `kill(pid)`
    ///
    /// After the target is flagged, every sleeper on the tick clock and
    /// every semaphore waiter is woken so interruptible waits can notice.
    pub(super) fn sys_kill(&self, frame: &TrapFrame) -> SyscallResult {
        let pid = frame.argint(0)?;
        self.services.kill(pid)?;
        self.clock.kick(&self.channels);
        self.semaphores.wake_all(&self.channels);
        Ok(0)
    }

    /// `uptime()`: clock ticks since boot.
    pub(super) fn sys_uptime(&self) -> SyscallResult {
        Ok(self.clock.now() as i64)
    }

    /// `getprocs(pstat)`: fill the caller's table, return the active count.
    pub(super) fn sys_getprocs<M: UserMemory>(
        &self,
        frame: &TrapFrame,
        ctx: &mut SyscallContext<'_, M>,
    ) -> SyscallResult {
        let addr = frame.argaddr(0)?;
        self.services.procinfo(addr, &mut *ctx.memory).map(i64::from)
    }

    /// `freepmem()`: free physical memory in bytes, saturating at `i64::MAX`.
    pub(super) fn sys_freepmem(&self) -> SyscallResult {
        let bytes = self
            .services
            .free_pages()
            .checked_mul(PAGE_SIZE)
            .and_then(|bytes| i64::try_from(bytes).ok())
            .unwrap_or(i64::MAX);
        Ok(bytes)
    }

    /// `memoryuser()`: same accounting as `freepmem`.
    pub(super) fn sys_memoryuser(&self) -> SyscallResult {
        self.sys_freepmem()
    }
}
