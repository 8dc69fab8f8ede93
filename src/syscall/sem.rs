//! Semaphore System Calls
//!
//! User space refers to semaphores through a 32-bit handle stored in its
//! own memory; every call passes the address of that handle.
//!
//! | Call          | a0             | a1     | a2    |
//! |---------------|----------------|--------|-------|
//! | `sem_init`    | `*mut sem_t`   | pshared| value |
//! | `sem_destroy` | `*mut sem_t`   |        |       |
//! | `sem_wait`    | `*mut sem_t`   |        |       |
//! | `sem_post`    | `*mut sem_t`   |        |       |

use log::{debug, warn};

use crate::mm::UserAddr;
use crate::param::WaitMode;
use crate::proc::ProcessServices;
use crate::sem::{SemError, SemHandle};
use crate::sync::BlockingChannel;
use crate::trap::TrapFrame;

use super::handler::{Kernel, SyscallContext, SyscallError, SyscallResult};
use super::validate::UserMemory;

/// Copy a handle in from user memory.
fn read_handle<M: UserMemory>(memory: &M, addr: UserAddr) -> Result<SemHandle, SyscallError> {
    memory.read_u32(addr).map(SemHandle::from_raw)
}

impl<S: ProcessServices, C: BlockingChannel> Kernel<S, C> {
    /// `sem_init(sem, pshared, value)`
    ///
    /// Only process-shared semaphores are supported. The new handle is
    /// written to `sem`; if that write faults the slot is freed again.
    pub(super) fn sys_sem_init<M: UserMemory>(
        &self,
        frame: &TrapFrame,
        ctx: &mut SyscallContext<'_, M>,
    ) -> SyscallResult {
        let addr = frame.argaddr(0)?;
        let pshared = frame.argint(1)?;
        let value = frame.argint(2)?;

        if pshared == 0 {
            warn!("[SEM] pid {}: private semaphores unsupported", ctx.proc.pid());
            return Err(SyscallError::Einval);
        }
        if value < 0 && self.config.reject_negative_count {
            return Err(SemError::NegativeCount.into());
        }

        // The slot stays unusable until the handle reaches user memory, so
        // a failed copy-out can always be undone.
        let mut table = self.semaphores.lock();
        let handle = table.reserve(value)?;

        if let Err(err) = ctx.memory.write_u32(addr, handle.raw()) {
            warn!(
                "[SEM] pid {}: handle copy-out to {} failed, releasing slot {}",
                ctx.proc.pid(),
                addr,
                handle.index()
            );
            table.cancel(handle);
            return Err(err);
        }
        table.publish(handle);
        drop(table);

        debug!(
            "[SEM] pid {}: init slot {} value {}",
            ctx.proc.pid(),
            handle.index(),
            value
        );
        Ok(0)
    }

    /// `sem_destroy(sem)`
    ///
    /// The handle is read and freed under the registry lock.
    pub(super) fn sys_sem_destroy<M: UserMemory>(
        &self,
        frame: &TrapFrame,
        ctx: &mut SyscallContext<'_, M>,
    ) -> SyscallResult {
        let addr = frame.argaddr(0)?;

        let mut table = self.semaphores.lock();
        let handle = read_handle(&*ctx.memory, addr)?;
        table.deallocate(handle).map_err(|err| {
            warn!("[SEM] pid {}: destroy {:?}: {}", ctx.proc.pid(), handle, err);
            err
        })?;
        Ok(0)
    }

    /// `sem_wait(sem)`
    ///
    /// Blocks until a permit is available. Under `WaitMode::Interruptible`
    /// a killed caller returns EINTR instead.
    pub(super) fn sys_sem_wait<M: UserMemory>(
        &self,
        frame: &TrapFrame,
        ctx: &mut SyscallContext<'_, M>,
    ) -> SyscallResult {
        let addr = frame.argaddr(0)?;
        let handle = read_handle(&*ctx.memory, addr)?;
        let proc = ctx.proc;

        match self.config.wait_mode {
            WaitMode::Blocking => self.semaphores.wait(handle, &self.channels)?,
            WaitMode::Interruptible => {
                self.semaphores
                    .wait_interruptible(handle, &self.channels, || proc.killed())?
            }
        }
        Ok(0)
    }

    /// `sem_post(sem)`
    pub(super) fn sys_sem_post<M: UserMemory>(
        &self,
        frame: &TrapFrame,
        ctx: &mut SyscallContext<'_, M>,
    ) -> SyscallResult {
        let addr = frame.argaddr(0)?;
        let handle = read_handle(&*ctx.memory, addr)?;
        self.semaphores.post(handle, &self.channels)?;
        Ok(0)
    }
}
