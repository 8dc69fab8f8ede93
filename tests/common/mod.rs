//! Shared fixtures for the integration tests: a parking channel built on
//! std primitives, a fake process table, and per-thread user memory.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use semsys::mm::UserAddr;
use semsys::proc::{Proc, ProcessServices};
use semsys::syscall::{Access, SyscallContext, SyscallError, UserMemory, UserSpace};
use semsys::sync::{BlockingChannel, Channel};
use semsys::{Kernel, KernelConfig, TrapFrame};

/// Base of every test task's user window.
pub const USER_BASE: u64 = 0x4000;

/// Size of every test task's user window.
pub const USER_LEN: usize = 64;

/// Address of the semaphore handle in a task's window.
pub const SEM_ADDR: u64 = USER_BASE;

/// Parks threads on a condvar, one wake counter per channel.
#[derive(Default)]
pub struct ParkingChannels {
    epochs: Mutex<HashMap<usize, u64>>,
    cvar: Condvar,
    parks: AtomicUsize,
}

impl ParkingChannels {
    /// Number of times any thread has gone to sleep.
    pub fn parks(&self) -> usize {
        self.parks.load(Ordering::SeqCst)
    }
}

impl BlockingChannel for ParkingChannels {
    fn sleep<'a, T>(
        &self,
        chan: Channel,
        lock: &'a spin::Mutex<T>,
        guard: spin::MutexGuard<'a, T>,
    ) -> spin::MutexGuard<'a, T> {
        let mut epochs = self.epochs.lock().unwrap();
        let seen = epochs.get(&chan.id()).copied().unwrap_or(0);
        drop(guard);
        self.parks.fetch_add(1, Ordering::SeqCst);

        while epochs.get(&chan.id()).copied().unwrap_or(0) == seen {
            epochs = self.cvar.wait(epochs).unwrap();
        }
        drop(epochs);

        lock.lock()
    }

    fn wakeup(&self, chan: Channel) {
        let mut epochs = self.epochs.lock().unwrap();
        *epochs.entry(chan.id()).or_insert(0) += 1;
        self.cvar.notify_all();
    }
}

/// Process table stand-in.
pub struct FakeServices {
    procs: Mutex<Vec<Arc<Proc>>>,
    next_pid: Mutex<i32>,
    pub exited: Mutex<Vec<(i32, i32)>>,
    pub free_pages: u64,
}

impl FakeServices {
    pub fn new(free_pages: u64) -> Self {
        Self {
            procs: Mutex::new(Vec::new()),
            next_pid: Mutex::new(100),
            exited: Mutex::new(Vec::new()),
            free_pages,
        }
    }

    pub fn register(&self, proc: Arc<Proc>) {
        self.procs.lock().unwrap().push(proc);
    }
}

impl ProcessServices for FakeServices {
    fn exit(&self, proc: &Proc, status: i32) {
        self.exited.lock().unwrap().push((proc.pid(), status));
    }

    fn fork(&self, _proc: &Proc) -> Result<i32, SyscallError> {
        let mut next = self.next_pid.lock().unwrap();
        *next += 1;
        Ok(*next)
    }

    fn wait(
        &self,
        _proc: &Proc,
        status: UserAddr,
        memory: &mut dyn UserMemory,
    ) -> Result<i32, SyscallError> {
        let exited = self.exited.lock().unwrap();
        let &(pid, code) = exited.last().ok_or(SyscallError::Esrch)?;
        if !status.is_null() {
            memory.write_u32(status, code as u32)?;
        }
        Ok(pid)
    }

    fn kill(&self, pid: i32) -> Result<(), SyscallError> {
        let procs = self.procs.lock().unwrap();
        let proc = procs
            .iter()
            .find(|proc| proc.pid() == pid)
            .ok_or(SyscallError::Esrch)?;
        proc.set_killed();
        Ok(())
    }

    fn procinfo(&self, addr: UserAddr, memory: &mut dyn UserMemory) -> Result<i32, SyscallError> {
        let procs = self.procs.lock().unwrap();
        let mut cursor = addr;
        for proc in procs.iter() {
            memory.write_u32(cursor, proc.pid() as u32)?;
            cursor = cursor.checked_add(4).ok_or(SyscallError::Efault)?;
        }
        Ok(procs.len() as i32)
    }

    fn free_pages(&self) -> u64 {
        self.free_pages
    }
}

pub type TestKernel = Kernel<FakeServices, ParkingChannels>;

pub fn kernel(config: KernelConfig) -> Arc<TestKernel> {
    Arc::new(Kernel::new(
        config,
        FakeServices::new(1024),
        ParkingChannels::default(),
    ))
}

/// A user thread: a process record plus its own user memory window.
pub struct Task {
    pub proc: Arc<Proc>,
    pub bytes: [u8; USER_LEN],
    pub access: Access,
}

impl Task {
    pub fn new(proc: Arc<Proc>) -> Self {
        Self {
            proc,
            bytes: [0; USER_LEN],
            access: Access::READ_WRITE,
        }
    }

    pub fn syscall(&mut self, kernel: &TestKernel, num: usize, args: &[u64]) -> i64 {
        let mut frame = TrapFrame::syscall(num, args);
        let mut space = UserSpace::new(UserAddr::new(USER_BASE), &mut self.bytes, self.access);
        let mut ctx = SyscallContext::new(&self.proc, &mut space);
        kernel.handle(&mut frame, &mut ctx);
        frame.a[0] as i64
    }

    /// Handle stored at `SEM_ADDR`.
    pub fn handle(&self) -> u32 {
        u32::from_ne_bytes(self.bytes[..4].try_into().unwrap())
    }

    /// Store a handle at `SEM_ADDR`.
    pub fn set_handle(&mut self, raw: u32) {
        self.bytes[..4].copy_from_slice(&raw.to_ne_bytes());
    }
}

/// Spin until `cond` holds, failing the test after a generous timeout.
pub fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(1));
    }
}
