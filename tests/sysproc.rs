//! Process, clock and memory syscalls.

mod common;

use std::sync::Arc;
use std::thread;

use common::{kernel, wait_until, FakeServices, ParkingChannels, Task, USER_BASE};
use semsys::param::{PAGE_SIZE, TRAPFRAME};
use semsys::proc::Proc;
use semsys::syscall::numbers::*;
use semsys::syscall::SyscallError;
use semsys::{Kernel, KernelConfig};

#[test]
fn scenario_c_sbrk() {
    let kernel = kernel(KernelConfig::default());
    let mut t = Task::new(Arc::new(Proc::new(1, 4 * PAGE_SIZE)));

    assert_eq!(t.syscall(&kernel, SYS_SBRK, &[8192]), (4 * PAGE_SIZE) as i64);
    assert_eq!(t.proc.size(), 4 * PAGE_SIZE + 8192);

    assert_eq!(t.syscall(&kernel, SYS_SBRK, &[0]), (4 * PAGE_SIZE + 8192) as i64);
    assert_eq!(t.proc.size(), 4 * PAGE_SIZE + 8192);
}

#[test]
fn sbrk_past_trapframe_fails_without_mutation() {
    let kernel = kernel(KernelConfig::default());
    let start = TRAPFRAME - 16;
    let mut t = Task::new(Arc::new(Proc::new(1, start)));

    assert_eq!(t.syscall(&kernel, SYS_SBRK, &[16]), SyscallError::Enomem.as_i64());
    assert_eq!(t.proc.size(), start);

    assert_eq!(t.syscall(&kernel, SYS_SBRK, &[15]), start as i64);
    assert_eq!(t.proc.size(), TRAPFRAME - 1);
}

#[test]
fn sbrk_shrink() {
    let kernel = kernel(KernelConfig::default());
    let mut t = Task::new(Arc::new(Proc::new(1, 2 * PAGE_SIZE)));

    let shrink = -(PAGE_SIZE as i64);
    assert_eq!(t.syscall(&kernel, SYS_SBRK, &[shrink as u64]), (2 * PAGE_SIZE) as i64);
    assert_eq!(t.proc.size(), PAGE_SIZE);

    let too_far = -(2 * PAGE_SIZE as i64);
    assert_eq!(
        t.syscall(&kernel, SYS_SBRK, &[too_far as u64]),
        SyscallError::Enomem.as_i64()
    );
    assert_eq!(t.proc.size(), PAGE_SIZE);
}

#[test]
fn uptime_follows_ticks() {
    let kernel = kernel(KernelConfig::default());
    let mut t = Task::new(Arc::new(Proc::new(1, 0)));

    assert_eq!(t.syscall(&kernel, SYS_UPTIME, &[]), 0);
    kernel.tick();
    kernel.tick();
    assert_eq!(t.syscall(&kernel, SYS_UPTIME, &[]), 2);
}

#[test]
fn sleep_waits_for_ticks() {
    let kernel = kernel(KernelConfig::default());

    let sleeper = {
        let kernel = Arc::clone(&kernel);
        thread::spawn(move || {
            let mut t = Task::new(Arc::new(Proc::new(2, 0)));
            t.syscall(&kernel, SYS_SLEEP, &[3])
        })
    };

    while !sleeper.is_finished() {
        kernel.tick();
        thread::yield_now();
    }
    assert_eq!(sleeper.join().unwrap(), 0);
    assert!(kernel.clock().now() >= 3);
}

#[test]
fn negative_sleep_rejected() {
    let kernel = kernel(KernelConfig::default());
    let mut t = Task::new(Arc::new(Proc::new(1, 0)));
    assert_eq!(
        t.syscall(&kernel, SYS_SLEEP, &[(-1i64) as u64]),
        SyscallError::Einval.as_i64()
    );
}

#[test]
fn kill_interrupts_sleep() {
    let kernel = kernel(KernelConfig::default());
    let proc = Arc::new(Proc::new(9, 0));
    kernel.services().register(Arc::clone(&proc));

    let sleeper = {
        let kernel = Arc::clone(&kernel);
        let proc = Arc::clone(&proc);
        thread::spawn(move || Task::new(proc).syscall(&kernel, SYS_SLEEP, &[1_000_000]))
    };

    let mut killer = Task::new(Arc::new(Proc::new(1, 0)));
    assert_eq!(killer.syscall(&kernel, SYS_KILL, &[9]), 0);
    assert_eq!(sleeper.join().unwrap(), SyscallError::Eintr.as_i64());
}

#[test]
fn kill_unknown_pid() {
    let kernel = kernel(KernelConfig::default());
    let mut t = Task::new(Arc::new(Proc::new(1, 0)));
    assert_eq!(t.syscall(&kernel, SYS_KILL, &[42]), SyscallError::Esrch.as_i64());
}

#[test]
fn getpid_fork_exit_wait() {
    let kernel = kernel(KernelConfig::default());
    let mut t = Task::new(Arc::new(Proc::new(5, 0)));

    assert_eq!(t.syscall(&kernel, SYS_GETPID, &[]), 5);
    assert_eq!(t.syscall(&kernel, SYS_FORK, &[]), 101);

    assert_eq!(t.syscall(&kernel, SYS_EXIT, &[3]), 0);
    assert_eq!(*kernel.services().exited.lock().unwrap(), vec![(5, 3)]);

    assert_eq!(t.syscall(&kernel, SYS_WAIT, &[USER_BASE + 8]), 5);
    assert_eq!(u32::from_ne_bytes(t.bytes[8..12].try_into().unwrap()), 3);
}

#[test]
fn getprocs_fills_buffer() {
    let kernel = kernel(KernelConfig::default());
    kernel.services().register(Arc::new(Proc::new(1, 0)));
    kernel.services().register(Arc::new(Proc::new(2, 0)));
    let mut t = Task::new(Arc::new(Proc::new(1, 0)));

    assert_eq!(t.syscall(&kernel, SYS_GETPROCS, &[USER_BASE + 16]), 2);
    assert_eq!(u32::from_ne_bytes(t.bytes[16..20].try_into().unwrap()), 1);
    assert_eq!(u32::from_ne_bytes(t.bytes[20..24].try_into().unwrap()), 2);

    assert_eq!(t.syscall(&kernel, SYS_GETPROCS, &[0]), SyscallError::Efault.as_i64());
}

#[test]
fn free_memory_in_bytes() {
    let kernel = kernel(KernelConfig::default());
    let mut t = Task::new(Arc::new(Proc::new(1, 0)));
    let expected = (kernel.services().free_pages * PAGE_SIZE) as i64;

    assert_eq!(t.syscall(&kernel, SYS_FREEPMEM, &[]), expected);
    assert_eq!(t.syscall(&kernel, SYS_MEMORYUSER, &[]), expected);
}

#[test]
fn free_memory_saturates() {
    let kernel = Kernel::new(
        KernelConfig::default(),
        FakeServices::new(u64::MAX),
        ParkingChannels::default(),
    );
    let mut t = Task::new(Arc::new(Proc::new(1, 0)));

    assert_eq!(t.syscall(&kernel, SYS_FREEPMEM, &[]), i64::MAX);
    assert_eq!(t.syscall(&kernel, SYS_MEMORYUSER, &[]), i64::MAX);
}

#[test]
fn clock_wakes_many_sleepers() {
    let kernel = kernel(KernelConfig::default());
    let sleepers: Vec<_> = (0..3)
        .map(|pid| {
            let kernel = Arc::clone(&kernel);
            thread::spawn(move || Task::new(Arc::new(Proc::new(pid, 0))).syscall(&kernel, SYS_SLEEP, &[2]))
        })
        .collect();

    wait_until("sleepers to finish", || {
        kernel.tick();
        sleepers.iter().all(|s| s.is_finished())
    });
    for sleeper in sleepers {
        assert_eq!(sleeper.join().unwrap(), 0);
    }
}
