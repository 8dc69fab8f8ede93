//! Saved User Registers
//!
//! The part of the RISC-V trap frame the syscall layer reads: the
//! argument registers `a0`-`a5`, the syscall number in `a7`, and `a0`
//! again for the return value.
//!
//! # Security Considerations
//! - Register contents are untrusted user input
//! - Decoding an argument never fails for in-range indices; validation of
//!   what the value means is up to each handler

use crate::mm::UserAddr;
use crate::syscall::SyscallError;

/// Number of syscall argument registers.
pub const MAX_ARGS: usize = 6;

/// Trap frame saved on entry from user mode.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TrapFrame {
    /// Saved user program counter.
    pub epc: u64,
    /// Argument registers a0-a7.
    pub a: [u64; 8],
}

impl TrapFrame {
    /// Build a frame for a syscall with the given arguments.
    pub fn syscall(num: usize, args: &[u64]) -> Self {
        let mut frame = Self::default();
        let n = args.len().min(MAX_ARGS);
        frame.a[..n].copy_from_slice(&args[..n]);
        frame.a[7] = num as u64;
        frame
    }

    /// Syscall number from a7.
    #[inline]
    pub fn syscall_num(&self) -> usize {
        self.a[7] as usize
    }

    /// Raw value of argument `n`.
    #[inline]
    pub fn argraw(&self, n: usize) -> Result<u64, SyscallError> {
        if n >= MAX_ARGS {
            return Err(SyscallError::Einval);
        }
        Ok(self.a[n])
    }

    /// Argument `n` as a C `int`.
    #[inline]
    pub fn argint(&self, n: usize) -> Result<i32, SyscallError> {
        self.argraw(n).map(|raw| raw as i32)
    }

    /// Argument `n` as a user pointer. Not checked for validity here.
    #[inline]
    pub fn argaddr(&self, n: usize) -> Result<UserAddr, SyscallError> {
        self.argraw(n).map(UserAddr::new)
    }

    /// Store the syscall result in a0.
    #[inline]
    pub fn set_return(&mut self, value: i64) {
        self.a[0] = value as u64;
    }
}
