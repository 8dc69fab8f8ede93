//! User Memory Access
//!
//! All copies between kernel and user space go through [`UserMemory`].
//! The semaphore subsystem never sees a user address; the syscall handlers
//! copy handles in and out through this trait.
//!
//! # Security Principles
//! - Validate ALL ranges before use
//! - Fail-secure: deny by default
//! - Prevent common vulnerabilities:
//!   - Buffer overflows (bounds checking)
//!   - Address wraparound (checked arithmetic)
//!   - Null pointer dereference (explicit checks)
//!   - TOCTOU races (values are copied, never borrowed)

use core::ops::Range;

use bitflags::bitflags;

use crate::mm::UserAddr;
use crate::param::TRAPFRAME;

use super::handler::SyscallError;

bitflags! {
    /// Permissions of a user memory window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Access: u8 {
        /// Kernel may copy in.
        const READ = 1 << 0;
        /// Kernel may copy out.
        const WRITE = 1 << 1;
        /// Both directions.
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Fallible access to the calling process's address space.
pub trait UserMemory {
    /// Copy `dst.len()` bytes from user address `src`.
    fn copy_in(&self, dst: &mut [u8], src: UserAddr) -> Result<(), SyscallError>;

    /// Copy `src` to user address `dst`.
    fn copy_out(&mut self, dst: UserAddr, src: &[u8]) -> Result<(), SyscallError>;

    /// Read a native-endian 32-bit value.
    fn read_u32(&self, src: UserAddr) -> Result<u32, SyscallError> {
        let mut bytes = [0u8; 4];
        self.copy_in(&mut bytes, src)?;
        Ok(u32::from_ne_bytes(bytes))
    }

    /// Write a native-endian 32-bit value.
    fn write_u32(&mut self, dst: UserAddr, value: u32) -> Result<(), SyscallError> {
        self.copy_out(dst, &value.to_ne_bytes())
    }
}

/// Validate a user range independent of any mapping.
///
/// # Security Checks
/// 1. Pointer is not null
/// 2. Pointer + length doesn't overflow
/// 3. End address stays below the trap frame
///
/// Zero-length ranges are always valid.
pub fn validate_user_range(addr: UserAddr, len: usize) -> Result<(), SyscallError> {
    if len == 0 {
        return Ok(());
    }

    if addr.is_null() {
        return Err(SyscallError::Efault);
    }

    let end = addr.checked_add(len as u64).ok_or(SyscallError::Efault)?;

    if end.as_u64() > TRAPFRAME {
        return Err(SyscallError::Efault);
    }

    Ok(())
}

/// A window of user memory backed by a kernel-visible buffer.
///
/// `bytes[0]` corresponds to user address `base`. Accesses outside the
/// window, or against its permissions, fail with `EFAULT`.
#[derive(Debug)]
pub struct UserSpace<'a> {
    base: UserAddr,
    bytes: &'a mut [u8],
    access: Access,
}

impl<'a> UserSpace<'a> {
    /// Map `bytes` at user address `base`.
    pub fn new(base: UserAddr, bytes: &'a mut [u8], access: Access) -> Self {
        Self {
            base,
            bytes,
            access,
        }
    }

    /// Check `[addr, addr + len)` against the window and return the
    /// matching byte range of the backing buffer.
    pub fn validate(
        &self,
        addr: UserAddr,
        len: usize,
        needed: Access,
    ) -> Result<Range<usize>, SyscallError> {
        if !self.access.contains(needed) {
            return Err(SyscallError::Efault);
        }

        validate_user_range(addr, len)?;
        if len == 0 {
            return Ok(0..0);
        }

        if addr < self.base {
            return Err(SyscallError::Efault);
        }

        let offset = usize::try_from(addr.as_u64() - self.base.as_u64())
            .map_err(|_| SyscallError::Efault)?;
        let end = offset.checked_add(len).ok_or(SyscallError::Efault)?;

        if end > self.bytes.len() {
            return Err(SyscallError::Efault);
        }

        Ok(offset..end)
    }
}

impl UserMemory for UserSpace<'_> {
    fn copy_in(&self, dst: &mut [u8], src: UserAddr) -> Result<(), SyscallError> {
        let range = self.validate(src, dst.len(), Access::READ)?;
        dst.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn copy_out(&mut self, dst: UserAddr, src: &[u8]) -> Result<(), SyscallError> {
        let range = self.validate(dst, src.len(), Access::WRITE)?;
        self.bytes[range].copy_from_slice(src);
        Ok(())
    }
}
