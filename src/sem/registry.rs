//! Semaphore Registry
//!
//! A fixed table of [`Semaphore`] slots handed out to user space as
//! [`SemHandle`]s.
//!
//! # Design
//! - The registry lock guards only the free list; each slot's counter is
//!   guarded by that slot's own lock.
//! - Allocation pops a free index (O(1)); deallocation pushes it back.
//! - Every handle carries the slot generation, so handles kept past
//!   destroy are rejected instead of aliasing the slot's next owner.
//! - wait/post/try_wait never take the registry lock.

use log::{debug, warn};
use spin::{Mutex, MutexGuard};

use crate::param::NSEM;
use crate::sync::BlockingChannel;

use super::handle::SemHandle;
use super::semaphore::{SemError, Semaphore};

/// Stack of free slot indices.
struct FreeList {
    free: [u16; NSEM],
    len: usize,
}

impl FreeList {
    /// All slots free, lowest index on top.
    const fn full() -> Self {
        let mut free = [0u16; NSEM];
        let mut i = 0;
        while i < NSEM {
            free[i] = (NSEM - 1 - i) as u16;
            i += 1;
        }
        Self { free, len: NSEM }
    }

    #[inline]
    fn pop(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.free[self.len] as usize)
    }

    #[inline]
    fn push(&mut self, index: usize) {
        debug_assert!(self.len < NSEM);
        self.free[self.len] = index as u16;
        self.len += 1;
    }
}

/// The global semaphore table.
pub struct SemaphoreRegistry {
    /// Registry lock: allocation metadata only.
    table: Mutex<FreeList>,
    slots: [Semaphore; NSEM],
}

impl SemaphoreRegistry {
    /// Create a registry with every slot free.
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const FREE: Semaphore = Semaphore::new();
        Self {
            table: Mutex::new(FreeList::full()),
            slots: [FREE; NSEM],
        }
    }

    /// Acquire the registry lock.
    ///
    /// The guard allocates and deallocates; semaphore operations do not
    /// need it.
    pub fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            registry: self,
            table: self.table.lock(),
        }
    }

    /// Allocate a slot with `count` permits.
    pub fn allocate(&self, count: i32) -> Result<SemHandle, SemError> {
        self.lock().allocate(count)
    }

    /// Free the slot `handle` refers to.
    pub fn deallocate(&self, handle: SemHandle) -> Result<(), SemError> {
        self.lock().deallocate(handle)
    }

    /// Number of slots available for allocation.
    pub fn free_slots(&self) -> usize {
        self.lock().free_slots()
    }

    /// Resolve a handle to its slot (range check only).
    fn slot(&self, handle: SemHandle) -> Result<&Semaphore, SemError> {
        self.slots.get(handle.index()).ok_or(SemError::InvalidHandle)
    }

    /// Decrement, parking until a permit is available.
    pub fn wait<C: BlockingChannel>(&self, handle: SemHandle, channels: &C) -> Result<(), SemError> {
        self.slot(handle)?.wait(handle.generation(), channels)
    }

    /// Decrement, giving up once `killed` reports true.
    pub fn wait_interruptible<C, K>(
        &self,
        handle: SemHandle,
        channels: &C,
        killed: K,
    ) -> Result<(), SemError>
    where
        C: BlockingChannel,
        K: Fn() -> bool,
    {
        self.slot(handle)?
            .wait_interruptible(handle.generation(), channels, killed)
    }

    /// Decrement without parking. Returns whether a permit was taken.
    pub fn try_wait(&self, handle: SemHandle) -> Result<bool, SemError> {
        self.slot(handle)?.try_wait(handle.generation())
    }

    /// Increment and wake every waiter.
    pub fn post<C: BlockingChannel>(&self, handle: SemHandle, channels: &C) -> Result<(), SemError> {
        self.slot(handle)?.post(handle.generation(), channels)
    }

    /// Current count.
    pub fn value(&self, handle: SemHandle) -> Result<i32, SemError> {
        self.slot(handle)?.value(handle.generation())
    }

    /// Number of threads parked on the semaphore.
    pub fn waiters(&self, handle: SemHandle) -> Result<u32, SemError> {
        self.slot(handle)?.waiters(handle.generation())
    }

    /// Wake every parked waiter on every semaphore without posting.
    ///
    /// Interruptible waiters re-check their kill flag; others park again.
    pub fn wake_all<C: BlockingChannel>(&self, channels: &C) {
        for slot in self.slots.iter() {
            slot.kick(channels);
        }
    }
}

impl Default for SemaphoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Holder of the registry lock.
pub struct RegistryGuard<'r> {
    registry: &'r SemaphoreRegistry,
    table: MutexGuard<'r, FreeList>,
}

impl RegistryGuard<'_> {
    /// Allocate a slot with `count` permits.
    pub fn allocate(&mut self, count: i32) -> Result<SemHandle, SemError> {
        let handle = self.reserve(count)?;
        self.publish(handle);
        Ok(handle)
    }

    /// Take a slot off the free list without making it usable.
    ///
    /// The returned handle is rejected by every operation until
    /// [`publish`](Self::publish). A reservation that is never published
    /// must be handed back with [`cancel`](Self::cancel) under the same
    /// guard.
    pub(crate) fn reserve(&mut self, count: i32) -> Result<SemHandle, SemError> {
        let Some(index) = self.table.pop() else {
            warn!("sem: registry exhausted ({} slots)", NSEM);
            return Err(SemError::Exhausted);
        };

        let generation = self.registry.slots[index].reserve(count);
        Ok(SemHandle::new(index, generation))
    }

    /// Make a reserved slot usable.
    pub(crate) fn publish(&mut self, handle: SemHandle) {
        self.registry.slots[handle.index()].publish(handle.generation());
        debug!(
            "sem: allocated slot {} gen {}",
            handle.index(),
            handle.generation()
        );
    }

    /// Return an unpublished reservation to the free list.
    ///
    /// Cannot fail: nothing can have parked on the slot.
    pub(crate) fn cancel(&mut self, handle: SemHandle) {
        self.registry.slots[handle.index()].unreserve(handle.generation());
        self.table.push(handle.index());
        debug!("sem: cancelled reservation of slot {}", handle.index());
    }

    /// Free the slot `handle` refers to.
    ///
    /// Fails without side effects if the handle is out of range, stale,
    /// already freed, or has parked waiters.
    pub fn deallocate(&mut self, handle: SemHandle) -> Result<(), SemError> {
        let index = handle.index();
        let slot = self.registry.slot(handle)?;
        slot.retire(handle.generation())?;
        self.table.push(index);
        debug!("sem: freed slot {} gen {}", index, handle.generation());
        Ok(())
    }

    /// Number of slots available for allocation.
    pub fn free_slots(&self) -> usize {
        self.table.len
    }
}
