//! Kernel Semaphore
//!
//! One counter plus one spin lock. Waiters park on the semaphore's own
//! address with [`BlockingChannel::sleep`], and every post broadcasts on it.
//!
//! # Wait Protocol
//! ```text
//! lock ─► count > 0 ? ──yes──► count -= 1 ─► unlock
//!              │no
//!              ▼
//!         sleep(chan, lock) ◄──┐   (lock released while parked)
//!              │               │
//!         count > 0 ? ───no────┘   (woken by a broadcast: re-check)
//!              │yes
//!              ▼
//!         count -= 1 ─► unlock
//! ```
//! A wakeup only says "something changed". Several waiters race for the
//! lock after one post; only as many as the count allows get through.

use core::fmt;

use log::trace;
use spin::Mutex;

use crate::param::HANDLE_INDEX_BITS;
use crate::sync::{BlockingChannel, Channel};

/// Mask for the generation part of a handle.
pub(crate) const GENERATION_MASK: u32 = u32::MAX >> HANDLE_INDEX_BITS;

/// Error type for semaphore and registry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemError {
    /// Every slot in the registry is in use.
    Exhausted,
    /// The handle's index is outside the registry.
    InvalidHandle,
    /// The slot was destroyed and handed out again since this handle was issued.
    StaleHandle,
    /// The slot is not allocated.
    NotAllocated,
    /// Threads are still parked on the semaphore.
    Busy,
    /// The waiter was killed before a permit became available.
    Interrupted,
    /// A negative initial count was requested.
    NegativeCount,
    /// The count cannot grow any further.
    Overflow,
}

impl fmt::Display for SemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => write!(f, "no free semaphore slot"),
            Self::InvalidHandle => write!(f, "semaphore handle out of range"),
            Self::StaleHandle => write!(f, "stale semaphore handle"),
            Self::NotAllocated => write!(f, "semaphore not allocated"),
            Self::Busy => write!(f, "semaphore has waiters"),
            Self::Interrupted => write!(f, "wait interrupted"),
            Self::NegativeCount => write!(f, "negative initial count"),
            Self::Overflow => write!(f, "semaphore count overflow"),
        }
    }
}

/// State guarded by the slot lock.
#[derive(Debug)]
struct SemState {
    /// Available permits.
    count: i32,
    /// Generation of the current (or last) allocation. 0 is never issued.
    generation: u32,
    /// Whether the slot is handed out.
    allocated: bool,
    /// Threads parked in `wait`.
    waiters: u32,
}

impl SemState {
    #[inline]
    fn check(&self, generation: u32) -> Result<(), SemError> {
        if !self.allocated {
            Err(SemError::NotAllocated)
        } else if self.generation != generation {
            Err(SemError::StaleHandle)
        } else {
            Ok(())
        }
    }
}

/// A counting semaphore living in a registry slot.
///
/// Every operation names the allocation it expects via `generation`, so a
/// handle kept past `sem_destroy` cannot touch the slot's next owner.
pub struct Semaphore {
    state: Mutex<SemState>,
}

impl Semaphore {
    /// Create a free (unallocated) semaphore.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(SemState {
                count: 0,
                generation: 0,
                allocated: false,
                waiters: 0,
            }),
        }
    }

    /// The channel waiters park on.
    #[inline]
    pub fn channel(&self) -> Channel {
        Channel::of(self)
    }

    /// Hand the slot out with `count` permits.
    ///
    /// Returns the new generation. The caller must hold the registry lock
    /// and must have taken this slot off the free list.
    pub(crate) fn activate(&self, count: i32) -> u32 {
        let generation = self.reserve(count);
        self.publish(generation);
        generation
    }

    /// Stamp a new generation and count without making the slot usable.
    ///
    /// Until [`publish`](Self::publish), every operation on the new handle
    /// fails with `NotAllocated`, so nothing can park here.
    pub(crate) fn reserve(&self, count: i32) -> u32 {
        let mut state = self.state.lock();
        debug_assert!(!state.allocated);
        debug_assert_eq!(state.waiters, 0);

        let mut generation = state.generation.wrapping_add(1) & GENERATION_MASK;
        if generation == 0 {
            generation = 1;
        }

        state.generation = generation;
        state.count = count;
        generation
    }

    /// Make a reserved slot usable.
    pub(crate) fn publish(&self, generation: u32) {
        let mut state = self.state.lock();
        debug_assert_eq!(state.generation, generation);
        state.allocated = true;
    }

    /// Drop a reservation that was never published.
    pub(crate) fn unreserve(&self, generation: u32) {
        let mut state = self.state.lock();
        debug_assert!(!state.allocated);
        debug_assert_eq!(state.generation, generation);
        state.count = 0;
    }

    /// Return the slot to the free state.
    ///
    /// Refused while threads are parked, since nothing would ever wake them.
    pub(crate) fn retire(&self, generation: u32) -> Result<(), SemError> {
        let mut state = self.state.lock();
        state.check(generation)?;
        if state.waiters != 0 {
            return Err(SemError::Busy);
        }
        state.allocated = false;
        state.count = 0;
        Ok(())
    }

    /// Take a permit, parking until one is available.
    ///
    /// Does not observe kills: a thread parked here stays parked until a
    /// post hands it a permit.
    pub fn wait<C: BlockingChannel>(&self, generation: u32, channels: &C) -> Result<(), SemError> {
        self.wait_while(generation, channels, || false)
    }

    /// Take a permit, giving up with [`SemError::Interrupted`] once
    /// `killed` reports true.
    ///
    /// `killed` is checked before parking and after every wake. The kill
    /// path must broadcast on this semaphore's channel for a parked thread
    /// to notice promptly.
    pub fn wait_interruptible<C, K>(
        &self,
        generation: u32,
        channels: &C,
        killed: K,
    ) -> Result<(), SemError>
    where
        C: BlockingChannel,
        K: Fn() -> bool,
    {
        self.wait_while(generation, channels, killed)
    }

    fn wait_while<C, K>(&self, generation: u32, channels: &C, killed: K) -> Result<(), SemError>
    where
        C: BlockingChannel,
        K: Fn() -> bool,
    {
        let chan = self.channel();
        let mut state = self.state.lock();
        state.check(generation)?;

        if state.count > 0 {
            state.count -= 1;
            return Ok(());
        }

        state.waiters += 1;
        while state.count <= 0 {
            if killed() {
                state.waiters -= 1;
                trace!("sem {:#x}: wait interrupted", chan.id());
                return Err(SemError::Interrupted);
            }
            trace!("sem {:#x}: parking ({} waiters)", chan.id(), state.waiters);
            state = channels.sleep(chan, &self.state, state);
        }
        // Parked threads pin the allocation (see `retire`).
        debug_assert_eq!(state.generation, generation);

        state.waiters -= 1;
        state.count -= 1;
        Ok(())
    }

    /// Take a permit if one is available, without parking.
    pub fn try_wait(&self, generation: u32) -> Result<bool, SemError> {
        let mut state = self.state.lock();
        state.check(generation)?;
        if state.count > 0 {
            state.count -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Add a permit and wake every parked waiter.
    pub fn post<C: BlockingChannel>(&self, generation: u32, channels: &C) -> Result<(), SemError> {
        let chan = self.channel();
        let mut state = self.state.lock();
        state.check(generation)?;

        state.count = state.count.checked_add(1).ok_or(SemError::Overflow)?;
        if state.waiters != 0 {
            trace!("sem {:#x}: waking {} waiters", chan.id(), state.waiters);
        }
        channels.wakeup(chan);
        Ok(())
    }

    /// Current number of permits.
    pub fn value(&self, generation: u32) -> Result<i32, SemError> {
        let state = self.state.lock();
        state.check(generation)?;
        Ok(state.count)
    }

    /// Number of threads currently parked in `wait`.
    pub fn waiters(&self, generation: u32) -> Result<u32, SemError> {
        let state = self.state.lock();
        state.check(generation)?;
        Ok(state.waiters)
    }

    /// Broadcast on this semaphore's channel without changing the count.
    ///
    /// Used by the kill path so interruptible waiters re-check their flag.
    /// Takes the slot lock so the wakeup cannot slip between a waiter's
    /// flag check and its park.
    pub fn kick<C: BlockingChannel>(&self, channels: &C) {
        let state = self.state.lock();
        if state.allocated && state.waiters != 0 {
            channels.wakeup(self.channel());
        }
    }

    pub(crate) fn is_allocated(&self) -> bool {
        self.state.lock().allocated
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        if state.allocated {
            write!(
                f,
                "Semaphore(count={}, gen={}, waiters={})",
                state.count, state.generation, state.waiters
            )
        } else {
            write!(f, "Semaphore(free)")
        }
    }
}
