//! Sleep/Wakeup Channels
//!
//! A channel is an opaque identity (usually the address of the object being
//! waited on). Threads park on a channel with [`BlockingChannel::sleep`] and
//! are released in bulk by [`BlockingChannel::wakeup`].
//!
//! # Contract
//! - `sleep` releases the given lock and parks atomically: a `wakeup` issued
//!   by a thread that acquired the lock after the sleeper released it is
//!   never lost.
//! - `sleep` re-acquires the lock before returning.
//! - `wakeup` releases **every** thread parked on the channel. Sleepers must
//!   re-check their condition, and may also return spuriously.

use core::sync::atomic::{AtomicUsize, Ordering};

use spin::{Mutex, MutexGuard};

/// Identity of something a thread can wait on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct Channel(usize);

impl Channel {
    /// Create a channel from a raw identity.
    #[inline]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// The channel identified by an object's address.
    #[inline]
    pub fn of<T>(object: &T) -> Self {
        Self(object as *const T as usize)
    }

    /// Get the raw identity.
    #[inline]
    pub const fn id(self) -> usize {
        self.0
    }
}

/// Park/unpark primitive provided by the scheduler.
pub trait BlockingChannel {
    /// Release `guard`, park on `chan`, and re-lock `lock` once woken.
    ///
    /// `guard` must be the guard of `lock`.
    fn sleep<'a, T>(
        &self,
        chan: Channel,
        lock: &'a Mutex<T>,
        guard: MutexGuard<'a, T>,
    ) -> MutexGuard<'a, T>;

    /// Wake every thread parked on `chan`.
    fn wakeup(&self, chan: Channel);
}

/// Number of wake counters in a [`SpinChannel`].
const CHANNEL_BUCKETS: usize = 64;

/// A busy-waiting channel for cores without a scheduler.
///
/// Each channel hashes to a wake counter. A sleeper samples the counter while
/// still holding its lock and spins until it changes. Unrelated channels may
/// share a counter, which only causes spurious wakeups.
pub struct SpinChannel {
    epochs: [AtomicUsize; CHANNEL_BUCKETS],
}

impl SpinChannel {
    /// Create a channel set with no pending wakeups.
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const ZERO: AtomicUsize = AtomicUsize::new(0);
        Self {
            epochs: [ZERO; CHANNEL_BUCKETS],
        }
    }

    #[inline]
    fn epoch(&self, chan: Channel) -> &AtomicUsize {
        // Objects are at least word aligned; drop the always-zero bits.
        &self.epochs[(chan.id() >> 3) % CHANNEL_BUCKETS]
    }
}

impl Default for SpinChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockingChannel for SpinChannel {
    fn sleep<'a, T>(
        &self,
        chan: Channel,
        lock: &'a Mutex<T>,
        guard: MutexGuard<'a, T>,
    ) -> MutexGuard<'a, T> {
        let epoch = self.epoch(chan);
        // Sampled under the caller's lock, so any wakeup issued after the
        // release below bumps the counter past this value.
        let seen = epoch.load(Ordering::Acquire);
        drop(guard);

        while epoch.load(Ordering::Acquire) == seen {
            core::hint::spin_loop();
        }

        lock.lock()
    }

    fn wakeup(&self, chan: Channel) {
        self.epoch(chan).fetch_add(1, Ordering::Release);
    }
}
