//! Tick Clock
//!
//! The global timer tick counter (`ticks` + `tickslock`). The timer
//! interrupt calls [`TickClock::tick`]; `sleep` parks on the clock's
//! channel and re-checks both elapsed time and the caller's kill flag on
//! every wake.

use log::trace;
use spin::Mutex;

use crate::sync::{BlockingChannel, Channel};

/// The caller was killed while sleeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Killed;

/// Global tick counter.
pub struct TickClock {
    ticks: Mutex<u64>,
}

impl TickClock {
    /// Create a clock at tick 0.
    pub const fn new() -> Self {
        Self {
            ticks: Mutex::new(0),
        }
    }

    /// The channel sleepers park on.
    #[inline]
    pub fn channel(&self) -> Channel {
        Channel::of(self)
    }

    /// Ticks since boot.
    pub fn now(&self) -> u64 {
        *self.ticks.lock()
    }

    /// Advance by one tick and wake every sleeper.
    pub fn tick<C: BlockingChannel>(&self, channels: &C) {
        let mut ticks = self.ticks.lock();
        *ticks += 1;
        channels.wakeup(self.channel());
    }

    /// Sleep for `n` ticks.
    ///
    /// Returns [`Killed`] as soon as `killed` reports true, checked before
    /// each park.
    pub fn sleep<C, K>(&self, n: u64, channels: &C, killed: K) -> Result<(), Killed>
    where
        C: BlockingChannel,
        K: Fn() -> bool,
    {
        let mut ticks = self.ticks.lock();
        let start = *ticks;
        while *ticks - start < n {
            if killed() {
                trace!("clock: sleep interrupted at tick {}", *ticks);
                return Err(Killed);
            }
            ticks = channels.sleep(self.channel(), &self.ticks, ticks);
        }
        Ok(())
    }

    /// Wake every sleeper without advancing time.
    pub fn kick<C: BlockingChannel>(&self, channels: &C) {
        let _ticks = self.ticks.lock();
        channels.wakeup(self.channel());
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}
