//! Fixed interval gate for driving [`CommandDispatcher::tick`](crate::dispatcher::CommandDispatcher::tick).
//!
//! The caller owns the clock. This keeps the scheduler usable from a desktop
//! event loop and from a bare metal timer alike.

use fugit::{MillisDurationU32, MillisDurationU64};

/// Millisecond timestamp supplied by the caller's clock.
pub type Instant = fugit::TimerInstantU64<1000>;

#[derive(Debug, Clone, Copy)]
pub struct TickScheduler {
    interval: MillisDurationU64,
    last: Option<Instant>,
}

impl TickScheduler {
    pub fn new(interval: MillisDurationU32) -> Self {
        Self {
            interval: MillisDurationU64::from_ticks(u64::from(interval.ticks())),
            last: None,
        }
    }

    /// Whether a tick should run at `now`. The first call always says yes.
    ///
    /// A clock that goes backwards holds ticks off until it catches up again.
    pub fn due(&mut self, now: Instant) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now
                .checked_duration_since(last)
                .is_some_and(|elapsed| elapsed >= self.interval),
        };
        if due {
            self.last = Some(now);
        }
        due
    }

    /// Time left until the next tick is due, zero if it already is.
    pub fn remaining(&self, now: Instant) -> MillisDurationU64 {
        let Some(last) = self.last else {
            return MillisDurationU64::from_ticks(0);
        };
        let elapsed = now
            .checked_duration_since(last)
            .unwrap_or(MillisDurationU64::from_ticks(0));
        self.interval
            .checked_sub(elapsed)
            .unwrap_or(MillisDurationU64::from_ticks(0))
    }
}
