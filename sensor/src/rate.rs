use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

use crate::{Channel, ChannelIntervals, IntervalHandle, RateMode};

/// Authoritative idle/boost state of one channel.
///
/// Either channel's results may call [`boost`](Self::boost) or
/// [`idle`](Self::idle) concurrently. The mode check and the reschedule
/// happen under one lock so racing calls can't leave the loop on a stale
/// period.
#[derive(Debug)]
pub struct RateController {
    channel: Channel,
    intervals: ChannelIntervals,
    mode: Mutex<RateMode>,
    target: IntervalHandle,
}

impl RateController {
    /// Controller starting in [`RateMode::Idle`]; the target is set to the
    /// idle period immediately.
    pub fn new(channel: Channel, intervals: ChannelIntervals, target: IntervalHandle) -> Self {
        target.set(intervals.idle());
        Self {
            channel,
            intervals,
            mode: Mutex::new(RateMode::Idle),
            target,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn mode(&self) -> RateMode {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Period the owning channel is scheduled at.
    pub fn interval(&self) -> Duration {
        self.target.get()
    }

    /// Switch to the boosted period. Returns `false` if already boosted.
    pub fn boost(&self) -> bool {
        self.transition(RateMode::Boosted)
    }

    /// Switch to the idle period. Returns `false` if already idle.
    pub fn idle(&self) -> bool {
        self.transition(RateMode::Idle)
    }

    fn transition(&self, next: RateMode) -> bool {
        let mut mode = self.mode.lock().unwrap_or_else(PoisonError::into_inner);
        if *mode == next {
            return false;
        }
        *mode = next;
        let interval = self.intervals.for_mode(next);
        self.target.set(interval);
        debug!(channel = %self.channel, ?next, ?interval, "rate changed");
        true
    }
}
