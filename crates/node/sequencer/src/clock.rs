//! Slot timing.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Paces the sequencer loop.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SlotClock: Send {
    /// Resolves when the next slot starts.
    async fn wait_for_next_slot(&mut self);
}

/// A [`SlotClock`] with slots of a fixed duration, the first one starting one slot from now.
///
/// A slot that starts while the previous iteration is still running is delayed rather than
/// skipped.
#[derive(Debug)]
pub struct IntervalSlotClock {
    interval: Interval,
}

impl IntervalSlotClock {
    /// Creates a clock ticking every `slot_duration`. Durations below one millisecond are
    /// rounded up.
    pub fn new(slot_duration: Duration) -> Self {
        let period = slot_duration.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// The slot duration.
    pub fn slot_duration(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl SlotClock for IntervalSlotClock {
    async fn wait_for_next_slot(&mut self) {
        self.interval.tick().await;
    }
}
