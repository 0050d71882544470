use std::{future::Future, time::Duration};

use tokio::time::{Instant, Interval, MissedTickBehavior};

// Source of the control loop scheduling
pub trait Ticker {
    // Wait for the next scheduled tick and return its deadline
    fn tick(&mut self) -> impl Future<Output = Instant> + Send;
}

/// Fixed period ticker on the tokio monotonic clock.
///
/// Deadlines are `start + k * period`, so time spent handling a tick
/// does not push the following ones back. Ticks missed because a cycle
/// overran are skipped instead of fired in a burst.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self::starting_at(Instant::now(), period)
    }

    pub fn starting_at(start: Instant, period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}
