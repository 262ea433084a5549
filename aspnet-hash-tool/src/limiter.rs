use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};

/// Spaces admissions evenly at a fixed number of lines per second.
///
/// There is no burst allowance: after an idle period the next slot is granted
/// immediately and the ones after it are spaced again.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Option<Interval>,
}

impl RateLimiter {
    /// `per_second == 0` disables limiting.
    pub fn new(per_second: u32) -> Self {
        if per_second == 0 {
            return Self::unlimited();
        }

        let period = Duration::from_nanos(1_000_000_000 / u64::from(per_second))
            .max(Duration::from_nanos(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval: Some(interval) }
    }

    pub fn unlimited() -> Self {
        Self { interval: None }
    }

    pub fn is_limited(&self) -> bool {
        self.interval.is_some()
    }

    /// Waits for the next slot.
    pub async fn take(&mut self) {
        if let Some(interval) = self.interval.as_mut() {
            interval.tick().await;
        }
    }
}
