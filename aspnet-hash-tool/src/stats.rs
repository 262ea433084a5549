use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Shared per-run counters, bumped from every worker.
#[derive(Debug)]
pub struct RunStatistics {
    processed: AtomicU64,
    errored: AtomicU64,
    started: Instant,
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStatistics {
    pub fn new() -> Self {
        Self { processed: AtomicU64::new(0), errored: AtomicU64::new(0), started: Instant::now() }
    }

    #[inline]
    pub fn record_success(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.errored.fetch_add(1, Ordering::Relaxed);
    }

    /// Lines finished so far, either way. Only approximate while workers run.
    pub fn completed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed) + self.errored.load(Ordering::Relaxed)
    }

    /// Snapshot of the counters. Exact once every worker has been joined.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            processed: self.processed.load(Ordering::Relaxed),
            errored: self.errored.load(Ordering::Relaxed),
            elapsed: self.started.elapsed(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: u64,
    pub errored: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Successful lines per second, `None` when no time has passed.
    pub fn per_second(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (secs > 0.0).then(|| self.processed as f64 / secs)
    }
}
