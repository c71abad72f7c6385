//! Per-worker attempt counters and the throughput reporter
//!
//! Each worker is the only writer of its own counter; the reporter only
//! reads. Counters are padded to a cache line so the hot increment never
//! contends with a neighbour's.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::outcome::OutcomeSlot;

#[derive(Default)]
#[repr(align(64))]
struct PaddedCounter(AtomicU64);

/// One attempt counter per worker plus the number of workers still running
pub struct ProgressCounters {
    counters: Box<[PaddedCounter]>,
    active: AtomicUsize,
}

impl ProgressCounters {
    /// Zeroed counters for `workers` workers, all counted as active.
    pub fn new(workers: usize) -> Arc<Self> {
        Arc::new(Self {
            counters: (0..workers).map(|_| PaddedCounter::default()).collect(),
            active: AtomicUsize::new(workers),
        })
    }

    /// The write handle for `worker`. Hand out exactly one per worker.
    pub fn handle(self: &Arc<Self>, worker: usize) -> WorkerCounter {
        assert!(worker < self.counters.len(), "worker {worker} has no counter");
        WorkerCounter {
            counters: Arc::clone(self),
            index: worker,
        }
    }

    pub fn total(&self) -> u64 {
        self.counters
            .iter()
            .map(|c| c.0.load(Ordering::Relaxed))
            .sum()
    }

    pub fn per_worker(&self) -> Vec<u64> {
        self.counters
            .iter()
            .map(|c| c.0.load(Ordering::Relaxed))
            .collect()
    }

    /// Workers whose counter handle is still alive
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

/// A worker's exclusive write handle; dropping it marks the worker finished.
pub struct WorkerCounter {
    counters: Arc<ProgressCounters>,
    index: usize,
}

impl WorkerCounter {
    #[inline]
    pub fn increment(&self) {
        self.counters.counters[self.index]
            .0
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.counters.counters[self.index].0.load(Ordering::Relaxed)
    }
}

impl Drop for WorkerCounter {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::Release);
    }
}

/// One throughput reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    /// Attempts so far across all workers
    pub total: u64,
    /// Attempts since the previous sample
    pub delta: u64,
    pub per_second: f64,
    pub elapsed: Duration,
}

/// Progress callback invoked with every sample
pub type ProgressFn = Box<dyn Fn(&ProgressSample) + Send + Sync>;

/// Samples the counters on a fixed interval and hands each reading to a
/// callback. Never writes shared state and never blocks a worker.
pub struct ProgressReporter {
    counters: Arc<ProgressCounters>,
    outcome: Arc<OutcomeSlot>,
    interval: Duration,
    sink: Arc<ProgressFn>,
}

impl ProgressReporter {
    pub fn new(
        counters: Arc<ProgressCounters>,
        outcome: Arc<OutcomeSlot>,
        interval: Duration,
        sink: Arc<ProgressFn>,
    ) -> Self {
        Self {
            counters,
            outcome,
            interval,
            sink,
        }
    }

    /// Sample until `stop` trips, the outcome is found, or a zero-delta
    /// sample arrives with no worker left running. Returns the last sample.
    pub fn run(&self, stop: &CancelToken) -> ProgressSample {
        let start = Instant::now();
        let mut last_total = 0u64;
        let mut last_at = start;

        loop {
            let stopped = stop.wait_timeout(self.interval);
            let now = Instant::now();
            // read before the totals so a finished worker's last attempts are included
            let active = self.counters.active();
            let total = self.counters.total();
            let delta = total.saturating_sub(last_total);
            let secs = now.duration_since(last_at).as_secs_f64();

            let sample = ProgressSample {
                total,
                delta,
                per_second: if secs > 0.0 { delta as f64 / secs } else { 0.0 },
                elapsed: now.duration_since(start),
            };

            if delta != 0 || stopped {
                debug!(total, delta, per_second = sample.per_second as u64, "progress");
                (self.sink)(&sample);
            }

            last_total = total;
            last_at = now;

            if stopped || self.outcome.is_found() {
                return sample;
            }
            if delta == 0 && active == 0 {
                return sample;
            }
        }
    }
}
