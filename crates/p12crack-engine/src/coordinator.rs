//! Search coordinator
//!
//! Owns the shared outcome and the cancel token, runs each candidate source
//! as a phase on a fixed pool of scoped OS threads (plus a reporter thread
//! when a progress sink is installed), and joins everything before
//! reporting. Each run works on a child of the coordinator's token: success
//! in any worker trips the child, the other workers notice on their next
//! iteration and unwind normally, and the next run starts live again.

use p12crack_core::{AttackMode, CrackError, CrackResult, Verifier};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::outcome::{Outcome, OutcomeSlot};
use crate::progress::{ProgressCounters, ProgressFn, ProgressReporter, ProgressSample};
use crate::shard::CandidateSource;
use crate::worker::{Worker, WorkerExit};

/// Worker count for a requested value, where 0 means host parallelism.
pub fn resolve_workers(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Worker threads per phase
    pub workers: usize,
    /// Progress sampling interval
    pub report_interval: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            workers: resolve_workers(0),
            report_interval: Duration::from_secs(1),
        }
    }
}

/// Statistics for one candidate source
#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub mode: AttackMode,
    pub attempts: u64,
    /// Known up front for brute force only; `None` also means past 2^64
    pub space_size: Option<u64>,
    pub per_worker: Vec<u64>,
    pub elapsed: Duration,
    /// Final reading of the progress reporter, if one ran
    pub last_sample: Option<ProgressSample>,
}

#[derive(Debug, Clone)]
pub struct SearchReport {
    pub outcome: Outcome,
    pub phases: Vec<PhaseReport>,
    pub workers: usize,
    pub elapsed: Duration,
    /// Stopped by the cancel token without a result
    pub interrupted: bool,
}

impl SearchReport {
    pub fn attempts(&self) -> u64 {
        self.phases.iter().map(|p| p.attempts).sum()
    }
}

pub struct Coordinator {
    verifier: Arc<dyn Verifier>,
    options: SearchOptions,
    cancel: CancelToken,
    progress: Option<Arc<ProgressFn>>,
}

impl Coordinator {
    /// `verifier` must already be initialized; it is shared by every worker.
    pub fn new(verifier: Arc<dyn Verifier>, options: SearchOptions) -> CrackResult<Self> {
        if options.workers == 0 {
            return Err(CrackError::config("thread count must be at least 1"));
        }
        if options.report_interval.is_zero() {
            return Err(CrackError::config("report interval must be positive"));
        }
        Ok(Self {
            verifier,
            options,
            cancel: CancelToken::new(),
            progress: None,
        })
    }

    /// Run a progress reporter alongside the workers of every phase, handing
    /// each sample to `sink`. Without one no reporter thread is started.
    pub fn with_progress(mut self, sink: ProgressFn) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    /// Token that stops the search when cancelled (e.g. from a signal handler).
    /// Once tripped it stops every later run too.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn workers(&self) -> usize {
        self.options.workers
    }

    /// Run `sources` in order until one yields the passphrase.
    pub fn run(&self, sources: &[CandidateSource]) -> CrackResult<SearchReport> {
        let started = Instant::now();
        let outcome = Arc::new(OutcomeSlot::new());
        let mut phases = Vec::with_capacity(sources.len());

        info!(
            workers = self.options.workers,
            target = %self.verifier.describe(),
            phases = sources.len(),
            "search starting"
        );

        let run_cancel = self.cancel.child();
        for source in sources {
            if outcome.is_found() || run_cancel.is_cancelled() {
                break;
            }
            phases.push(self.run_phase(source, &outcome, &run_cancel)?);
        }

        let outcome = outcome.snapshot();
        let interrupted = !outcome.is_found() && self.cancel.is_cancelled();
        if interrupted {
            warn!("search interrupted before completion");
        }

        Ok(SearchReport {
            outcome,
            phases,
            workers: self.options.workers,
            elapsed: started.elapsed(),
            interrupted,
        })
    }

    fn run_phase(
        &self,
        source: &CandidateSource,
        outcome: &Arc<OutcomeSlot>,
        cancel: &CancelToken,
    ) -> CrackResult<PhaseReport> {
        let workers = self.options.workers;
        let mode = source.mode();
        let space_size = source.size();
        let started = Instant::now();

        info!(%mode, workers, space_size = ?space_size, "phase starting");

        let counters = ProgressCounters::new(workers);
        let stop_reporter = CancelToken::new();

        type PhaseExits = (Vec<CrackResult<WorkerExit>>, Option<ProgressSample>);
        let (exits, last_sample) = thread::scope(|s| -> CrackResult<PhaseExits> {
            let reporter = match &self.progress {
                Some(sink) => {
                    let reporter = ProgressReporter::new(
                        Arc::clone(&counters),
                        Arc::clone(outcome),
                        self.options.report_interval,
                        Arc::clone(sink),
                    );
                    let stop = &stop_reporter;
                    Some(
                        thread::Builder::new()
                            .name("reporter".into())
                            .spawn_scoped(s, move || reporter.run(stop))?,
                    )
                }
                None => None,
            };

            let spawned: CrackResult<Vec<_>> = source
                .shards(workers)
                .into_iter()
                .enumerate()
                .map(|(id, shard)| {
                    let worker = Worker::new(
                        id,
                        mode,
                        shard,
                        Arc::clone(&self.verifier),
                        Arc::clone(outcome),
                        cancel.clone(),
                        counters.handle(id),
                    );
                    thread::Builder::new()
                        .name(format!("worker-{id}"))
                        .spawn_scoped(s, move || worker.run())
                        .map_err(CrackError::from)
                })
                .collect();

            let handles = match spawned {
                Ok(handles) => handles,
                Err(e) => {
                    // already-running workers are joined by the scope
                    cancel.cancel();
                    stop_reporter.cancel();
                    return Err(e);
                }
            };

            let exits = handles
                .into_iter()
                .enumerate()
                .map(|(id, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        cancel.cancel();
                        Err(CrackError::Other(anyhow::anyhow!("worker {id} panicked")))
                    })
                })
                .collect();

            stop_reporter.cancel();
            let last_sample = reporter.and_then(|reporter| match reporter.join() {
                Ok(sample) => Some(sample),
                Err(_) => {
                    warn!("progress reporter panicked");
                    None
                }
            });
            Ok((exits, last_sample))
        })?;

        let mut found = false;
        for exit in exits {
            found |= exit? == WorkerExit::Found;
        }

        let report = PhaseReport {
            mode,
            attempts: counters.total(),
            space_size,
            per_worker: counters.per_worker(),
            elapsed: started.elapsed(),
            last_sample,
        };

        info!(
            %mode,
            attempts = report.attempts,
            elapsed_ms = report.elapsed.as_millis() as u64,
            found,
            "phase finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bruteforce::{BruteForceSpace, LengthRange};
    use crate::charset::Charset;

    struct Phrase(&'static str);

    impl Verifier for Phrase {
        fn verify(&self, candidate: &str) -> CrackResult<bool> {
            Ok(candidate == self.0)
        }
    }

    fn brute(alphabet: &str, min: usize, max: usize) -> CandidateSource {
        CandidateSource::BruteForce(BruteForceSpace::new(
            Charset::from_literal(alphabet).unwrap(),
            LengthRange::new(min, max).unwrap(),
        ))
    }

    fn options(workers: usize) -> SearchOptions {
        SearchOptions {
            workers,
            report_interval: Duration::from_millis(10),
        }
    }

    #[test]
    fn resolve_workers_defaults_to_parallelism() {
        assert_eq!(resolve_workers(3), 3);
        assert!(resolve_workers(0) >= 1);
    }

    #[test]
    fn zero_workers_is_a_config_error() {
        let err = Coordinator::new(Arc::new(Phrase("x")), options(0)).err().unwrap();
        assert!(matches!(err, CrackError::Config(_)));
    }

    #[test]
    fn finds_in_brute_force() {
        let coordinator = Coordinator::new(Arc::new(Phrase("cab")), options(4)).unwrap();
        let report = coordinator.run(&[brute("abc", 1, 3)]).unwrap();

        assert_eq!(report.outcome.password(), Some("cab"));
        assert!(!report.interrupted);
        assert_eq!(report.phases.len(), 1);
        assert_eq!(report.phases[0].space_size, Some(39));
    }

    #[test]
    fn exhaustion_counts_every_candidate() {
        let coordinator = Coordinator::new(Arc::new(Phrase("zzz")), options(3)).unwrap();
        let report = coordinator.run(&[brute("abc", 1, 3)]).unwrap();

        assert_eq!(report.outcome, Outcome::NotFound);
        assert!(!report.interrupted);
        assert_eq!(report.attempts(), 39);
        assert_eq!(report.phases[0].per_worker.iter().sum::<u64>(), 39);
    }

    #[test]
    fn later_phases_are_skipped_after_success() {
        let coordinator = Coordinator::new(Arc::new(Phrase("b")), options(2)).unwrap();
        let report = coordinator
            .run(&[brute("ab", 1, 1), brute("xyz", 1, 4)])
            .unwrap();

        assert_eq!(report.outcome.password(), Some("b"));
        assert_eq!(report.phases.len(), 1);
    }

    #[test]
    fn pre_cancelled_search_is_interrupted() {
        let coordinator = Coordinator::new(Arc::new(Phrase("b")), options(2)).unwrap();
        coordinator.cancel_token().cancel();
        let report = coordinator.run(&[brute("ab", 1, 3)]).unwrap();

        assert!(report.interrupted);
        assert!(report.phases.is_empty());
        assert_eq!(report.outcome, Outcome::NotFound);
    }

    #[test]
    fn progress_sink_sees_final_total() {
        use std::sync::atomic::{AtomicU64, Ordering};

        let seen = Arc::new(AtomicU64::new(0));
        let sink_seen = Arc::clone(&seen);
        let coordinator = Coordinator::new(Arc::new(Phrase("none")), options(2))
            .unwrap()
            .with_progress(Box::new(move |s: &ProgressSample| {
                sink_seen.store(s.total, Ordering::SeqCst)
            }));

        let report = coordinator.run(&[brute("ab", 1, 4)]).unwrap();
        assert_eq!(report.attempts(), 30);
        assert_eq!(seen.load(Ordering::SeqCst), 30);
        assert_eq!(report.phases[0].last_sample.map(|s| s.total), Some(30));
    }

    #[test]
    fn no_reporter_without_progress_sink() {
        let coordinator = Coordinator::new(Arc::new(Phrase("none")), options(2)).unwrap();
        let report = coordinator.run(&[brute("ab", 1, 3)]).unwrap();
        assert_eq!(report.attempts(), 14);
        assert!(report.phases[0].last_sample.is_none());
    }

    #[test]
    fn coordinator_can_be_reused_after_a_hit() {
        let coordinator = Coordinator::new(Arc::new(Phrase("ba")), options(3)).unwrap();
        let first = coordinator.run(&[brute("ab", 1, 2)]).unwrap();
        assert_eq!(first.outcome.password(), Some("ba"));

        let second = coordinator.run(&[brute("ab", 1, 2)]).unwrap();
        assert!(!second.interrupted);
        assert_eq!(second.outcome.password(), Some("ba"));
        assert!(!coordinator.cancel_token().is_cancelled());
    }

    #[test]
    fn external_cancel_stops_later_runs() {
        let coordinator = Coordinator::new(Arc::new(Phrase("ba")), options(2)).unwrap();
        assert!(coordinator.run(&[brute("ab", 1, 2)]).unwrap().outcome.is_found());

        coordinator.cancel_token().cancel();
        let report = coordinator.run(&[brute("ab", 1, 2)]).unwrap();
        assert!(report.interrupted);
        assert!(report.phases.is_empty());
    }
}
