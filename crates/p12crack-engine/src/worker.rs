//! A single search worker
//!
//! Lifecycle: the verifier handle is shared in ready-to-use form (the
//! coordinator initializes it once before spawning), then the worker loops
//! over its shard until it finds the passphrase, sees that another worker
//! did, is cancelled, or runs out of candidates.

use p12crack_core::{AttackMode, CrackResult, Verifier};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::outcome::{Found, OutcomeSlot};
use crate::progress::WorkerCounter;
use crate::shard::Shard;

/// How a worker left its run loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// This worker claimed the outcome
    Found,
    /// Another worker had already found the passphrase
    Observed,
    /// Stopped by the cancel token before the shard ran out
    Cancelled,
    /// Whole shard tried, no match
    Exhausted,
}

pub struct Worker {
    id: usize,
    mode: AttackMode,
    shard: Shard,
    verifier: Arc<dyn Verifier>,
    outcome: Arc<OutcomeSlot>,
    cancel: CancelToken,
    counter: WorkerCounter,
}

impl Worker {
    pub fn new(
        id: usize,
        mode: AttackMode,
        shard: Shard,
        verifier: Arc<dyn Verifier>,
        outcome: Arc<OutcomeSlot>,
        cancel: CancelToken,
        counter: WorkerCounter,
    ) -> Self {
        Self {
            id,
            mode,
            shard,
            verifier,
            outcome,
            cancel,
            counter,
        }
    }

    /// Drive the shard to completion. A verifier or I/O error cancels every
    /// other worker before it is returned.
    pub fn run(mut self) -> CrackResult<WorkerExit> {
        let result = self.drive();
        match &result {
            Ok(exit) => {
                debug!(worker = self.id, ?exit, attempts = self.counter.get(), "worker done")
            }
            Err(e) => {
                self.cancel.cancel();
                debug!(worker = self.id, error = %e, "worker failed");
            }
        }
        result
    }

    fn drive(&mut self) -> CrackResult<WorkerExit> {
        let mut candidate = String::new();

        loop {
            if self.outcome.is_found() {
                return Ok(WorkerExit::Observed);
            }
            if self.cancel.is_cancelled() {
                return Ok(WorkerExit::Cancelled);
            }
            if !self.shard.next_candidate(&mut candidate)? {
                return Ok(WorkerExit::Exhausted);
            }

            let matched = self.verifier.verify(&candidate)?;
            self.counter.increment();

            if matched {
                let won = self.outcome.claim(Found {
                    candidate: std::mem::take(&mut candidate),
                    worker: self.id,
                    mode: self.mode,
                });
                if !won {
                    return Ok(WorkerExit::Observed);
                }
                self.cancel.cancel();
                info!(worker = self.id, mode = %self.mode, "password found");
                return Ok(WorkerExit::Found);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bruteforce::{BruteForceSpace, LengthRange};
    use crate::charset::Charset;
    use crate::progress::ProgressCounters;
    use crate::shard::CandidateSource;
    use p12crack_core::CrackError;

    struct Phrase(&'static str);

    impl Verifier for Phrase {
        fn verify(&self, candidate: &str) -> CrackResult<bool> {
            Ok(candidate == self.0)
        }
    }

    struct Broken;

    impl Verifier for Broken {
        fn verify(&self, _: &str) -> CrackResult<bool> {
            Err(CrackError::Verifier("handle corrupted".into()))
        }
    }

    fn single_worker(
        verifier: Arc<dyn Verifier>,
    ) -> (Worker, Arc<OutcomeSlot>, CancelToken, Arc<ProgressCounters>) {
        let source = CandidateSource::BruteForce(BruteForceSpace::new(
            Charset::from_literal("ab").unwrap(),
            LengthRange::new(1, 2).unwrap(),
        ));
        let shard = source.shards(1).pop().unwrap();
        let outcome = Arc::new(OutcomeSlot::new());
        let cancel = CancelToken::new();
        let counters = ProgressCounters::new(1);
        let worker = Worker::new(
            0,
            AttackMode::BruteForce,
            shard,
            verifier,
            Arc::clone(&outcome),
            cancel.clone(),
            counters.handle(0),
        );
        (worker, outcome, cancel, counters)
    }

    #[test]
    fn finds_and_claims() {
        let (worker, outcome, cancel, counters) = single_worker(Arc::new(Phrase("ba")));
        assert_eq!(worker.run().unwrap(), WorkerExit::Found);
        assert_eq!(outcome.snapshot().password(), Some("ba"));
        assert!(cancel.is_cancelled());
        // a, b, aa, ab, ba
        assert_eq!(counters.total(), 5);
    }

    #[test]
    fn exhausts_without_match() {
        let (worker, outcome, _, counters) = single_worker(Arc::new(Phrase("zz")));
        assert_eq!(worker.run().unwrap(), WorkerExit::Exhausted);
        assert!(!outcome.is_found());
        assert_eq!(counters.total(), 6);
        assert_eq!(counters.active(), 0);
    }

    #[test]
    fn observes_an_existing_outcome() {
        let (worker, outcome, _, counters) = single_worker(Arc::new(Phrase("ba")));
        outcome.claim(Found {
            candidate: "elsewhere".into(),
            worker: 7,
            mode: AttackMode::BruteForce,
        });
        assert_eq!(worker.run().unwrap(), WorkerExit::Observed);
        assert_eq!(counters.total(), 0);
        assert_eq!(outcome.get().unwrap().worker, 7);
    }

    #[test]
    fn honours_cancellation() {
        let (worker, _, cancel, counters) = single_worker(Arc::new(Phrase("ba")));
        cancel.cancel();
        assert_eq!(worker.run().unwrap(), WorkerExit::Cancelled);
        assert_eq!(counters.total(), 0);
    }

    #[test]
    fn verifier_error_is_fatal_and_cancels() {
        let (worker, _, cancel, _) = single_worker(Arc::new(Broken));
        let err = worker.run().unwrap_err();
        assert!(matches!(err, CrackError::Verifier(_)));
        assert!(cancel.is_cancelled());
    }
}
