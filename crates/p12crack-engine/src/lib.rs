//! p12crack-engine: candidate generation and the parallel search
//!
//! # Overview
//! - `charset`: class tokens (`a`, `A`, `n`, `s`, `x`) → deduplicated alphabet
//! - `bruteforce`: length ranges, the combinatorial space, and per-worker odometers
//! - `dictionary`: a shared, mutex-guarded line cursor over a word list
//! - `shard`: the two candidate sources and their split across workers
//! - `worker`: one thread driving one shard through the verifier
//! - `progress`: per-worker counters and the throughput reporter
//! - `coordinator`: spawns the pool, owns the outcome, reports the result
//!
//! Partitioning is static: brute-force shards are residue classes over the
//! first symbol position, so workers never synchronise while generating.
//! The dictionary cannot be split up front and is shared behind a lock held
//! only for a single line read.

pub mod bruteforce;
pub mod cancel;
pub mod charset;
pub mod coordinator;
pub mod dictionary;
pub mod outcome;
pub mod progress;
pub mod shard;
pub mod worker;

pub use bruteforce::{BruteForceShard, BruteForceSpace, LengthRange};
pub use cancel::CancelToken;
pub use charset::Charset;
pub use coordinator::{resolve_workers, Coordinator, PhaseReport, SearchOptions, SearchReport};
pub use dictionary::DictionaryCursor;
pub use outcome::{Found, Outcome, OutcomeSlot};
pub use progress::{ProgressCounters, ProgressFn, ProgressReporter, ProgressSample};
pub use shard::{CandidateSource, Shard};
pub use worker::{Worker, WorkerExit};
