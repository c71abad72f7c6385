use std::fmt;

use crate::error::CrackResult;

/// A container handle that can test one candidate passphrase.
///
/// Implementations are initialized once, before any worker starts, and are
/// then shared read-only across all workers. `Ok(false)` means the candidate
/// is wrong; `Err` is a fault in the handle or library and ends the run.
pub trait Verifier: Send + Sync {
    fn verify(&self, candidate: &str) -> CrackResult<bool>;

    /// Short human-readable description of the target, used in logs.
    fn describe(&self) -> String {
        "container".into()
    }
}

/// Which candidate source a search phase draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackMode {
    Dictionary,
    BruteForce,
}

impl fmt::Display for AttackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackMode::Dictionary => f.write_str("Dictionary attack"),
            AttackMode::BruteForce => f.write_str("Brute force attack"),
        }
    }
}
