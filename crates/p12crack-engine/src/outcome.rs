//! The write-once search result

use p12crack_core::AttackMode;
use std::sync::OnceLock;

/// A recovered passphrase and who found it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub candidate: String,
    pub worker: usize,
    pub mode: AttackMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NotFound,
    Found(Found),
}

impl Outcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }

    pub fn password(&self) -> Option<&str> {
        match self {
            Outcome::Found(found) => Some(&found.candidate),
            Outcome::NotFound => None,
        }
    }
}

/// Shared slot for the outcome: the first claim wins, later claims are
/// dropped, and every reader sees the winner once it is set.
#[derive(Debug, Default)]
pub struct OutcomeSlot {
    slot: OnceLock<Found>,
}

impl OutcomeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to record `found`. Returns true if this call won.
    pub fn claim(&self, found: Found) -> bool {
        self.slot.set(found).is_ok()
    }

    #[inline]
    pub fn is_found(&self) -> bool {
        self.slot.get().is_some()
    }

    pub fn get(&self) -> Option<&Found> {
        self.slot.get()
    }

    pub fn snapshot(&self) -> Outcome {
        match self.slot.get() {
            Some(found) => Outcome::Found(found.clone()),
            None => Outcome::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn found(candidate: &str, worker: usize) -> Found {
        Found {
            candidate: candidate.into(),
            worker,
            mode: AttackMode::Dictionary,
        }
    }

    #[test]
    fn empty_slot_is_not_found() {
        let slot = OutcomeSlot::new();
        assert!(!slot.is_found());
        assert_eq!(slot.snapshot(), Outcome::NotFound);
        assert_eq!(slot.snapshot().password(), None);
    }

    #[test]
    fn first_claim_wins() {
        let slot = OutcomeSlot::new();
        assert!(slot.claim(found("first", 0)));
        assert!(!slot.claim(found("second", 1)));
        assert_eq!(slot.snapshot().password(), Some("first"));
        assert_eq!(slot.get().unwrap().worker, 0);
    }

    #[test]
    fn concurrent_claims_have_exactly_one_winner() {
        let slot = Arc::new(OutcomeSlot::new());
        let handles: Vec<_> = (0..8)
            .map(|w| {
                let slot = Arc::clone(&slot);
                thread::spawn(move || slot.claim(found("hunter2", w)))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(slot.is_found());
    }
}
