//! Brute-force candidate space
//!
//! The space is the ordered union, for each length `L` in the range, of all
//! `L`-symbol strings over the charset in base-`k` order. Worker `w` of `N`
//! owns every string whose first symbol sits at a charset position `p` with
//! `p % N == w`; within one first symbol it walks every suffix with an
//! odometer, so each string in the space is produced by exactly one worker,
//! exactly once, with no coordination after the split.

use p12crack_core::config::{MAX_WORD_LENGTH, MIN_WORD_LENGTH};
use p12crack_core::{CrackError, CrackResult};
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::charset::Charset;

/// Inclusive password length bounds, `1 <= min <= max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthRange {
    min: usize,
    max: usize,
}

impl LengthRange {
    pub fn new(min: usize, max: usize) -> CrackResult<Self> {
        if min < MIN_WORD_LENGTH || max < MIN_WORD_LENGTH {
            return Err(CrackError::config(format!(
                "password lengths must be at least {MIN_WORD_LENGTH}"
            )));
        }
        if min > max {
            return Err(CrackError::config(format!(
                "min length ({min}) is greater than max length ({max})"
            )));
        }
        Ok(Self { min, max })
    }

    /// Combine explicit bounds with defaults.
    ///
    /// A zero bound is rejected and bounds past `MAX_WORD_LENGTH` are clamped.
    /// When the result would be inverted, a lone explicit bound drags the
    /// default one along with it; two explicit bounds are an error.
    pub fn normalize(
        min: Option<usize>,
        max: Option<usize>,
        default_min: usize,
        default_max: usize,
    ) -> CrackResult<Self> {
        if min == Some(0) || max == Some(0) {
            return Err(CrackError::config("password lengths must be positive"));
        }

        let clamp = |len: usize| {
            if len > MAX_WORD_LENGTH {
                tracing::warn!(requested = len, "forcing length to {MAX_WORD_LENGTH}");
                MAX_WORD_LENGTH
            } else {
                len
            }
        };

        let mut lo = clamp(min.unwrap_or(default_min).max(MIN_WORD_LENGTH));
        let mut hi = clamp(max.unwrap_or(default_max).max(MIN_WORD_LENGTH));

        if lo > hi {
            match (min, max) {
                (Some(_), None) => hi = lo,
                (None, Some(_)) => lo = hi,
                _ => return Self::new(lo, hi),
            }
        }
        Self::new(lo, hi)
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn lengths(&self) -> RangeInclusive<usize> {
        self.min..=self.max
    }
}

/// `base^exp` in u64, `None` on overflow
fn checked_power(base: usize, exp: usize) -> Option<u64> {
    let exp = u32::try_from(exp).ok()?;
    (base as u64).checked_pow(exp)
}

/// All strings over a charset within a length range
#[derive(Debug, Clone)]
pub struct BruteForceSpace {
    charset: Arc<Charset>,
    lengths: LengthRange,
}

impl BruteForceSpace {
    pub fn new(charset: Charset, lengths: LengthRange) -> Self {
        Self {
            charset: Arc::new(charset),
            lengths,
        }
    }

    pub fn charset(&self) -> &Charset {
        &self.charset
    }

    pub fn lengths(&self) -> LengthRange {
        self.lengths
    }

    /// Number of candidates of exactly `len` symbols.
    pub fn size_of_length(&self, len: usize) -> Option<u64> {
        checked_power(self.charset.len(), len)
    }

    /// Total number of candidates, `None` past 2^64.
    pub fn size(&self) -> Option<u64> {
        self.lengths
            .lengths()
            .try_fold(0u64, |acc, len| acc.checked_add(self.size_of_length(len)?))
    }

    /// Number of candidates owned by worker `worker` of `workers`.
    pub fn shard_size(&self, worker: usize, workers: usize) -> Option<u64> {
        let k = self.charset.len();
        let firsts = if worker < k {
            ((k - 1 - worker) / workers + 1) as u64
        } else {
            0
        };
        self.lengths.lengths().try_fold(0u64, |acc, len| {
            let suffixes = checked_power(k, len - 1)?;
            acc.checked_add(firsts.checked_mul(suffixes)?)
        })
    }

    /// The candidate at global position `index`, counting shorter lengths
    /// first and base-`k` order within a length.
    pub fn candidate_at(&self, mut index: u64) -> Option<String> {
        let k = self.charset.len() as u64;

        for len in self.lengths.lengths() {
            match self.size_of_length(len) {
                Some(count) if index >= count => index -= count,
                _ => {
                    let mut digits = vec![0usize; len];
                    for slot in digits.iter_mut().rev() {
                        *slot = (index % k) as usize;
                        index /= k;
                    }
                    return Some(digits.iter().map(|&d| self.charset.symbol(d)).collect());
                }
            }
        }
        None
    }

    /// The shard for worker `worker` of `workers` (`workers >= 1`).
    pub fn shard(&self, worker: usize, workers: usize) -> BruteForceShard {
        BruteForceShard::new(Arc::clone(&self.charset), self.lengths, worker, workers)
    }
}

/// One worker's residue class of the space, walked lexicographically.
///
/// Holds an odometer of charset positions: `digits[0]` steps by the worker
/// count, the remaining digits roll over in base `k`.
#[derive(Debug)]
pub struct BruteForceShard {
    charset: Arc<Charset>,
    stride: usize,
    first: usize,
    max_len: usize,
    digits: Vec<usize>,
    fresh: bool,
    exhausted: bool,
}

impl BruteForceShard {
    fn new(charset: Arc<Charset>, lengths: LengthRange, worker: usize, workers: usize) -> Self {
        let workers = workers.max(1);
        let exhausted = worker >= charset.len();
        let mut digits = vec![0; lengths.min()];
        digits[0] = worker;

        Self {
            charset,
            stride: workers,
            first: worker,
            max_len: lengths.max(),
            digits,
            fresh: true,
            exhausted,
        }
    }

    /// Step the odometer; returns false once the shard is used up.
    fn advance(&mut self) -> bool {
        let k = self.charset.len();

        for pos in (1..self.digits.len()).rev() {
            self.digits[pos] += 1;
            if self.digits[pos] < k {
                return true;
            }
            self.digits[pos] = 0;
        }

        self.digits[0] += self.stride;
        if self.digits[0] < k {
            return true;
        }

        let next_len = self.digits.len() + 1;
        if next_len > self.max_len {
            return false;
        }
        self.digits.clear();
        self.digits.resize(next_len, 0);
        self.digits[0] = self.first;
        true
    }

    /// Write the next candidate into `buf`. Returns false when exhausted.
    pub fn next_into(&mut self, buf: &mut String) -> bool {
        if self.exhausted {
            return false;
        }
        if self.fresh {
            self.fresh = false;
        } else if !self.advance() {
            self.exhausted = true;
            return false;
        }

        buf.clear();
        buf.extend(self.digits.iter().map(|&d| self.charset.symbol(d)));
        true
    }
}

impl Iterator for BruteForceShard {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut buf = String::new();
        self.next_into(&mut buf).then_some(buf)
    }
}
