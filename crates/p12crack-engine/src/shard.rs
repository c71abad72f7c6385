//! Candidate sources and their per-worker shards

use p12crack_core::{AttackMode, CrackResult};
use std::path::Path;
use std::sync::Arc;

use crate::bruteforce::{BruteForceShard, BruteForceSpace};
use crate::dictionary::{decode_line, trim_line, DictionaryCursor};

/// The space a search phase enumerates
#[derive(Debug, Clone)]
pub enum CandidateSource {
    Dictionary(Arc<DictionaryCursor>),
    BruteForce(BruteForceSpace),
}

impl CandidateSource {
    /// Open a word list. Fails with `DictionaryNotFound` before any worker starts.
    pub fn dictionary(path: &Path) -> CrackResult<Self> {
        Ok(CandidateSource::Dictionary(Arc::new(DictionaryCursor::open(
            path,
        )?)))
    }

    pub fn mode(&self) -> AttackMode {
        match self {
            CandidateSource::Dictionary(_) => AttackMode::Dictionary,
            CandidateSource::BruteForce(_) => AttackMode::BruteForce,
        }
    }

    /// Number of candidates, when known up front.
    pub fn size(&self) -> Option<u64> {
        match self {
            CandidateSource::Dictionary(_) => None,
            CandidateSource::BruteForce(space) => space.size(),
        }
    }

    /// Split into `workers` disjoint shards that together cover the source.
    pub fn shards(&self, workers: usize) -> Vec<Shard> {
        (0..workers)
            .map(|w| match self {
                CandidateSource::Dictionary(cursor) => Shard::Dictionary {
                    cursor: Arc::clone(cursor),
                    raw: Vec::new(),
                },
                CandidateSource::BruteForce(space) => Shard::BruteForce(space.shard(w, workers)),
            })
            .collect()
    }
}

/// The slice of a source one worker consumes
#[derive(Debug)]
pub enum Shard {
    BruteForce(BruteForceShard),
    /// Shared cursor plus this worker's private line buffer
    Dictionary {
        cursor: Arc<DictionaryCursor>,
        raw: Vec<u8>,
    },
}

impl Shard {
    /// Write the next candidate into `buf`; false once the shard is exhausted.
    pub fn next_candidate(&mut self, buf: &mut String) -> CrackResult<bool> {
        match self {
            Shard::BruteForce(shard) => Ok(shard.next_into(buf)),
            Shard::Dictionary { cursor, raw } => {
                if !cursor.read_line(raw)? {
                    return Ok(false);
                }
                decode_line(trim_line(raw), buf);
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bruteforce::LengthRange;
    use crate::charset::Charset;
    use std::collections::HashSet;
    use std::io::Cursor;

    fn drain(shard: &mut Shard) -> Vec<String> {
        let mut buf = String::new();
        let mut out = Vec::new();
        while shard.next_candidate(&mut buf).unwrap() {
            out.push(buf.clone());
        }
        out
    }

    #[test]
    fn brute_force_shards_cover_space() {
        let source = CandidateSource::BruteForce(BruteForceSpace::new(
            Charset::from_literal("ab").unwrap(),
            LengthRange::new(1, 2).unwrap(),
        ));
        assert_eq!(source.mode(), AttackMode::BruteForce);
        assert_eq!(source.size(), Some(6));

        let all: Vec<String> = source.shards(3).iter_mut().flat_map(drain).collect();
        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(all.len(), 6);
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn dictionary_shards_share_one_cursor() {
        let cursor = DictionaryCursor::from_reader(Cursor::new(b"a\nb\nc\nd\n".to_vec()));
        let source = CandidateSource::Dictionary(Arc::new(cursor));
        assert_eq!(source.mode(), AttackMode::Dictionary);
        assert_eq!(source.size(), None);

        let mut shards = source.shards(2);
        let mut buf = String::new();
        assert!(shards[0].next_candidate(&mut buf).unwrap());
        assert_eq!(buf, "a");
        assert!(shards[1].next_candidate(&mut buf).unwrap());
        assert_eq!(buf, "b");

        let rest: Vec<String> = shards.iter_mut().flat_map(drain).collect();
        assert_eq!(rest, ["c", "d"]);
    }
}
