//! Dictionary candidate source
//!
//! A word list cannot be split by length up front without buffering it, so
//! every worker reads from one shared cursor. The lock covers a single line
//! read; trimming, decoding, and verification all happen outside it.

use p12crack_core::{CrackError, CrackResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Shared read position in a word list
pub struct DictionaryCursor {
    reader: Mutex<Box<dyn BufRead + Send>>,
    source: PathBuf,
}

impl DictionaryCursor {
    pub fn open(path: &Path) -> CrackResult<Self> {
        let file = File::open(path).map_err(|source| CrackError::DictionaryNotFound {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            reader: Mutex::new(Box::new(BufReader::new(file))),
            source: path.to_path_buf(),
        })
    }

    /// Wrap an arbitrary reader, e.g. an in-memory word list.
    pub fn from_reader(reader: impl BufRead + Send + 'static) -> Self {
        Self {
            reader: Mutex::new(Box::new(reader)),
            source: PathBuf::from("<reader>"),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Read the next raw line (terminator included) into `raw`.
    /// Returns false at end of file.
    pub fn read_line(&self, raw: &mut Vec<u8>) -> CrackResult<bool> {
        raw.clear();
        let mut reader = self
            .reader
            .lock()
            .map_err(|_| CrackError::Other(anyhow::anyhow!("dictionary cursor poisoned")))?;
        let n = reader.read_until(b'\n', raw)?;
        Ok(n > 0)
    }
}

impl std::fmt::Debug for DictionaryCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryCursor")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Strip a trailing `\n`, and the `\r` immediately before it if present.
pub fn trim_line(line: &[u8]) -> &[u8] {
    match line.strip_suffix(b"\n") {
        Some(rest) => rest.strip_suffix(b"\r").unwrap_or(rest),
        None => line,
    }
}

/// Decode a trimmed line into `buf`; invalid UTF-8 is replaced, not skipped.
pub fn decode_line(line: &[u8], buf: &mut String) {
    buf.clear();
    match std::str::from_utf8(line) {
        Ok(s) => buf.push_str(s),
        Err(_) => {
            tracing::debug!(bytes = line.len(), "dictionary line is not UTF-8, decoding lossily");
            buf.push_str(&String::from_utf8_lossy(line));
        }
    }
}
