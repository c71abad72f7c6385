use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CrackError, CrackResult};

/// Shortest password length a brute-force search accepts
pub const MIN_WORD_LENGTH: usize = 1;

/// Longest password length a brute-force search accepts; larger values are clamped
pub const MAX_WORD_LENGTH: usize = 2048;

/// Top-level configuration (loaded from p12crack.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrackConfig {
    pub search: SearchConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Worker thread count (0 = host parallelism)
    pub threads: usize,
    /// Default minimum brute-force length
    pub min_length: usize,
    /// Default maximum brute-force length
    pub max_length: usize,
    /// Charset tokens used when brute force is selected without -c/-s
    pub charset: String,
    /// Progress sampling interval in milliseconds
    pub report_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            min_length: 1,
            max_length: 8,
            charset: "x".into(),
            report_interval_ms: 1000,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Load the config file at `path`, falling back to defaults when no path is
/// given or the file does not exist. Runs before logging is set up, so a
/// missing file is left for the caller to report.
pub fn load_config(path: Option<&Path>) -> CrackResult<CrackConfig> {
    let Some(path) = path else {
        return Ok(CrackConfig::default());
    };

    if !path.exists() {
        return Ok(CrackConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| CrackError::config(format!("parsing config {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = CrackConfig::default();
        assert_eq!(cfg.search.threads, 0);
        assert_eq!(cfg.search.min_length, 1);
        assert_eq!(cfg.search.max_length, 8);
        assert_eq!(cfg.search.charset, "x");
        assert_eq!(cfg.search.report_interval_ms, 1000);
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.log.format, "text");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("p12crack.toml");
        std::fs::write(&path, "[search]\nthreads = 3\nmax_length = 5\n").unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.search.threads, 3);
        assert_eq!(cfg.search.max_length, 5);
        assert_eq!(cfg.search.min_length, 1);
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(Some(&tmp.path().join("absent.toml"))).unwrap();
        assert_eq!(cfg.search.max_length, 8);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("p12crack.toml");
        std::fs::write(&path, "[search\nthreads = ").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, CrackError::Config(_)));
    }
}
