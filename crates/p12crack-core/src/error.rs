use std::path::PathBuf;
use thiserror::Error;

pub type CrackResult<T> = Result<T, CrackError>;

#[derive(Debug, Error)]
pub enum CrackError {
    #[error("config error: {0}")]
    Config(String),

    #[error("dictionary file not found: {}", .path.display())]
    DictionaryNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("target file not found or unreadable: {}", .path.display())]
    TargetNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse container: {0}")]
    ContainerParse(String),

    #[error("verifier error: {0}")]
    Verifier(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Process exit codes, one per reported category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Found = 0,
    NotFound = 1,
    TargetNotFound = 10,
    DictionaryNotFound = 20,
    ContainerParse = 30,
    Runtime = 40,
    Usage = 100,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl CrackError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CrackError::Config(_) => ExitCode::Usage,
            CrackError::DictionaryNotFound { .. } => ExitCode::DictionaryNotFound,
            CrackError::TargetNotFound { .. } => ExitCode::TargetNotFound,
            CrackError::ContainerParse(_) => ExitCode::ContainerParse,
            CrackError::Verifier(_) | CrackError::Io(_) | CrackError::Other(_) => ExitCode::Runtime,
        }
    }

    /// Shorthand for `CrackError::Config(format!(..))` call sites.
    pub fn config(msg: impl Into<String>) -> Self {
        CrackError::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            ExitCode::Found,
            ExitCode::NotFound,
            ExitCode::TargetNotFound,
            ExitCode::DictionaryNotFound,
            ExitCode::ContainerParse,
            ExitCode::Runtime,
            ExitCode::Usage,
        ];
        let unique: HashSet<i32> = codes.iter().map(|c| c.code()).collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn errors_map_to_their_category() {
        let missing = || std::io::Error::new(std::io::ErrorKind::NotFound, "gone");

        assert_eq!(CrackError::config("bad").exit_code(), ExitCode::Usage);
        assert_eq!(
            CrackError::DictionaryNotFound { path: "words.txt".into(), source: missing() }.exit_code(),
            ExitCode::DictionaryNotFound
        );
        assert_eq!(
            CrackError::TargetNotFound { path: "cert.p12".into(), source: missing() }.exit_code(),
            ExitCode::TargetNotFound
        );
        assert_eq!(
            CrackError::ContainerParse("junk".into()).exit_code(),
            ExitCode::ContainerParse
        );
        assert_eq!(CrackError::Verifier("boom".into()).exit_code(), ExitCode::Runtime);
    }

    #[test]
    fn display_includes_path() {
        let err = CrackError::DictionaryNotFound {
            path: "/tmp/rockyou.txt".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.to_string(), "dictionary file not found: /tmp/rockyou.txt");
    }
}
