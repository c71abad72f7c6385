//! p12crack-container: the passphrase-protected targets p12crack can attack
//!
//! Each container is parsed once up front, so structural problems surface
//! before any worker starts, and the parsed handle is then shared read-only
//! by every worker through the `Verifier` trait.
//!
//! Supported formats:
//!   - PKCS#12 (`.p12` / `.pfx`): candidate checked against the HMAC-SHA-1/SHA-2 MAC
//!   - KeePass KDBX 3.1 / 4: candidate used as the database master password

pub mod kdbx;
pub mod mac;
pub mod pkcs12;

pub use kdbx::KdbxContainer;
pub use mac::MacDigest;
pub use pkcs12::Pkcs12Container;

use p12crack_core::{CrackError, CrackResult, Verifier};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Container format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerKind {
    /// Sniff the file contents
    #[default]
    Auto,
    Pkcs12,
    Kdbx,
}

impl FromStr for ContainerKind {
    type Err = CrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ContainerKind::Auto),
            "pkcs12" | "p12" | "pfx" => Ok(ContainerKind::Pkcs12),
            "kdbx" | "keepass" => Ok(ContainerKind::Kdbx),
            other => Err(CrackError::config(format!("unknown container format: {other}"))),
        }
    }
}

/// Guess the container format from its leading bytes.
pub fn detect(data: &[u8]) -> CrackResult<ContainerKind> {
    if kdbx::has_signature(data) {
        Ok(ContainerKind::Kdbx)
    } else if data.first() == Some(&0x30) {
        // DER SEQUENCE, the outer PFX structure
        Ok(ContainerKind::Pkcs12)
    } else {
        Err(CrackError::ContainerParse(
            "neither a PKCS#12 (DER) nor a KDBX file".into(),
        ))
    }
}

/// Read and parse the target file into a shareable verifier handle.
pub fn open_container(path: &Path, kind: ContainerKind) -> CrackResult<Arc<dyn Verifier>> {
    let data = std::fs::read(path).map_err(|source| CrackError::TargetNotFound {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), ?kind, bytes = data.len(), "loading container");
    load_container(data, kind)
}

/// Parse already-read container bytes.
pub fn load_container(data: Vec<u8>, kind: ContainerKind) -> CrackResult<Arc<dyn Verifier>> {
    let verifier: Arc<dyn Verifier> = match kind {
        ContainerKind::Auto => {
            let detected = detect(&data)?;
            return load_container(data, detected);
        }
        ContainerKind::Pkcs12 => Arc::new(Pkcs12Container::from_der(&data)?),
        ContainerKind::Kdbx => Arc::new(KdbxContainer::from_bytes(data)?),
    };
    Ok(verifier)
}
