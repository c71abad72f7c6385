//! KeePass KDBX target (keepass 0.8 API)
//!
//! A candidate is tried as the database master password. The key derivation
//! (AES-KDF or Argon2) makes every attempt expensive, which is exactly the
//! case the worker pool exists for.

use keepass::error::{
    CryptographyError, DatabaseIntegrityError, DatabaseKeyError, DatabaseOpenError,
};
use keepass::{Database, DatabaseKey};
use p12crack_core::{CrackError, CrackResult, Verifier};

/// KDBX base signature: 0x9AA2D903 followed by 0xB54BFB67, little-endian
const KDBX_SIGNATURE: [u8; 8] = [0x03, 0xD9, 0xA2, 0x9A, 0x67, 0xFB, 0x4B, 0xB5];

/// Signature plus the 4-byte format version
const KDBX_MIN_HEADER: usize = 12;

pub fn has_signature(data: &[u8]) -> bool {
    data.len() >= KDBX_SIGNATURE.len() && data[..KDBX_SIGNATURE.len()] == KDBX_SIGNATURE
}

/// In-memory copy of a KeePass database file
pub struct KdbxContainer {
    data: Vec<u8>,
    major_version: u16,
}

impl KdbxContainer {
    /// Validate the file and run one trial open, so a damaged header is a
    /// parse error here instead of a fault inside the workers.
    pub fn from_bytes(data: Vec<u8>) -> CrackResult<Self> {
        if !has_signature(&data) {
            return Err(CrackError::ContainerParse("missing KDBX signature".into()));
        }
        if data.len() < KDBX_MIN_HEADER {
            return Err(CrackError::ContainerParse("truncated KDBX header".into()));
        }

        let major_version = u16::from_le_bytes([data[10], data[11]]);
        if !(3..=4).contains(&major_version) {
            return Err(CrackError::ContainerParse(format!(
                "unsupported KDBX major version {major_version}"
            )));
        }

        let container = Self {
            data,
            major_version,
        };
        container
            .try_open("")
            .map_err(|e| CrackError::ContainerParse(format!("KDBX structure: {e}")))?;
        Ok(container)
    }

    /// `Ok(false)` for a wrong password, `Err` for anything else that failed.
    fn try_open(&self, candidate: &str) -> Result<bool, DatabaseOpenError> {
        let key = DatabaseKey::new().with_password(candidate);
        match Database::parse(&self.data, key) {
            Ok(_) => Ok(true),
            Err(e) if is_wrong_key(&e, self.major_version) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Whether an open failure means "wrong password" rather than a damaged file.
fn is_wrong_key(err: &DatabaseOpenError, major_version: u16) -> bool {
    match err {
        DatabaseOpenError::Key(DatabaseKeyError::IncorrectKey) => true,
        // KDBX 3 has no key check ahead of the CBC payload; a wrong key
        // usually surfaces as bad padding before the stream-start bytes
        DatabaseOpenError::DatabaseIntegrity(DatabaseIntegrityError::Cryptography(
            CryptographyError::Unpadding(_),
        )) => major_version == 3,
        _ => false,
    }
}

impl Verifier for KdbxContainer {
    fn verify(&self, candidate: &str) -> CrackResult<bool> {
        self.try_open(candidate)
            .map_err(|e| CrackError::Verifier(format!("opening KDBX database: {e}")))
    }

    fn describe(&self) -> String {
        format!("KDBX {} ({} bytes)", self.major_version, self.data.len())
    }
}
