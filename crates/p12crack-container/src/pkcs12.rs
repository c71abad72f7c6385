//! PKCS#12 (PFX) target, checked through its MAC
//!
//! The MAC covers the whole authenticated safe and is keyed from the
//! password via the PKCS#12 KDF, so a successful MAC check is the cheapest
//! complete test of a candidate. Containers without a MAC are rejected: any
//! candidate would "match" them.

use p12::{AlgorithmIdentifier, ContentInfo, PFX};
use p12crack_core::{CrackError, CrackResult, Verifier};

use crate::mac::{MacCheck, MacDigest};

/// A parsed PKCS#12 file
pub struct Pkcs12Container {
    mac: MacCheck,
    size: usize,
}

impl Pkcs12Container {
    pub fn from_der(der: &[u8]) -> CrackResult<Self> {
        let pfx = PFX::parse(der)
            .map_err(|e| CrackError::ContainerParse(format!("PKCS#12 structure: {e:?}")))?;

        let Some(mac_data) = pfx.mac_data else {
            return Err(CrackError::ContainerParse(
                "PKCS#12 file carries no MAC; there is no password to recover".into(),
            ));
        };

        let digest = match &mac_data.mac.digest_algorithm {
            AlgorithmIdentifier::Sha1 => MacDigest::Sha1,
            AlgorithmIdentifier::OtherAlg(other) => {
                MacDigest::from_oid(other.algorithm_type.components()).ok_or_else(|| {
                    CrackError::ContainerParse(format!(
                        "unsupported MAC algorithm {}",
                        other.algorithm_type
                    ))
                })?
            }
            _ => {
                return Err(CrackError::ContainerParse(
                    "MAC names an encryption scheme instead of a digest".into(),
                ))
            }
        };

        if mac_data.mac.digest.len() != digest.output_size() {
            return Err(CrackError::ContainerParse(format!(
                "{digest} MAC is {} bytes, expected {}",
                mac_data.mac.digest.len(),
                digest.output_size()
            )));
        }

        let content = match pfx.auth_safe {
            ContentInfo::Data(content) => content,
            _ => {
                return Err(CrackError::ContainerParse(
                    "authenticated safe is not password-integrity data".into(),
                ))
            }
        };

        tracing::debug!(%digest, iterations = mac_data.iterations, "PKCS#12 MAC");

        Ok(Self {
            mac: MacCheck {
                digest,
                salt: mac_data.salt,
                iterations: u64::from(mac_data.iterations),
                expected: mac_data.mac.digest,
                content,
            },
            size: der.len(),
        })
    }

    pub fn mac_digest(&self) -> MacDigest {
        self.mac.digest
    }
}

impl Verifier for Pkcs12Container {
    fn verify(&self, candidate: &str) -> CrackResult<bool> {
        Ok(self.mac.verify(candidate))
    }

    fn describe(&self) -> String {
        format!("PKCS#12 with {} MAC ({} bytes)", self.mac.digest, self.size)
    }
}

impl std::fmt::Debug for Pkcs12Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pkcs12Container")
            .field("digest", &self.mac.digest)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
