//! PKCS#12 password-integrity MAC (RFC 7292, appendix B)
//!
//! The MAC key is derived from the BMPString password with the PKCS#12 KDF,
//! using the same hash as the HMAC itself. OpenSSL 3 writes HMAC-SHA-256 by
//! default and `-legacy` files carry HMAC-SHA-1, so the digest is chosen per
//! file from the MacData algorithm identifier.

use hmac::digest::{core_api::BlockSizeUser, Digest};
use hmac::{Mac, SimpleHmac};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};

/// KDF diversifier for MAC keys
const MAC_KEY_ID: u8 = 3;

/// Hash algorithms a PKCS#12 MacData may name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacDigest {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha512_224,
    Sha512_256,
}

impl MacDigest {
    /// Look up a digest by its OID arcs.
    pub fn from_oid(arcs: &[u64]) -> Option<Self> {
        match arcs {
            [1, 3, 14, 3, 2, 26] => Some(Self::Sha1),
            [2, 16, 840, 1, 101, 3, 4, 2, n] => match n {
                1 => Some(Self::Sha256),
                2 => Some(Self::Sha384),
                3 => Some(Self::Sha512),
                4 => Some(Self::Sha224),
                5 => Some(Self::Sha512_224),
                6 => Some(Self::Sha512_256),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn output_size(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 | Self::Sha512_224 => 28,
            Self::Sha256 | Self::Sha512_256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

impl std::fmt::Display for MacDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Sha1 => "SHA-1",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::Sha512_224 => "SHA-512/224",
            Self::Sha512_256 => "SHA-512/256",
        };
        f.write_str(name)
    }
}

/// Everything needed to test a password against one file's MAC
#[derive(Debug, Clone)]
pub struct MacCheck {
    pub digest: MacDigest,
    pub salt: Vec<u8>,
    pub iterations: u64,
    pub expected: Vec<u8>,
    /// The authenticated-safe content the MAC covers
    pub content: Vec<u8>,
}

impl MacCheck {
    pub fn verify(&self, password: &str) -> bool {
        let password = bmp_password(password);
        match self.digest {
            MacDigest::Sha1 => self.verify_with::<Sha1>(&password),
            MacDigest::Sha224 => self.verify_with::<Sha224>(&password),
            MacDigest::Sha256 => self.verify_with::<Sha256>(&password),
            MacDigest::Sha384 => self.verify_with::<Sha384>(&password),
            MacDigest::Sha512 => self.verify_with::<Sha512>(&password),
            MacDigest::Sha512_224 => self.verify_with::<Sha512_224>(&password),
            MacDigest::Sha512_256 => self.verify_with::<Sha512_256>(&password),
        }
    }

    fn verify_with<D: Digest + BlockSizeUser>(&self, password: &[u8]) -> bool {
        let key = derive_key::<D>(
            password,
            &self.salt,
            self.iterations,
            MAC_KEY_ID,
            <D as Digest>::output_size(),
        );
        let Ok(mut mac) = <SimpleHmac<D> as Mac>::new_from_slice(&key) else {
            return false;
        };
        mac.update(&self.content);
        mac.verify_slice(&self.expected).is_ok()
    }
}

/// Big-endian UTF-16 with a two-byte NUL terminator, as PKCS#12 hashes it.
pub fn bmp_password(password: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(password.len() * 2 + 2);
    for unit in password.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    out
}

/// PKCS#12 key derivation (RFC 7292 B.2) producing `len` bytes.
pub fn derive_key<D: Digest + BlockSizeUser>(
    password: &[u8],
    salt: &[u8],
    iterations: u64,
    id: u8,
    len: usize,
) -> Vec<u8> {
    let v = <D as BlockSizeUser>::block_size();
    let u = <D as Digest>::output_size();

    // repeat to a whole number of v-byte blocks; empty stays empty
    let stretch = |src: &[u8]| -> Vec<u8> {
        let n = v * src.len().div_ceil(v);
        src.iter().copied().cycle().take(n).collect()
    };

    let diversifier = vec![id; v];
    let mut input = stretch(salt);
    input.extend(stretch(password));

    let mut out = Vec::with_capacity(len + u);
    loop {
        let mut hash = D::new()
            .chain_update(&diversifier)
            .chain_update(&input)
            .finalize();
        for _ in 1..iterations {
            hash = D::digest(&hash);
        }
        out.extend_from_slice(&hash);
        if out.len() >= len {
            break;
        }

        // I_j = (I_j + B + 1) mod 2^(8v) for every block of I
        let b: Vec<u8> = hash.iter().copied().cycle().take(v).collect();
        for block in input.chunks_mut(v) {
            let mut carry = 1u16;
            for (x, y) in block.iter_mut().rev().zip(b.iter().rev()) {
                let sum = u16::from(*x) + u16::from(*y) + carry;
                *x = sum as u8;
                carry = sum >> 8;
            }
        }
    }
    out.truncate(len);
    out
}
