//! Content digest computation
//!
//! Every blob and serialized message is addressed by the hash of its exact
//! bytes together with its length.

use crate::types::Digest;
use sha2::{Digest as Sha2Digest, Sha256, Sha512};

/// Digest function to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DigestFunction {
    #[default]
    SHA256,
    SHA512,
}

impl DigestFunction {
    /// Compute the lowercase hex hash of data
    pub fn hash(&self, data: &[u8]) -> String {
        match self {
            DigestFunction::SHA256 => {
                let mut hasher = Sha256::new();
                hasher.update(data);
                hex::encode(hasher.finalize())
            }
            DigestFunction::SHA512 => {
                let mut hasher = Sha512::new();
                hasher.update(data);
                hex::encode(hasher.finalize())
            }
        }
    }

    /// Compute the digest of data
    pub fn digest(&self, data: &[u8]) -> Digest {
        Digest {
            hash: self.hash(data),
            size_bytes: data.len() as i64,
        }
    }

    /// Start an incremental hash
    pub fn hasher(&self) -> Hasher {
        match self {
            DigestFunction::SHA256 => Hasher::Sha256(Sha256::new()),
            DigestFunction::SHA512 => Hasher::Sha512(Sha512::new()),
        }
    }

    /// Whether a digest names the empty blob
    pub fn is_empty_digest(&self, digest: &Digest) -> bool {
        digest.size_bytes == 0 && digest.hash == self.hash(b"")
    }

    /// Length of a hex hash produced by this function
    pub fn hash_len(&self) -> usize {
        match self {
            DigestFunction::SHA256 => 64,
            DigestFunction::SHA512 => 128,
        }
    }
}

/// Incremental hasher for streamed content
pub enum Hasher {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
        }
    }

    /// Lowercase hex hash of everything fed so far
    pub fn finalize_hex(self) -> String {
        match self {
            Hasher::Sha256(h) => hex::encode(h.finalize()),
            Hasher::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}
