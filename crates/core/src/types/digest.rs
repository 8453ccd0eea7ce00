use super::message::{proto_name, REAPI_PACKAGE};
use crate::hashing::DigestFunction;
use std::fmt;

/// Content hash and byte length identifying a blob
#[derive(Clone, PartialEq, Eq, Hash, prost::Message)]
pub struct Digest {
    #[prost(string, tag = "1")]
    pub hash: String,
    #[prost(int64, tag = "2")]
    pub size_bytes: i64,
}

proto_name!(REAPI_PACKAGE => Digest);

impl Digest {
    pub fn new(hash: impl Into<String>, size_bytes: i64) -> Self {
        Self {
            hash: hash.into(),
            size_bytes,
        }
    }

    /// SHA-256 digest of the given bytes
    pub fn of(data: &[u8]) -> Self {
        DigestFunction::SHA256.digest(data)
    }

    /// Declared size, clamped to zero for malformed negative sizes
    pub fn size(&self) -> u64 {
        self.size_bytes.max(0) as u64
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.hash, self.size_bytes)
    }
}

/// A digest resolved within an instance namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceNameDigest {
    pub digest: Digest,
    pub instance_name: String,
}

impl InstanceNameDigest {
    pub fn new(digest: Digest, instance_name: impl Into<String>) -> Self {
        Self {
            digest,
            instance_name: instance_name.into(),
        }
    }

    pub fn hash(&self) -> &str {
        &self.digest.hash
    }

    pub fn size_bytes(&self) -> i64 {
        self.digest.size_bytes
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }
}

impl fmt::Display for InstanceNameDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_name.is_empty() {
            write!(f, "{}", self.digest)
        } else {
            write!(f, "{}/blobs/{}", self.instance_name, self.digest)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProtoMessage;

    #[test]
    fn test_digest_display() {
        let digest = Digest::new("abc", 3);
        assert_eq!(digest.to_string(), "abc/3");

        let scoped = InstanceNameDigest::new(digest.clone(), "");
        assert_eq!(scoped.to_string(), "abc/3");

        let scoped = InstanceNameDigest::new(digest, "ci/linux");
        assert_eq!(scoped.to_string(), "ci/linux/blobs/abc/3");
        assert_eq!(scoped.instance_name(), "ci/linux");
    }

    #[test]
    fn test_negative_size_is_clamped() {
        assert_eq!(Digest::new("x", -5).size(), 0);
    }

    #[test]
    fn test_digest_wire_format() {
        // field 1 "ab", field 2 varint 3
        assert_eq!(Digest::new("ab", 3).to_bytes(), b"\x0a\x02ab\x10\x03".to_vec());
    }
}
