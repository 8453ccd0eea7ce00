//! Byte-level put/get by digest
//!
//! [`ByteStore`] is the narrow seam to the blob transport. The CAS client
//! builds every structured operation on top of it.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::stream::{self, BoxStream, StreamExt};
use remex_core::{DigestFunction, InstanceNameDigest, Status};
use std::sync::atomic::{AtomicBool, Ordering};

/// Chunked blob contents as delivered by the transport
pub type BlobStream = BoxStream<'static, Result<Bytes, Status>>;

/// Raw blob storage addressed by `(instance name, digest)`
#[async_trait]
pub trait ByteStore: Send + Sync {
    /// Whether the blob is already stored
    async fn contains(&self, digest: &InstanceNameDigest) -> Result<bool, Status>;

    /// Store a blob; storing existing content is not an error
    async fn write(&self, digest: &InstanceNameDigest, data: Bytes) -> Result<(), Status>;

    /// Open a blob for reading
    async fn read(&self, digest: &InstanceNameDigest) -> Result<BlobStream, Status>;
}

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// In-process byte store
///
/// Validates digests on write and serves reads in fixed-size chunks. Can be
/// switched into an unavailable state to exercise transient failures.
pub struct MemoryByteStore {
    blobs: DashMap<(String, String), Bytes>,
    digest_function: DigestFunction,
    chunk_size: usize,
    unavailable: AtomicBool,
}

impl Default for MemoryByteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
            digest_function: DigestFunction::SHA256,
            chunk_size: DEFAULT_CHUNK_SIZE,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Serve reads in chunks of `chunk_size` bytes
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Fail every call with `UNAVAILABLE` while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Store bytes under a digest without validating them
    pub fn insert_unchecked(&self, digest: &InstanceNameDigest, data: impl Into<Bytes>) {
        self.blobs.insert(key(digest), data.into());
    }

    pub fn get(&self, digest: &InstanceNameDigest) -> Option<Bytes> {
        self.blobs.get(&key(digest)).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    fn check_available(&self) -> Result<(), Status> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Status::unavailable("byte store is unavailable"));
        }
        Ok(())
    }
}

fn key(digest: &InstanceNameDigest) -> (String, String) {
    (digest.instance_name.clone(), digest.digest.hash.clone())
}

#[async_trait]
impl ByteStore for MemoryByteStore {
    async fn contains(&self, digest: &InstanceNameDigest) -> Result<bool, Status> {
        self.check_available()?;
        Ok(self.blobs.contains_key(&key(digest)))
    }

    async fn write(&self, digest: &InstanceNameDigest, data: Bytes) -> Result<(), Status> {
        self.check_available()?;

        if data.len() as i64 != digest.size_bytes() {
            return Err(Status::invalid_argument(format!(
                "size mismatch: expected {}, got {}",
                digest.size_bytes(),
                data.len()
            )));
        }
        let actual = self.digest_function.hash(&data);
        if actual != digest.hash() {
            return Err(Status::invalid_argument(format!(
                "hash mismatch: expected {}, got {}",
                digest.hash(),
                actual
            )));
        }

        self.blobs.entry(key(digest)).or_insert(data);
        Ok(())
    }

    async fn read(&self, digest: &InstanceNameDigest) -> Result<BlobStream, Status> {
        self.check_available()?;

        let data = self
            .get(digest)
            .ok_or_else(|| Status::not_found(format!("blob {digest} not found")))?;

        let chunk_size = self.chunk_size;
        let chunks: Vec<Result<Bytes, Status>> = (0..data.len())
            .step_by(chunk_size)
            .map(|start| Ok(data.slice(start..(start + chunk_size).min(data.len()))))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }
}
