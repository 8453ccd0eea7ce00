//! Content-Addressed Storage client
//!
//! Uploads blobs and structured messages under their own digest and
//! downloads them back, optionally verifying what the transport delivered.

use crate::stats::{CasStats, CasStatsSnapshot};
use crate::store::ByteStore;
use bytes::Bytes;
use futures::StreamExt;
use remex_config::ClientConfig;
use remex_core::{Digest, DigestFunction, Error, InstanceNameDigest, ProtoMessage, Result};
use remex_utils::tracing::{transfer_event, Transfer};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

const MAX_PREALLOCATION: u64 = 1 << 20;

/// CAS client implementation
#[derive(Clone)]
pub struct CasClient {
    store: Arc<dyn ByteStore>,
    config: ClientConfig,
    digest_function: DigestFunction,
    pub(crate) stats: Arc<CasStats>,
}

impl CasClient {
    /// Create a client with default settings
    pub fn new(store: Arc<dyn ByteStore>) -> Self {
        Self::with_config(store, ClientConfig::default())
    }

    pub fn with_config(store: Arc<dyn ByteStore>, config: ClientConfig) -> Self {
        Self {
            store,
            config,
            digest_function: DigestFunction::default(),
            stats: Arc::new(CasStats::default()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn digest_function(&self) -> DigestFunction {
        self.digest_function
    }

    /// Get statistics
    pub fn stats(&self) -> CasStatsSnapshot {
        self.stats.snapshot()
    }

    /// Store raw bytes under their digest
    ///
    /// Content that is already present is not sent again; that is counted as
    /// a duplicate, never reported as an error.
    pub async fn upload_blob(&self, instance_name: &str, data: Bytes, what: &str) -> Result<Digest> {
        let digest = self.digest_function.digest(&data);
        let scoped = InstanceNameDigest::new(digest.clone(), instance_name);

        match self.store.contains(&scoped).await {
            Ok(true) => {
                self.stats.duplicate_uploads.fetch_add(1, Ordering::Relaxed);
                debug!(digest = %scoped, "Skipping upload of {what}, already present in CAS");
                return Ok(digest);
            }
            Ok(false) => {}
            Err(status) => {
                debug!(digest = %scoped, code = ?status.code(), error = %status.message(), "Existence check failed, uploading anyway");
            }
        }

        let size = data.len() as u64;
        self.store
            .write(&scoped, data)
            .await
            .map_err(|status| Error::upload_failed(format!("{what} {digest}"), status))?;

        self.stats.record_upload(size);
        transfer_event(Transfer::Upload, &digest.hash, size);
        Ok(digest)
    }

    /// Encode a message and store it under the digest of its protobuf bytes
    pub async fn upload_message<M: ProtoMessage>(&self, instance_name: &str, message: &M) -> Result<Digest> {
        self.upload_blob(instance_name, Bytes::from(message.to_bytes()), M::NAME)
            .await
    }

    /// Stream a blob into `sink`, returning the number of bytes written
    pub async fn download_blob<W>(&self, digest: &InstanceNameDigest, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        // The empty blob is never fetched
        if self.digest_function.is_empty_digest(&digest.digest) {
            return Ok(0);
        }

        let mut stream = self
            .store
            .read(digest)
            .await
            .map_err(|status| Error::download_failed(digest.to_string(), status))?;

        let mut hasher = self
            .config
            .verify_downloads
            .then(|| self.digest_function.hasher());
        let mut received = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|status| Error::download_failed(digest.to_string(), status))?;
            if let Some(hasher) = hasher.as_mut() {
                hasher.update(&chunk);
            }
            received += chunk.len() as u64;
            sink.write_all(&chunk)
                .await
                .map_err(|e| Error::local_io(PathBuf::from("<sink>"), format!("write {digest} to"), e))?;
        }
        sink.flush()
            .await
            .map_err(|e| Error::local_io(PathBuf::from("<sink>"), "flush", e))?;

        if let Some(hasher) = hasher {
            if received != digest.digest.size() {
                return Err(Error::digest_mismatch(
                    digest.to_string(),
                    format!("expected {} bytes, received {received}", digest.size_bytes()),
                ));
            }
            let actual = hasher.finalize_hex();
            if actual != digest.hash() {
                return Err(Error::digest_mismatch(
                    digest.to_string(),
                    format!("content hashes to {actual}"),
                ));
            }
        }

        self.stats.record_download(received);
        transfer_event(Transfer::Download, digest.hash(), received);
        Ok(received)
    }

    /// Download a blob into memory
    ///
    /// The declared size only sizes the initial buffer up to
    /// `MAX_PREALLOCATION`; larger blobs grow the buffer as chunks arrive.
    pub async fn download_bytes(&self, digest: &InstanceNameDigest) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(digest.digest.size().min(MAX_PREALLOCATION) as usize);
        self.download_blob(digest, &mut buf).await?;
        Ok(buf)
    }

    /// Download a blob and decode it as `M`
    pub async fn download_message<M: ProtoMessage>(&self, digest: &InstanceNameDigest) -> Result<M> {
        let data = self.download_bytes(digest).await?;
        M::from_bytes(&data)
    }

    /// Download a blob to `path`, creating parent directories, and apply `mode`
    pub async fn download_to_file(&self, digest: &InstanceNameDigest, path: &Path, mode: u32) -> Result<u64> {
        remex_utils::ensure_parent(path).await?;

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| Error::local_io(path, "create file", e))?;
        let written = self.download_blob(digest, &mut file).await.map_err(|e| match e {
            Error::LocalIo {
                operation, source, ..
            } => Error::local_io(path, operation, source),
            other => other,
        })?;
        file.sync_all()
            .await
            .map_err(|e| Error::local_io(path, "sync file", e))?;
        drop(file);

        remex_utils::set_mode(path, mode).await?;
        Ok(written)
    }
}
