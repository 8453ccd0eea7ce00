use std::sync::atomic::{AtomicU64, Ordering};

/// CAS transfer statistics
#[derive(Debug, Default)]
pub(crate) struct CasStats {
    pub uploads: AtomicU64,
    pub duplicate_uploads: AtomicU64,
    pub downloads: AtomicU64,
    pub bytes_uploaded: AtomicU64,
    pub bytes_downloaded: AtomicU64,
    pub files_materialized: AtomicU64,
}

impl CasStats {
    pub fn snapshot(&self) -> CasStatsSnapshot {
        CasStatsSnapshot {
            uploads: self.uploads.load(Ordering::Relaxed),
            duplicate_uploads: self.duplicate_uploads.load(Ordering::Relaxed),
            downloads: self.downloads.load(Ordering::Relaxed),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            files_materialized: self.files_materialized.load(Ordering::Relaxed),
        }
    }

    pub fn record_upload(&self, bytes: u64) {
        self.uploads.fetch_add(1, Ordering::Relaxed);
        self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_download(&self, bytes: u64) {
        self.downloads.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// CAS statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CasStatsSnapshot {
    pub uploads: u64,
    pub duplicate_uploads: u64,
    pub downloads: u64,
    pub bytes_uploaded: u64,
    pub bytes_downloaded: u64,
    pub files_materialized: u64,
}
