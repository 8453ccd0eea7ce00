//! Client configuration
//!
//! `ClientConfig` is immutable once loaded and cheap to clone, so it can be
//! handed to every CAS client and execution handle.

use remex_core::{
    Error, Result, DEFAULT_DIRECTORY_MODE, DEFAULT_DOWNLOAD_CONCURRENCY, DEFAULT_EXECUTABLE_MODE,
    DEFAULT_FILE_MODE,
};
use serde::{Deserialize, Serialize};

/// Settings shared by the CAS client and the execution client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Instance namespace used when none is given explicitly
    pub instance_name: String,

    /// Whether Execute requests bypass the action cache
    pub skip_cache_lookup: bool,

    /// Number of blobs downloaded in parallel while expanding a tree
    pub download_concurrency: usize,

    /// Verify size and hash of every downloaded blob
    pub verify_downloads: bool,

    /// Mode for materialized files without declared permissions
    pub file_mode: u32,

    /// Mode for materialized files marked executable
    pub executable_mode: u32,

    /// Mode for materialized directories
    pub directory_mode: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            instance_name: String::new(),
            skip_cache_lookup: true,
            download_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
            verify_downloads: true,
            file_mode: DEFAULT_FILE_MODE,
            executable_mode: DEFAULT_EXECUTABLE_MODE,
            directory_mode: DEFAULT_DIRECTORY_MODE,
        }
    }
}

impl ClientConfig {
    /// Check invariants the materializer relies on
    pub fn validate(&self) -> Result<()> {
        if self.download_concurrency == 0 {
            return Err(Error::configuration(
                "download_concurrency must be at least 1",
            ));
        }
        // Directories must stay traversable by their owner
        if self.directory_mode & 0o700 != 0o700 {
            return Err(Error::configuration(format!(
                "directory_mode {:o} is not traversable by its owner",
                self.directory_mode
            )));
        }
        for (name, mode) in [
            ("file_mode", self.file_mode),
            ("executable_mode", self.executable_mode),
            ("directory_mode", self.directory_mode),
        ] {
            if mode > 0o7777 {
                return Err(Error::configuration(format!(
                    "{name} {mode:o} is not a permission mode"
                )));
            }
        }
        Ok(())
    }

    /// Mode for an output file
    pub fn mode_for(&self, is_executable: bool) -> u32 {
        if is_executable {
            self.executable_mode
        } else {
            self.file_mode
        }
    }
}
