/// Constants used throughout the remex codebase
// Environment variable names
pub const REMEX_INSTANCE_NAME_VAR: &str = "REMEX_INSTANCE_NAME";
pub const REMEX_SKIP_CACHE_LOOKUP_VAR: &str = "REMEX_SKIP_CACHE_LOOKUP";
pub const REMEX_DOWNLOAD_CONCURRENCY_VAR: &str = "REMEX_DOWNLOAD_CONCURRENCY";
pub const REMEX_VERIFY_DOWNLOADS_VAR: &str = "REMEX_VERIFY_DOWNLOADS";

// Permission bits for materialized outputs
pub const DEFAULT_FILE_MODE: u32 = 0o644;
pub const DEFAULT_EXECUTABLE_MODE: u32 = 0o755;
pub const DEFAULT_DIRECTORY_MODE: u32 = 0o755;

pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 4;
