//! Content-addressable storage client for remex
//!
//! Uploads actions and commands, downloads blobs with optional verification,
//! and expands output trees onto the local filesystem.

pub mod client;
mod stats;
pub mod store;
pub mod tree;

pub use client::CasClient;
pub use stats::CasStatsSnapshot;
pub use store::{BlobStream, ByteStore, MemoryByteStore};
