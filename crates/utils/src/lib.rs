//! Shared utilities for remex
//!
//! Tracing setup used by drivers and the filesystem helpers the output
//! materializer builds on.

pub mod fs;
pub mod tracing;

pub use fs::*;
