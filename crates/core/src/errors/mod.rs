//! Error types for remex operations

mod builders;
mod display;
mod types;

pub use types::{Error, ErrorKind, Result};
