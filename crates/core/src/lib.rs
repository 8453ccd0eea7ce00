//! Core domain types, errors, and constants for `remex`.
//!
//! ## Key Components
//!
//! - **`errors`**: the `Error` enum and `Result` alias shared by every crate.
//! - **`status`**: RPC status codes returned by the transport seams.
//! - **`types`**: the remote execution protocol data model.
//! - **`hashing`**: digest computation over serialized bytes.

pub mod constants;
pub mod errors;
pub mod hashing;
pub mod status;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, ErrorKind, Result},
    hashing::DigestFunction,
    status::{Code, Status, StatusProto},
    types::*,
};
