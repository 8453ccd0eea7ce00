//! Protocol data model
//!
//! Protobuf messages for the subset of the remote execution API this client
//! speaks: digests, actions, results, output trees and operations. Field
//! tags follow `build.bazel.remote.execution.v2` and `google.longrunning`.

mod action;
mod digest;
mod message;
mod operation;
mod tree;

pub use action::*;
pub use digest::*;
pub use message::*;
pub use operation::*;
pub use tree::*;
