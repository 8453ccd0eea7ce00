//! Core error type definitions

use crate::status::Code;
use std::path::PathBuf;

/// Result type alias for remex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for remex operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The execution stream ended before a terminal update arrived
    TransportBroken {
        operation: Option<String>,
        message: String,
    },

    /// A metadata, response or stored message payload could not be decoded
    DecodeFailure { payload: String, message: String },

    /// The terminal execution response carried a non-OK status
    RemoteExecutionFailed { code: Code, message: String },

    /// The operation was attempted in a state that does not allow it
    PreconditionNotMet { message: String },

    /// Storing content in the CAS failed
    UploadFailed {
        what: String,
        code: Code,
        message: String,
    },

    /// Fetching content from the CAS failed
    DownloadFailed {
        digest: String,
        code: Code,
        message: String,
    },

    /// A streaming RPC could not be established
    Rpc {
        method: &'static str,
        code: Code,
        message: String,
    },

    /// Filesystem errors while materializing outputs
    LocalIo {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// A declared path would land outside the destination root
    InvalidPath { path: String, message: String },

    /// Unsupported feature
    Unsupported { feature: String, message: String },

    /// Configuration errors
    Configuration { message: String },
}

/// Copyable classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TransportBroken,
    DecodeFailure,
    RemoteExecutionFailed,
    PreconditionNotMet,
    UploadFailed,
    DownloadFailed,
    Rpc,
    LocalIoFailure,
    InvalidPath,
    Unsupported,
    Configuration,
}

impl Error {
    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TransportBroken { .. } => ErrorKind::TransportBroken,
            Error::DecodeFailure { .. } => ErrorKind::DecodeFailure,
            Error::RemoteExecutionFailed { .. } => ErrorKind::RemoteExecutionFailed,
            Error::PreconditionNotMet { .. } => ErrorKind::PreconditionNotMet,
            Error::UploadFailed { .. } => ErrorKind::UploadFailed,
            Error::DownloadFailed { .. } => ErrorKind::DownloadFailed,
            Error::Rpc { .. } => ErrorKind::Rpc,
            Error::LocalIo { .. } => ErrorKind::LocalIoFailure,
            Error::InvalidPath { .. } => ErrorKind::InvalidPath,
            Error::Unsupported { .. } => ErrorKind::Unsupported,
            Error::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// The RPC code attached to this error, when there is one
    #[must_use]
    pub fn code(&self) -> Option<Code> {
        match self {
            Error::RemoteExecutionFailed { code, .. }
            | Error::UploadFailed { code, .. }
            | Error::DownloadFailed { code, .. }
            | Error::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether retrying the same call could plausibly succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Error::TransportBroken { .. } => true,
            _ => matches!(
                self.code(),
                Some(Code::Unavailable | Code::DeadlineExceeded | Code::ResourceExhausted)
            ),
        }
    }
}
