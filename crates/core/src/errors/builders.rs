//! Builder methods for creating errors with context

use super::types::Error;
use crate::status::{Code, Status};
use std::path::PathBuf;

impl Error {
    /// Create a broken-stream error
    #[must_use]
    pub fn transport_broken(operation: Option<String>, message: impl Into<String>) -> Self {
        Error::TransportBroken {
            operation,
            message: message.into(),
        }
    }

    /// Create a decode error for the named payload
    #[must_use]
    pub fn decode(payload: impl Into<String>, message: impl Into<String>) -> Self {
        Error::DecodeFailure {
            payload: payload.into(),
            message: message.into(),
        }
    }

    /// Create a decode failure for a required message field that was absent
    #[must_use]
    pub fn missing_field(payload: impl Into<String>, field: &str) -> Self {
        Error::decode(payload, format!("required field '{field}' is not set"))
    }

    /// Create a remote execution failure from the status embedded in a response
    #[must_use]
    pub fn remote_execution_failed(status: Status) -> Self {
        Error::RemoteExecutionFailed {
            code: status.code(),
            message: status.message().to_string(),
        }
    }

    /// Create a precondition error
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Error::PreconditionNotMet {
            message: message.into(),
        }
    }

    /// Create an upload error from a transport status
    #[must_use]
    pub fn upload_failed(what: impl Into<String>, status: Status) -> Self {
        Error::UploadFailed {
            what: what.into(),
            code: status.code(),
            message: status.message().to_string(),
        }
    }

    /// Create a download error from a transport status
    #[must_use]
    pub fn download_failed(digest: impl Into<String>, status: Status) -> Self {
        Error::DownloadFailed {
            digest: digest.into(),
            code: status.code(),
            message: status.message().to_string(),
        }
    }

    /// Create an error for a streaming RPC that could not be established
    #[must_use]
    pub fn rpc(method: &'static str, status: Status) -> Self {
        Error::Rpc {
            method,
            code: status.code(),
            message: status.message().to_string(),
        }
    }

    /// Create a local filesystem error
    #[must_use]
    pub fn local_io(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::LocalIo {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create an invalid path error
    #[must_use]
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported feature error
    #[must_use]
    pub fn unsupported(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Unsupported {
            feature: feature.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Download error for content that did not match its digest
    #[must_use]
    pub fn digest_mismatch(digest: impl Into<String>, message: impl Into<String>) -> Self {
        Error::DownloadFailed {
            digest: digest.into(),
            code: Code::Internal,
            message: message.into(),
        }
    }
}
