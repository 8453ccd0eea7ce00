//! Display implementations for error types

use super::types::Error;
use std::fmt;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TransportBroken { operation, message } => match operation {
                Some(name) => write!(f, "stream to server broken for operation '{name}': {message}"),
                None => write!(f, "stream to server broken: {message}"),
            },
            Error::DecodeFailure { payload, message } => {
                write!(f, "invalid {payload} proto: {message}")
            }
            Error::RemoteExecutionFailed { code, message } => {
                write!(f, "command execution failed: {code:?}: {message}")
            }
            Error::PreconditionNotMet { message } => {
                write!(f, "precondition failed: {message}")
            }
            Error::UploadFailed {
                what,
                code,
                message,
            } => {
                write!(f, "unable to upload {what} to CAS: {code:?}: {message}")
            }
            Error::DownloadFailed {
                digest,
                code,
                message,
            } => {
                write!(f, "unable to download {digest} from CAS: {code:?}: {message}")
            }
            Error::Rpc {
                method,
                code,
                message,
            } => {
                write!(f, "{method} request failed: {code:?}: {message}")
            }
            Error::LocalIo {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "failed to {} '{}': {}",
                    operation,
                    path.display(),
                    source
                )
            }
            Error::InvalidPath { path, message } => {
                write!(f, "invalid output path '{path}': {message}")
            }
            Error::Unsupported { feature, message } => {
                write!(f, "{feature} is not supported: {message}")
            }
            Error::Configuration { message } => {
                write!(f, "configuration error: {message}")
            }
        }
    }
}
