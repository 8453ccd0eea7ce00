//! RPC status handling shared by the execution and byte-store transports
//!
//! Transport failures are plain [`tonic::Status`] values. Statuses embedded
//! in protocol messages use the `google.rpc.Status` wire form.

use prost_types::Any;

pub use tonic::{Code, Status};

/// Wire form of a status as embedded in protocol messages (`google.rpc.Status`)
#[derive(Clone, PartialEq, prost::Message)]
pub struct StatusProto {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, repeated, tag = "3")]
    pub details: Vec<Any>,
}

impl prost::Name for StatusProto {
    const NAME: &'static str = "Status";
    const PACKAGE: &'static str = "google.rpc";
}

impl StatusProto {
    pub fn ok() -> Self {
        Self::default()
    }

    /// Returns the status as an error, or `None` when the code is OK
    pub fn to_status(&self) -> Option<Status> {
        match Code::from(self.code) {
            Code::Ok => None,
            code => Some(Status::new(code, self.message.clone())),
        }
    }
}

impl From<&Status> for StatusProto {
    fn from(status: &Status) -> Self {
        Self {
            code: status.code() as i32,
            message: status.message().to_string(),
            details: Vec::new(),
        }
    }
}

impl From<Status> for StatusProto {
    fn from(status: Status) -> Self {
        Self::from(&status)
    }
}
