//! Execution lifecycle messages delivered by the Execute and WaitExecution streams

use super::action::ActionResult;
use super::digest::Digest;
use super::message::{proto_name, REAPI_PACKAGE};
use crate::status::StatusProto;
use prost_types::Any;
use std::fmt;

/// Ordered progress marker of one execution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ExecutionStage {
    Unknown = 0,
    CacheCheck = 1,
    Queued = 2,
    Executing = 3,
    Completed = 4,
}

impl ExecutionStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStage::Completed)
    }
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionStage::Unknown => "UNKNOWN",
            ExecutionStage::CacheCheck => "CACHE_CHECK",
            ExecutionStage::Queued => "QUEUED",
            ExecutionStage::Executing => "EXECUTING",
            ExecutionStage::Completed => "COMPLETED",
        };
        f.write_str(name)
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ExecuteRequest {
    #[prost(string, tag = "1")]
    pub instance_name: String,
    #[prost(bool, tag = "3")]
    pub skip_cache_lookup: bool,
    #[prost(message, optional, tag = "6")]
    pub action_digest: Option<Digest>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WaitExecutionRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

/// Metadata attached to every operation update
#[derive(Clone, PartialEq, prost::Message)]
pub struct ExecuteOperationMetadata {
    #[prost(enumeration = "ExecutionStage", tag = "1")]
    pub stage: i32,
    #[prost(message, optional, tag = "2")]
    pub action_digest: Option<Digest>,
    #[prost(string, tag = "3")]
    pub stdout_stream_name: String,
    #[prost(string, tag = "4")]
    pub stderr_stream_name: String,
}

/// Terminal payload of a finished operation
#[derive(Clone, PartialEq, prost::Message)]
pub struct ExecuteResponse {
    #[prost(message, optional, tag = "1")]
    pub result: Option<ActionResult>,
    #[prost(bool, tag = "2")]
    pub cached_result: bool,
    #[prost(message, optional, tag = "3")]
    pub status: Option<StatusProto>,
    #[prost(string, tag = "5")]
    pub message: String,
}

proto_name!(REAPI_PACKAGE => ExecuteRequest, WaitExecutionRequest, ExecuteOperationMetadata, ExecuteResponse);

/// Outcome carried by a done operation
#[derive(Clone, PartialEq, prost::Oneof)]
pub enum OperationResult {
    #[prost(message, tag = "4")]
    Error(StatusProto),
    #[prost(message, tag = "5")]
    Response(Any),
}

/// One update of the execution stream
#[derive(Clone, PartialEq, prost::Message)]
pub struct Operation {
    /// Server-assigned name; stable identity used for reattachment
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub metadata: Option<Any>,
    #[prost(bool, tag = "3")]
    pub done: bool,
    #[prost(oneof = "OperationResult", tags = "4, 5")]
    pub result: Option<OperationResult>,
}

proto_name!("google.longrunning" => Operation);
