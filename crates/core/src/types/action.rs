//! Action, Command and ActionResult messages

use super::digest::Digest;
use super::message::{proto_name, REAPI_PACKAGE};
use prost_types::Timestamp;
use std::time::{Duration, SystemTime};

/// A unit of remote work: a command run against an input root
#[derive(Clone, PartialEq, prost::Message)]
pub struct Action {
    #[prost(message, optional, tag = "1")]
    pub command_digest: Option<Digest>,
    #[prost(message, optional, tag = "2")]
    pub input_root_digest: Option<Digest>,
    #[prost(message, optional, tag = "6")]
    pub timeout: Option<prost_types::Duration>,
    #[prost(bool, tag = "7")]
    pub do_not_cache: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct EnvironmentVariable {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Property {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Platform {
    #[prost(message, repeated, tag = "1")]
    pub properties: Vec<Property>,
}

/// Argv, environment and declared outputs of an action
#[derive(Clone, PartialEq, prost::Message)]
pub struct Command {
    #[prost(string, repeated, tag = "1")]
    pub arguments: Vec<String>,
    #[prost(message, repeated, tag = "2")]
    pub environment_variables: Vec<EnvironmentVariable>,
    #[prost(string, repeated, tag = "3")]
    pub output_files: Vec<String>,
    #[prost(string, repeated, tag = "4")]
    pub output_directories: Vec<String>,
    #[prost(message, optional, tag = "5")]
    pub platform: Option<Platform>,
    #[prost(string, tag = "6")]
    pub working_directory: String,
}

proto_name!(REAPI_PACKAGE => Action, Command, ActionResult);

impl Command {
    pub fn new<I, S>(arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            arguments: arguments.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Add an environment variable, keeping variables sorted by name
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_variables.push(EnvironmentVariable {
            name: name.into(),
            value: value.into(),
        });
        self.environment_variables.sort_by(|a, b| a.name.cmp(&b.name));
        self
    }

    pub fn with_output_file(mut self, path: impl Into<String>) -> Self {
        self.output_files.push(path.into());
        self
    }

    pub fn with_output_directory(mut self, path: impl Into<String>) -> Self {
        self.output_directories.push(path.into());
        self
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OutputFile {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(message, optional, tag = "2")]
    pub digest: Option<Digest>,
    #[prost(bool, tag = "4")]
    pub is_executable: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OutputDirectory {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(message, optional, tag = "3")]
    pub tree_digest: Option<Digest>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OutputSymlink {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(string, tag = "2")]
    pub target: String,
}

/// Server-side timestamps of one execution
#[derive(Clone, PartialEq, prost::Message)]
pub struct ExecutedActionMetadata {
    #[prost(string, tag = "1")]
    pub worker: String,
    #[prost(message, optional, tag = "2")]
    pub queued_timestamp: Option<Timestamp>,
    #[prost(message, optional, tag = "3")]
    pub worker_start_timestamp: Option<Timestamp>,
    #[prost(message, optional, tag = "4")]
    pub worker_completed_timestamp: Option<Timestamp>,
    #[prost(message, optional, tag = "5")]
    pub input_fetch_start_timestamp: Option<Timestamp>,
    #[prost(message, optional, tag = "6")]
    pub input_fetch_completed_timestamp: Option<Timestamp>,
    #[prost(message, optional, tag = "7")]
    pub execution_start_timestamp: Option<Timestamp>,
    #[prost(message, optional, tag = "8")]
    pub execution_completed_timestamp: Option<Timestamp>,
    #[prost(message, optional, tag = "9")]
    pub output_upload_start_timestamp: Option<Timestamp>,
    #[prost(message, optional, tag = "10")]
    pub output_upload_completed_timestamp: Option<Timestamp>,
}

fn span(start: Option<&Timestamp>, end: Option<&Timestamp>) -> Option<Duration> {
    let start = SystemTime::try_from(start?.clone()).ok()?;
    let end = SystemTime::try_from(end?.clone()).ok()?;
    end.duration_since(start).ok()
}

impl ExecutedActionMetadata {
    /// Time between queueing and a worker picking the action up
    pub fn queued_duration(&self) -> Option<Duration> {
        span(
            self.queued_timestamp.as_ref(),
            self.worker_start_timestamp.as_ref(),
        )
    }

    pub fn input_fetch_duration(&self) -> Option<Duration> {
        span(
            self.input_fetch_start_timestamp.as_ref(),
            self.input_fetch_completed_timestamp.as_ref(),
        )
    }

    pub fn execution_duration(&self) -> Option<Duration> {
        span(
            self.execution_start_timestamp.as_ref(),
            self.execution_completed_timestamp.as_ref(),
        )
    }

    pub fn output_upload_duration(&self) -> Option<Duration> {
        span(
            self.output_upload_start_timestamp.as_ref(),
            self.output_upload_completed_timestamp.as_ref(),
        )
    }

    /// Time the worker spent on the action, from pickup to completion
    pub fn worker_duration(&self) -> Option<Duration> {
        span(
            self.worker_start_timestamp.as_ref(),
            self.worker_completed_timestamp.as_ref(),
        )
    }
}

/// Outcome of an executed action
#[derive(Clone, PartialEq, prost::Message)]
pub struct ActionResult {
    #[prost(message, repeated, tag = "2")]
    pub output_files: Vec<OutputFile>,
    #[prost(message, repeated, tag = "3")]
    pub output_directories: Vec<OutputDirectory>,
    #[prost(int32, tag = "4")]
    pub exit_code: i32,
    #[prost(message, optional, tag = "6")]
    pub stdout_digest: Option<Digest>,
    #[prost(message, optional, tag = "8")]
    pub stderr_digest: Option<Digest>,
    #[prost(message, optional, tag = "9")]
    pub execution_metadata: Option<ExecutedActionMetadata>,
    #[prost(message, repeated, tag = "12")]
    pub output_symlinks: Vec<OutputSymlink>,
}
