//! In-process execution service that plays back scripted streams
//!
//! Used by drivers and tests in place of a real server. Each Execute or
//! WaitExecution call takes the next queued script (or a failure to open the
//! stream); Execute falls back to a per-request script builder when the queue
//! is empty.

use crate::service::{ExecutionService, OperationStream};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use remex_core::{
    ActionResult, ExecuteOperationMetadata, ExecuteRequest, ExecuteResponse, ExecutionStage,
    Operation, OperationResult, ProtoMessage, Status, StatusProto, WaitExecutionRequest,
};
use std::collections::VecDeque;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
enum Step {
    Operation(Operation),
    Fail(Status),
    Sleep(Duration),
    Hang,
}

/// Sequence of events delivered on one stream
///
/// The stream ends after the last step.
#[derive(Debug, Clone, Default)]
pub struct Script {
    steps: Vec<Step>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queued, executing, then a successful completion
    pub fn successful(name: &str, result: ActionResult) -> Self {
        Self::new()
            .progress(name, ExecutionStage::Queued)
            .progress(name, ExecutionStage::Executing)
            .complete(name, result)
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.steps.push(Step::Operation(operation));
        self
    }

    /// A not-yet-done update at `stage`
    pub fn progress(self, name: &str, stage: ExecutionStage) -> Self {
        self.operation(progress_operation(name, stage))
    }

    /// A done update carrying `result` with an OK status
    pub fn complete(self, name: &str, result: ActionResult) -> Self {
        self.operation(completed_operation(
            name,
            ExecuteResponse {
                result: Some(result),
                status: Some(StatusProto::ok()),
                ..Default::default()
            },
        ))
    }

    /// A done update whose response carries a non-OK status
    pub fn complete_with_status(self, name: &str, status: Status) -> Self {
        self.operation(completed_operation(
            name,
            ExecuteResponse {
                status: Some(status.into()),
                ..Default::default()
            },
        ))
    }

    /// Break the stream with `status`
    pub fn fail(mut self, status: Status) -> Self {
        self.steps.push(Step::Fail(status));
        self
    }

    pub fn sleep(mut self, duration: Duration) -> Self {
        self.steps.push(Step::Sleep(duration));
        self
    }

    /// Block until the stream is cancelled
    pub fn hang(mut self) -> Self {
        self.steps.push(Step::Hang);
        self
    }

    fn into_stream(self, cancel: CancellationToken) -> OperationStream {
        stream::unfold(
            (self.steps.into_iter(), cancel),
            |(mut steps, cancel)| async move {
                loop {
                    let item = match steps.next()? {
                        Step::Operation(operation) => Ok(operation),
                        Step::Fail(status) => Err(status),
                        Step::Sleep(duration) => {
                            tokio::select! {
                                _ = cancel.cancelled() => Err(Status::cancelled("stream cancelled")),
                                _ = tokio::time::sleep(duration) => continue,
                            }
                        }
                        Step::Hang => {
                            cancel.cancelled().await;
                            Err(Status::cancelled("stream cancelled"))
                        }
                    };
                    return Some((item, (steps, cancel)));
                }
            },
        )
        .boxed()
    }
}

/// Operation update at a non-terminal stage
pub fn progress_operation(name: &str, stage: ExecutionStage) -> Operation {
    let metadata = ExecuteOperationMetadata {
        stage: stage.into(),
        ..Default::default()
    };
    Operation {
        name: name.to_string(),
        metadata: Some(metadata.to_any()),
        done: false,
        result: None,
    }
}

/// Done operation update carrying `response`
pub fn completed_operation(name: &str, response: ExecuteResponse) -> Operation {
    let metadata = ExecuteOperationMetadata {
        stage: ExecutionStage::Completed.into(),
        ..Default::default()
    };
    Operation {
        name: name.to_string(),
        metadata: Some(metadata.to_any()),
        done: true,
        result: Some(OperationResult::Response(response.to_any())),
    }
}

type ScriptBuilder = Box<dyn Fn(&ExecuteRequest) -> Script + Send + Sync>;

/// Scripted [`ExecutionService`]
#[derive(Default)]
pub struct ScriptedExecutionService {
    execute_scripts: Mutex<VecDeque<Result<Script, Status>>>,
    wait_scripts: Mutex<VecDeque<Result<Script, Status>>>,
    execute_fallback: Option<ScriptBuilder>,
    execute_requests: Mutex<Vec<ExecuteRequest>>,
    wait_requests: Mutex<Vec<WaitExecutionRequest>>,
}

impl ScriptedExecutionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the script for any Execute call that has no queued script
    pub fn with_execute_fallback<F>(mut self, build: F) -> Self
    where
        F: Fn(&ExecuteRequest) -> Script + Send + Sync + 'static,
    {
        self.execute_fallback = Some(Box::new(build));
        self
    }

    pub fn push_execute(&self, script: Script) {
        self.execute_scripts.lock().push_back(Ok(script));
    }

    /// Make the next Execute call fail to open a stream
    pub fn fail_next_execute(&self, status: Status) {
        self.execute_scripts.lock().push_back(Err(status));
    }

    pub fn push_wait_execution(&self, script: Script) {
        self.wait_scripts.lock().push_back(Ok(script));
    }

    pub fn fail_next_wait_execution(&self, status: Status) {
        self.wait_scripts.lock().push_back(Err(status));
    }

    pub fn execute_requests(&self) -> Vec<ExecuteRequest> {
        self.execute_requests.lock().clone()
    }

    pub fn wait_execution_requests(&self) -> Vec<WaitExecutionRequest> {
        self.wait_requests.lock().clone()
    }
}

#[async_trait]
impl ExecutionService for ScriptedExecutionService {
    async fn execute(
        &self,
        request: ExecuteRequest,
        cancel: CancellationToken,
    ) -> Result<OperationStream, Status> {
        let queued = self.execute_scripts.lock().pop_front();
        let script = match (queued, &self.execute_fallback) {
            (Some(script), _) => script?,
            (None, Some(build)) => build(&request),
            (None, None) => return Err(Status::unavailable("no scripted Execute response")),
        };
        self.execute_requests.lock().push(request);
        Ok(script.into_stream(cancel))
    }

    async fn wait_execution(
        &self,
        request: WaitExecutionRequest,
        cancel: CancellationToken,
    ) -> Result<OperationStream, Status> {
        let script = self
            .wait_scripts
            .lock()
            .pop_front()
            .ok_or_else(|| Status::unavailable("no scripted WaitExecution response"))??;
        self.wait_requests.lock().push(request);
        Ok(script.into_stream(cancel))
    }
}
