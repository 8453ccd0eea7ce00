//! Execution handle for one remotely executed action
//!
//! A [`Command`] issues the Execute RPC and hands progress to a background
//! listener task. The listener publishes the operation name once on the
//! accepted channel and every stage transition on the status channel,
//! ending with exactly one terminal [`CommandResult`] after which the status
//! channel is closed. If the stream breaks, the caller can reattach with
//! [`Command::replace_wait_using_wait_execution_api`].

use crate::result::{CommandResult, LocalStats};
use crate::service::{ExecutionService, OperationStream};
use futures::StreamExt;
use parking_lot::Mutex;
use remex_core::{
    Any, Code, Error, ExecuteOperationMetadata, ExecuteRequest, ExecuteResponse, ExecutionStage,
    InstanceNameDigest, Operation, OperationResult, ProtoMessage, Result, Status,
    WaitExecutionRequest,
};
use remex_utils::tracing::command_span;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn, Instrument};

/// Handle for a remotely executed command
pub struct Command {
    name: String,
    action_digest: InstanceNameDigest,
    skip_cache_lookup: bool,
    service: Arc<dyn ExecutionService>,
    operation_name: Arc<Mutex<Option<String>>>,
    attempt: Option<Attempt>,
}

struct Attempt {
    parent: CancellationToken,
    cancel: CancellationToken,
    before_execute: Instant,
    after_execute: Instant,
}

impl Command {
    pub(crate) fn new(
        name: impl Into<String>,
        action_digest: InstanceNameDigest,
        skip_cache_lookup: bool,
        service: Arc<dyn ExecutionService>,
    ) -> Self {
        Self {
            name: name.into(),
            action_digest,
            skip_cache_lookup,
            service,
            operation_name: Arc::new(Mutex::new(None)),
            attempt: None,
        }
    }

    /// Local name to aid debugging
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action_digest(&self) -> &InstanceNameDigest {
        &self.action_digest
    }

    /// Server-assigned operation name, once the command has been accepted
    pub fn operation_name(&self) -> Option<String> {
        self.operation_name.lock().clone()
    }

    /// Issue the Execute RPC and start following its updates
    ///
    /// Returns once the stream is open. Cancelling `parent` ends the stream.
    /// A handle can only be started once.
    pub async fn start(&mut self, parent: &CancellationToken) -> Result<Subscription> {
        if self.attempt.is_some() {
            return Err(Error::precondition(format!(
                "command {:?} has already been started",
                self.name
            )));
        }

        let request = ExecuteRequest {
            instance_name: self.action_digest.instance_name.clone(),
            skip_cache_lookup: self.skip_cache_lookup,
            action_digest: Some(self.action_digest.digest.clone()),
        };

        debug!(
            command = %self.name,
            action_digest = %self.action_digest.hash(),
            "Executing command"
        );

        let cancel = parent.child_token();
        let before_execute = Instant::now();
        let stream = match self.service.execute(request, cancel.clone()).await {
            Ok(stream) => stream,
            Err(status) => {
                cancel.cancel();
                return Err(Error::rpc("Execute", status));
            }
        };
        let after_execute = Instant::now();

        let attempt = self.attempt.insert(Attempt {
            parent: parent.clone(),
            cancel,
            before_execute,
            after_execute,
        });
        Ok(spawn_listener(
            &self.name,
            &self.action_digest.instance_name,
            &self.operation_name,
            attempt,
            stream,
        ))
    }

    /// Abandon the current stream and follow the same operation via WaitExecution
    ///
    /// Only valid once the operation name is known. The previous
    /// [`Subscription`] is superseded; the returned one must be used instead.
    pub async fn replace_wait_using_wait_execution_api(&mut self) -> Result<Subscription> {
        let Some(operation_name) = self.operation_name() else {
            return Err(Error::precondition(format!(
                "operation name for command {:?} is not known; wait for the command to be accepted",
                self.name
            )));
        };
        let Some(attempt) = self.attempt.as_mut() else {
            return Err(Error::precondition(format!(
                "command {:?} has not been started",
                self.name
            )));
        };

        attempt.cancel.cancel();

        debug!(
            command = %self.name,
            operation = %operation_name,
            "Sending WaitExecution request"
        );

        let cancel = attempt.parent.child_token();
        let request = WaitExecutionRequest {
            name: operation_name,
        };
        let stream = match self.service.wait_execution(request, cancel.clone()).await {
            Ok(stream) => stream,
            Err(status) => {
                cancel.cancel();
                return Err(Error::rpc("WaitExecution", status));
            }
        };
        attempt.cancel = cancel;

        Ok(spawn_listener(
            &self.name,
            &self.action_digest.instance_name,
            &self.operation_name,
            attempt,
            stream,
        ))
    }

    /// Stop following the operation; the listener publishes a terminal error
    pub fn cancel(&self) {
        if let Some(attempt) = &self.attempt {
            attempt.cancel.cancel();
        }
    }
}

/// Spawn the one background task that follows `stream`
fn spawn_listener(
    command_name: &str,
    instance_name: &str,
    operation_name: &Arc<Mutex<Option<String>>>,
    attempt: &Attempt,
    stream: OperationStream,
) -> Subscription {
    let (accepted_tx, accepted_rx) = oneshot::channel();
    let (status_tx, status_rx) = mpsc::unbounded_channel();

    let listener = Listener {
        command_name: command_name.to_string(),
        instance_name: instance_name.to_string(),
        operation_name: Arc::clone(operation_name),
        before_execute: attempt.before_execute,
        after_execute: attempt.after_execute,
        cancel: attempt.cancel.clone(),
        accepted: Some(accepted_tx),
        status: status_tx,
        last_stage: ExecutionStage::Unknown,
    };
    tokio::spawn(
        listener
            .run(stream)
            .instrument(command_span(command_name, instance_name)),
    );

    Subscription {
        accepted: Some(accepted_rx),
        status: status_rx,
    }
}

/// Receiving side of one listener's two notification channels
#[derive(Debug)]
pub struct Subscription {
    accepted: Option<oneshot::Receiver<String>>,
    status: mpsc::UnboundedReceiver<CommandResult>,
}

impl Subscription {
    /// Wait for the operation name
    ///
    /// Returns `None` if the listener finished without ever seeing a name, or
    /// if the name was already taken by an earlier call.
    pub async fn wait_accepted(&mut self) -> Option<String> {
        match self.accepted.take() {
            Some(accepted) => accepted.await.ok(),
            None => None,
        }
    }

    /// Next status update; `None` once the channel is closed
    pub async fn recv_status(&mut self) -> Option<CommandResult> {
        self.status.recv().await
    }

    /// Drain the status channel and return the terminal result
    pub async fn wait_for_completion(mut self) -> Result<CommandResult> {
        let mut last = None;
        while let Some(result) = self.status.recv().await {
            last = Some(result);
        }
        match last {
            Some(result) if result.is_terminal() => Ok(result),
            _ => Err(Error::transport_broken(
                None,
                "status channel closed without a terminal result",
            )),
        }
    }
}

struct Listener {
    command_name: String,
    instance_name: String,
    operation_name: Arc<Mutex<Option<String>>>,
    before_execute: Instant,
    after_execute: Instant,
    cancel: CancellationToken,
    accepted: Option<oneshot::Sender<String>>,
    status: mpsc::UnboundedSender<CommandResult>,
    last_stage: ExecutionStage,
}

impl Listener {
    async fn run(mut self, mut stream: OperationStream) {
        let mut accepted_at: Option<Instant> = None;

        let terminal = loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(Status::cancelled("execution stream cancelled")),
                next = stream.next() => next.unwrap_or_else(|| {
                    Err(Status::new(Code::Aborted, "stream ended before the operation completed"))
                }),
            };
            let operation = match next {
                Ok(operation) => operation,
                Err(status) => {
                    warn!(code = ?status.code(), error = %status.message(), "Stream to server broken");
                    let operation = self.operation_name.lock().clone();
                    break CommandResult::failed(Error::transport_broken(
                        operation,
                        format!("{:?}: {}", status.code(), status.message()),
                    ));
                }
            };

            let metadata: ExecuteOperationMetadata =
                match decode_payload("metadata", operation.metadata.as_ref()) {
                    Ok(metadata) => metadata,
                    Err(error) => break CommandResult::failed(error),
                };

            if accepted_at.is_none() && !operation.name.is_empty() {
                accepted_at = Some(Instant::now());
                self.accept(&operation.name);
            }

            if !operation.done {
                self.progress(metadata.stage());
                continue;
            }

            let finished_at = Instant::now();
            break match terminal_response(operation) {
                Ok(response) => {
                    let stats = LocalStats::measure(
                        self.before_execute,
                        self.after_execute,
                        accepted_at.unwrap_or(finished_at),
                        finished_at,
                    );
                    CommandResult::completed(response.result, stats)
                }
                Err(error) => CommandResult::failed(error),
            };
        };

        self.finish(terminal);
    }

    fn accept(&mut self, name: &str) {
        debug!(operation = %name, "Command accepted by the server");
        *self.operation_name.lock() = Some(name.to_string());
        if let Some(accepted) = self.accepted.take() {
            let _ = accepted.send(name.to_string());
        }
    }

    fn progress(&mut self, stage: ExecutionStage) {
        // Completion is only reported by the terminal update
        if stage.is_terminal() || stage < self.last_stage {
            trace!(%stage, last = %self.last_stage, "Ignoring out-of-order stage");
            return;
        }
        self.last_stage = stage;
        self.publish(CommandResult::progress(stage));
    }

    fn finish(mut self, result: CommandResult) {
        self.accepted = None;
        debug!(result = %result, "Command finished");
        self.publish(result);
    }

    fn publish(&self, mut result: CommandResult) {
        result.command_name = self.command_name.clone();
        result.instance_name = self.instance_name.clone();
        result.operation_name = self.operation_name.lock().clone();
        if self.status.send(result).is_err() {
            trace!("Status receiver dropped");
        }
    }
}

fn decode_payload<M: ProtoMessage>(payload: &str, any: Option<&Any>) -> Result<M> {
    let Some(any) = any else {
        return Err(Error::decode(payload, "payload is missing"));
    };
    M::from_any(any).map_err(|error| match error {
        Error::DecodeFailure { message, .. } => Error::decode(payload, message),
        other => Error::decode(payload, other.to_string()),
    })
}

fn terminal_response(operation: Operation) -> Result<ExecuteResponse> {
    let response: ExecuteResponse = match operation.result {
        Some(OperationResult::Response(any)) => decode_payload("response", Some(&any))?,
        Some(OperationResult::Error(status)) => {
            return Err(match status.to_status() {
                Some(status) => Error::remote_execution_failed(status),
                None => Error::decode("response", "operation failed with an OK status"),
            });
        }
        None => return Err(Error::decode("response", "payload is missing")),
    };

    if let Some(status) = response.status.as_ref().and_then(|status| status.to_status()) {
        return Err(Error::remote_execution_failed(status));
    }
    Ok(response)
}
