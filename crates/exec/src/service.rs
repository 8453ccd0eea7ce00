//! The two streaming RPCs of the execution service

use async_trait::async_trait;
use futures::stream::BoxStream;
use remex_core::{ExecuteRequest, Operation, Status, WaitExecutionRequest};
use tokio_util::sync::CancellationToken;

/// Server-push stream of operation updates
pub type OperationStream = BoxStream<'static, Result<Operation, Status>>;

/// Remote execution service as seen by the client
///
/// Both calls return once the stream is open, before the first update.
/// Cancelling `cancel` must end the stream.
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Submit an action and follow its progress
    async fn execute(
        &self,
        request: ExecuteRequest,
        cancel: CancellationToken,
    ) -> Result<OperationStream, Status>;

    /// Follow an operation that was already submitted, by name
    async fn wait_execution(
        &self,
        request: WaitExecutionRequest,
        cancel: CancellationToken,
    ) -> Result<OperationStream, Status>;
}
