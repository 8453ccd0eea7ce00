//! Results published on a command's status channel

use remex_core::{ActionResult, Error, ExecutedActionMetadata, ExecutionStage};
use std::fmt;
use std::time::{Duration, Instant};

/// Client-side timing checkpoints of one execution
///
/// Measured with a monotonic clock, so `total` always equals
/// `time_to_accepted + accepted_to_finished`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalStats {
    /// Time for the Execute call to return an open stream
    pub execute_rpc_started: Duration,
    /// Time from issuing Execute until the operation was first named
    pub time_to_accepted: Duration,
    pub accepted_to_finished: Duration,
    pub total: Duration,
}

impl LocalStats {
    pub(crate) fn measure(
        before_execute: Instant,
        after_execute: Instant,
        accepted: Instant,
        finished: Instant,
    ) -> Self {
        Self {
            execute_rpc_started: after_execute.saturating_duration_since(before_execute),
            time_to_accepted: accepted.saturating_duration_since(before_execute),
            accepted_to_finished: finished.saturating_duration_since(accepted),
            total: finished.saturating_duration_since(before_execute),
        }
    }
}

/// Local checkpoints merged with the phases reported by the worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsBreakdown {
    pub local: LocalStats,
    pub queued: Option<Duration>,
    pub input_fetch: Option<Duration>,
    pub execution: Option<Duration>,
    pub output_upload: Option<Duration>,
    pub worker: Option<Duration>,
    /// Time between acceptance and completion not spent on the worker
    pub overhead: Option<Duration>,
}

/// One update of a command's progress
///
/// Intermediate updates carry only the stage. The terminal update has stage
/// `Completed` and either an error or the full result.
#[derive(Debug, Default)]
pub struct CommandResult {
    pub command_name: String,
    pub instance_name: String,
    pub stage: ExecutionStage,
    /// Server-assigned operation name, once known
    pub operation_name: Option<String>,
    pub error: Option<Error>,
    pub executor: String,
    pub exit_code: i32,
    pub action_result: Option<ActionResult>,
    pub local_stats: LocalStats,
    pub remote_stats: Option<ExecutedActionMetadata>,
}

impl CommandResult {
    pub(crate) fn progress(stage: ExecutionStage) -> Self {
        Self {
            stage,
            ..Default::default()
        }
    }

    pub(crate) fn failed(error: Error) -> Self {
        Self {
            stage: ExecutionStage::Completed,
            error: Some(error),
            ..Default::default()
        }
    }

    pub(crate) fn completed(action_result: Option<ActionResult>, local_stats: LocalStats) -> Self {
        let remote_stats = action_result
            .as_ref()
            .and_then(|result| result.execution_metadata.clone());
        Self {
            stage: ExecutionStage::Completed,
            executor: remote_stats
                .as_ref()
                .map(|meta| meta.worker.clone())
                .unwrap_or_default(),
            exit_code: action_result.as_ref().map_or(0, |result| result.exit_code),
            action_result,
            local_stats,
            remote_stats,
            ..Default::default()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Whether the action ran to completion with exit code zero
    pub fn is_success(&self) -> bool {
        self.is_terminal() && self.error.is_none() && self.exit_code == 0
    }

    pub fn stats(&self) -> StatsBreakdown {
        let remote = self.remote_stats.as_ref();
        let worker = remote.and_then(ExecutedActionMetadata::worker_duration);
        StatsBreakdown {
            local: self.local_stats,
            queued: remote.and_then(ExecutedActionMetadata::queued_duration),
            input_fetch: remote.and_then(ExecutedActionMetadata::input_fetch_duration),
            execution: remote.and_then(ExecutedActionMetadata::execution_duration),
            output_upload: remote.and_then(ExecutedActionMetadata::output_upload_duration),
            worker,
            overhead: worker.map(|w| self.local_stats.accepted_to_finished.saturating_sub(w)),
        }
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(error) => write!(f, "{error}"),
            None => write!(f, "exit code {}", self.exit_code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use prost_types::Timestamp;
    use remex_core::{Code, Status};

    fn seconds_after(secs: i64) -> Timestamp {
        Timestamp {
            seconds: 1_700_000_000 + secs,
            nanos: 0,
        }
    }

    proptest! {
        #[test]
        fn test_total_is_sum_of_parts(
            rpc in 0u64..10_000,
            accept in 0u64..10_000,
            finish in 0u64..10_000,
        ) {
            let before = Instant::now();
            let after = before + Duration::from_micros(rpc);
            let accepted = after + Duration::from_micros(accept);
            let finished = accepted + Duration::from_micros(finish);

            let stats = LocalStats::measure(before, after, accepted, finished);
            prop_assert_eq!(stats.total, stats.time_to_accepted + stats.accepted_to_finished);
            prop_assert!(stats.total >= stats.execute_rpc_started);
        }
    }

    #[test]
    fn test_display_prefers_error() {
        let ok = CommandResult {
            exit_code: 3,
            ..CommandResult::progress(ExecutionStage::Completed)
        };
        assert_eq!(ok.to_string(), "exit code 3");

        let failed = CommandResult::failed(Error::remote_execution_failed(Status::new(
            Code::ResourceExhausted,
            "no workers",
        )));
        assert!(failed.to_string().contains("no workers"));
        assert!(!failed.is_success());
    }

    #[test]
    fn test_stats_overhead_excludes_worker_time() {
        let metadata = ExecutedActionMetadata {
            worker: "worker-7".to_string(),
            worker_start_timestamp: Some(seconds_after(0)),
            worker_completed_timestamp: Some(seconds_after(3)),
            ..Default::default()
        };
        let local = LocalStats {
            accepted_to_finished: Duration::from_secs(5),
            total: Duration::from_secs(6),
            ..Default::default()
        };
        let result = CommandResult::completed(
            Some(ActionResult {
                execution_metadata: Some(metadata),
                ..Default::default()
            }),
            local,
        );

        assert_eq!(result.executor, "worker-7");
        let stats = result.stats();
        assert_eq!(stats.worker, Some(Duration::from_secs(3)));
        assert_eq!(stats.overhead, Some(Duration::from_secs(2)));
        assert_eq!(stats.queued, None);
    }
}
