//! Task execution runner
//!
//! Fire-and-forget dispatch: each admitted instance runs on its own
//! tokio task, independent of the control-surface request that started
//! it. The completion continuation always runs exactly once — it drops
//! the bookkeeping entry and reports the outcome to the scheduling
//! center, whatever the body returned.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::center::CallbackReporter;
use crate::error::Error;
use crate::protocol::{CODE_FAILURE, CODE_SUCCESS};

use super::state::{ExecutorState, TaskInstance};

/// Dispatch an admitted instance for independent concurrent execution.
///
/// Returns immediately; the caller (the start operation) does not wait
/// for the body.
pub fn dispatch(
    state: Arc<ExecutorState>,
    reporter: CallbackReporter,
    instance: TaskInstance,
) -> JoinHandle<()> {
    tokio::spawn(execute_instance(state, reporter, instance))
}

async fn execute_instance(
    state: Arc<ExecutorState>,
    reporter: CallbackReporter,
    instance: TaskInstance,
) {
    let job_id = instance.job_id;
    let log_id = instance.request.log_id;
    let ctx = instance.context();

    info!(job_id, handler = %instance.name, "Job body started");

    let result = if instance.request.executor_timeout > 0 {
        let limit = Duration::from_secs(instance.request.executor_timeout as u64);
        match tokio::time::timeout(limit, instance.handler.execute(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                job_id,
                timeout_secs: limit.as_secs(),
            }),
        }
    } else {
        instance.handler.execute(ctx).await
    };

    let elapsed_ms = instance.started_at.elapsed().as_millis() as u64;

    let (code, msg) = match result {
        Ok(output) => {
            info!(job_id, handler = %instance.name, elapsed_ms, "Job completed");
            let msg = if output.is_empty() { None } else { Some(output) };
            (CODE_SUCCESS, msg)
        }
        Err(e) => {
            error!(job_id, handler = %instance.name, elapsed_ms, error = %e, "Job failed");
            (CODE_FAILURE, Some(e.to_string()))
        }
    };

    // Drop the bookkeeping entry first; a kill or a replacement start
    // may already have taken it, in which case this is a no-op.
    state.complete(job_id, instance.instance_id);

    // Exactly once per dispatched instance, success and failure alike.
    reporter.report(job_id, log_id, code, msg).await;
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
