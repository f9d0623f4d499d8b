//! Task-lifecycle state tracking
//!
//! Holds the two shared tables of the engine: the registry of runnable
//! task definitions and the table of in-flight task instances. Both sit
//! behind one reader/writer lock so "handler exists" and "job running"
//! checks observe a consistent snapshot relative to concurrent start and
//! kill requests. The lock is held only for table reads and mutations,
//! never across network I/O or task-body execution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::RunRequest;

use super::registry::{JobContext, JobHandler, TaskRegistry};

// ─────────────────────────────────────────────────────────────────
// Duplicate-Start Policy
// ─────────────────────────────────────────────────────────────────

/// Policy applied when a start request names a job id that already has a
/// live entry in the running table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Overwrite the bookkeeping entry. The prior body keeps running but
    /// can no longer be addressed by kill, and its completion cannot
    /// remove the new entry.
    #[default]
    Replace,

    /// Refuse the start request with a failure response.
    Reject,
}

impl DuplicatePolicy {
    /// Parse a policy name as it appears in configuration
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "replace" => Some(DuplicatePolicy::Replace),
            "reject" => Some(DuplicatePolicy::Reject),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicatePolicy::Replace => "replace",
            DuplicatePolicy::Reject => "reject",
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Task Instance
// ─────────────────────────────────────────────────────────────────

/// One running (or about-to-run) execution bound to a job identifier.
///
/// Created per start request by binding a registered definition to the
/// request and a fresh cancellation token. Cheap to clone; the running
/// table keeps one copy for bookkeeping while the dispatched body
/// consumes another.
#[derive(Clone)]
pub struct TaskInstance {
    /// Job identifier from the start request
    pub job_id: i64,

    /// Name of the handler this instance executes
    pub name: String,

    /// The full start request
    pub request: RunRequest,

    /// One-shot cancellation signal for this instance
    pub cancel: CancellationToken,

    /// Distinguishes this instance from a later one for the same job id
    pub instance_id: Uuid,

    /// The executable unit
    pub handler: Arc<dyn JobHandler>,

    /// When the instance was created
    pub started_at: Instant,
}

impl std::fmt::Debug for TaskInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskInstance")
            .field("job_id", &self.job_id)
            .field("name", &self.name)
            .field("request", &self.request)
            .field("cancel", &self.cancel)
            .field("instance_id", &self.instance_id)
            .field("handler", &"Arc<dyn JobHandler>")
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl TaskInstance {
    /// Bind a registered definition to a start request
    pub fn new(request: RunRequest, handler: Arc<dyn JobHandler>) -> Self {
        Self {
            job_id: request.job_id,
            name: request.executor_handler.clone(),
            cancel: CancellationToken::new(),
            instance_id: Uuid::new_v4(),
            handler,
            started_at: Instant::now(),
            request,
        }
    }

    /// Build the execution context passed to the handler body
    pub fn context(&self) -> JobContext {
        JobContext {
            job_id: self.job_id,
            params: self.request.executor_params.clone(),
            log_id: self.request.log_id,
            cancel: self.cancel.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Running Table
// ─────────────────────────────────────────────────────────────────

/// Table of in-flight task instances keyed by job identifier.
///
/// Invariant: at most one live entry per job id. No lock of its own;
/// serialized by [`ExecutorState`].
#[derive(Default)]
pub struct RunningTable {
    entries: HashMap<i64, TaskInstance>,
}

impl RunningTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an instance, returning the entry it replaced (if any)
    pub fn put(&mut self, instance: TaskInstance) -> Option<TaskInstance> {
        self.entries.insert(instance.job_id, instance)
    }

    pub fn get(&self, job_id: i64) -> Option<&TaskInstance> {
        self.entries.get(&job_id)
    }

    pub fn remove(&mut self, job_id: i64) -> Option<TaskInstance> {
        self.entries.remove(&job_id)
    }

    pub fn contains(&self, job_id: i64) -> bool {
        self.entries.contains_key(&job_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove the entry for `job_id` only if it still belongs to the
    /// given instance. Keeps a finished body from clobbering the entry
    /// of a replacement started under the same job id.
    pub fn remove_instance(&mut self, job_id: i64, instance_id: Uuid) -> bool {
        match self.entries.get(&job_id) {
            Some(entry) if entry.instance_id == instance_id => {
                self.entries.remove(&job_id);
                true
            }
            _ => false,
        }
    }

    /// Signal cancellation on every live entry and drain the table
    pub fn cancel_all(&mut self) -> usize {
        let count = self.entries.len();
        for (_, entry) in self.entries.drain() {
            entry.cancel.cancel();
        }
        count
    }
}

// ─────────────────────────────────────────────────────────────────
// Executor State
// ─────────────────────────────────────────────────────────────────

/// Process-wide shared state of the engine: registry + running table
/// under a single reader/writer lock. Constructed per executor and
/// passed explicitly to everything that needs it, so tests can build
/// isolated instances per scenario.
pub struct ExecutorState {
    tables: RwLock<Tables>,
    policy: DuplicatePolicy,
}

struct Tables {
    registry: TaskRegistry,
    running: RunningTable,
}

impl ExecutorState {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            tables: RwLock::new(Tables {
                registry: TaskRegistry::new(),
                running: RunningTable::new(),
            }),
            policy,
        }
    }

    /// The configured duplicate-start policy
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Register a task definition; last registration wins
    pub fn register(&self, name: impl Into<String>, handler: Arc<dyn JobHandler>) {
        self.tables.write().registry.register(name, handler);
    }

    /// Whether a definition is registered under this name
    pub fn handler_exists(&self, name: &str) -> bool {
        self.tables.read().registry.exists(name)
    }

    /// Names of all registered definitions
    pub fn handler_names(&self) -> Vec<String> {
        self.tables.read().registry.names()
    }

    /// Whether a job id has a live entry in the running table
    pub fn is_running(&self, job_id: i64) -> bool {
        self.tables.read().running.contains(job_id)
    }

    /// Number of live entries in the running table
    pub fn running_count(&self) -> usize {
        self.tables.read().running.len()
    }

    /// Admit a start request: look up the handler, apply the duplicate
    /// policy, insert the new instance. Returns the instance for
    /// dispatch; the table keeps its own copy.
    pub fn start(&self, request: RunRequest) -> Result<TaskInstance> {
        let mut tables = self.tables.write();

        let handler = tables
            .registry
            .lookup(&request.executor_handler)
            .ok_or_else(|| Error::UnknownHandler {
                name: request.executor_handler.clone(),
            })?;

        if tables.running.contains(request.job_id) && self.policy == DuplicatePolicy::Reject {
            return Err(Error::DuplicateJob {
                job_id: request.job_id,
            });
        }

        let instance = TaskInstance::new(request, handler);
        if tables.running.put(instance.clone()).is_some() {
            // Replace policy: the prior body keeps running but loses its
            // bookkeeping entry.
            debug!(job_id = instance.job_id, "Running entry overwritten by duplicate start");
        }
        Ok(instance)
    }

    /// Cancel a running instance: signal its token and remove the entry.
    /// Cancellation is cooperative; the body observes the token.
    pub fn kill(&self, job_id: i64) -> Result<TaskInstance> {
        let mut tables = self.tables.write();

        let instance = tables
            .running
            .remove(job_id)
            .ok_or(Error::JobNotRunning { job_id })?;
        instance.cancel.cancel();
        Ok(instance)
    }

    /// Completion continuation hook: drop the bookkeeping entry if it
    /// still belongs to the finishing instance.
    pub fn complete(&self, job_id: i64, instance_id: Uuid) -> bool {
        self.tables.write().running.remove_instance(job_id, instance_id)
    }

    /// Cancel every live instance (graceful shutdown)
    pub fn cancel_all(&self) -> usize {
        self.tables.write().running.cancel_all()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
