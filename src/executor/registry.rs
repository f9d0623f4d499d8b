//! Task registry and the job handler contract
//!
//! A task definition is a named, registered executable unit supplied by
//! the embedding application. The registry is populated before the
//! control surface starts serving and is read-mostly afterwards; callers
//! serialize access through [`ExecutorState`](super::ExecutorState).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

// ─────────────────────────────────────────────────────────────────
// Job Context
// ─────────────────────────────────────────────────────────────────

/// Execution context handed to a job handler.
///
/// Cancellation is cooperative: `kill` fires the token once, and the
/// handler body is responsible for observing it. A body that never
/// checks the token runs to completion regardless of a kill request.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Job identifier from the start request
    pub job_id: i64,

    /// Opaque parameter string from the start request
    pub params: String,

    /// Log identifier from the start request
    pub log_id: i64,

    /// One-shot cancellation signal for this instance
    pub cancel: CancellationToken,
}

impl JobContext {
    /// Whether cancellation has been requested for this instance
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolve when cancellation is requested; for use in `select!`
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

// ─────────────────────────────────────────────────────────────────
// Handler Contract
// ─────────────────────────────────────────────────────────────────

/// An executable unit runnable by name.
///
/// The returned string is the result payload reported back to the
/// scheduling center; an `Err` marks the instance as failed.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn execute(&self, ctx: JobContext) -> Result<String>;
}

/// Boxed future returned by closure-based handlers
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

/// Adapter so a plain closure can be registered as a handler
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(JobContext) -> HandlerFuture + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> JobHandler for FnHandler<F>
where
    F: Fn(JobContext) -> HandlerFuture + Send + Sync,
{
    async fn execute(&self, ctx: JobContext) -> Result<String> {
        (self.f)(ctx).await
    }
}

// ─────────────────────────────────────────────────────────────────
// Task Registry
// ─────────────────────────────────────────────────────────────────

/// Mapping from task name to task definition.
///
/// No lock of its own: mutation and lookup are serialized by the
/// surrounding executor state.
#[derive(Default)]
pub struct TaskRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a definition; last registration wins
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    /// Look up a definition by name
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Whether a definition is registered under this name
    pub fn exists(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Names of all registered definitions
    pub fn names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
