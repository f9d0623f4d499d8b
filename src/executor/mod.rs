//! Task execution engine
//!
//! Handles the task lifecycle:
//! - Registering runnable task definitions by name
//! - Admitting start/kill/log requests from the scheduling center
//! - Dispatching job bodies for independent concurrent execution
//! - Keeping the executor registered with the center and reporting
//!   completions back

mod registry;
mod runner;
mod state;

pub use registry::{FnHandler, HandlerFuture, JobContext, JobHandler, TaskRegistry};
pub use state::{DuplicatePolicy, ExecutorState, RunningTable, TaskInstance};

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::center::{CallbackReporter, CenterClient, Registrar};
use crate::config::ExecutorConfig;
use crate::error::Result;
use crate::protocol::{ApiResponse, KillRequest, LogRequest, LogResponse, RunRequest};
use crate::server;

// ─────────────────────────────────────────────────────────────────
// Executor
// ─────────────────────────────────────────────────────────────────

/// The executor runtime: owns the shared lifecycle state, the center
/// client, and the configuration. Constructed once at startup; the
/// embedding application registers its handlers and calls [`run`].
///
/// [`run`]: Executor::run
pub struct Executor {
    config: ExecutorConfig,
    state: Arc<ExecutorState>,
    center: Arc<CenterClient>,
    reporter: CallbackReporter,
}

impl Executor {
    /// Build an executor from configuration
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        let center = Arc::new(CenterClient::new(
            config.center.address.as_str(),
            config.center.request_timeout(),
        )?);
        let reporter = CallbackReporter::new(center.clone());
        let state = Arc::new(ExecutorState::new(config.executor.duplicate_policy()));

        Ok(Self {
            config,
            state,
            center,
            reporter,
        })
    }

    /// Register a task definition under a name; last registration wins
    pub fn register(&self, name: impl Into<String>, handler: Arc<dyn JobHandler>) {
        let name = name.into();
        debug!(handler = %name, "Handler registered");
        self.state.register(name, handler);
    }

    /// Register a plain async closure as a task definition
    pub fn register_fn<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        let handler = FnHandler::new(move |ctx| -> HandlerFuture { Box::pin(f(ctx)) });
        self.register(name, Arc::new(handler));
    }

    /// Shared lifecycle state (dependency injection for tests and the
    /// control surface)
    pub fn state(&self) -> Arc<ExecutorState> {
        self.state.clone()
    }

    /// The loaded configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────
    // Control-Surface Operations
    // ─────────────────────────────────────────────────────────────

    /// Start operation: admit the request, dispatch the body, respond
    /// immediately. Fire-and-forget — the response never waits for the
    /// body.
    pub fn start_job(&self, request: RunRequest) -> ApiResponse {
        let job_id = request.job_id;
        let handler = request.executor_handler.clone();

        match self.state.start(request) {
            Ok(instance) => {
                info!(job_id, handler = %handler, "Job accepted");
                runner::dispatch(self.state.clone(), self.reporter.clone(), instance);
                ApiResponse::success()
            }
            Err(e) => {
                warn!(job_id, handler = %handler, error = %e, "Start refused");
                ApiResponse::failure(e.to_string())
            }
        }
    }

    /// Kill operation: signal the instance's cancellation token and drop
    /// its bookkeeping entry. Cooperative — the body must observe the
    /// token.
    pub fn kill_job(&self, request: KillRequest) -> ApiResponse {
        match self.state.kill(request.job_id) {
            Ok(instance) => {
                info!(job_id = request.job_id, handler = %instance.name, "Job cancelled");
                ApiResponse::success()
            }
            Err(e) => {
                warn!(job_id = request.job_id, error = %e, "Kill refused");
                ApiResponse::failure(e.to_string())
            }
        }
    }

    /// Log operation: log storage belongs to an external collaborator;
    /// this surface returns a well-formed empty page.
    pub fn read_log(&self, request: LogRequest) -> ApiResponse<LogResponse> {
        debug!(
            log_id = request.log_id,
            from_line_num = request.from_line_num,
            "Log query"
        );
        ApiResponse::success_with(LogResponse::empty(request.from_line_num))
    }

    // ─────────────────────────────────────────────────────────────
    // Runtime
    // ─────────────────────────────────────────────────────────────

    /// Serve the control surface and run the registrar until a shutdown
    /// signal arrives. On shutdown, running instances are cancelled and
    /// the executor de-registers best-effort.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let registrar = Arc::new(Registrar::new(
            self.center.clone(),
            self.config.executor.registry_key(),
            self.config.executor.advertised_address(),
            self.config.center.heartbeat_interval(),
        )?);

        let beat = registrar.clone();
        let registrar_task = tokio::spawn(async move { beat.run().await });

        let bind_addr = self.config.executor.bind_addr()?;
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        info!(
            addr = %bind_addr,
            handlers = ?self.state.handler_names(),
            "Control surface listening"
        );

        let app = server::router(self.clone());
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Shutdown signal received");
        registrar_task.abort();

        let cancelled = self.state.cancel_all();
        if cancelled > 0 {
            info!(count = cancelled, "Cancelled running instances");
        }

        registrar.deregister().await;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        // Fall back to never resolving; the process is killed externally.
        std::future::pending::<()>().await;
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
