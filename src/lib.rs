//! JobHub executor runtime
//!
//! Executor-side library for the JobHub scheduling protocol. An
//! embedding application registers job handlers by name, then runs the
//! executor: it announces itself to the scheduling center on a fixed
//! heartbeat, serves the center's start/kill/log requests on an HTTP
//! control surface, runs job bodies concurrently with cooperative
//! cancellation, and reports every completion back to the center.
//!
//! ```no_run
//! use std::sync::Arc;
//! use jobhub_executor::{Executor, ExecutorConfig};
//!
//! # fn main() -> jobhub_executor::Result<()> {
//! let executor = Executor::new(ExecutorConfig::default())?;
//! executor.register_fn("demoTask", |ctx| async move {
//!     Ok(format!("ran job {} with '{}'", ctx.job_id, ctx.params))
//! });
//!
//! let rt = tokio::runtime::Runtime::new()?;
//! rt.block_on(Arc::new(executor).run())?;
//! # Ok(())
//! # }
//! ```

pub mod center;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod version;

pub use config::ExecutorConfig;
pub use error::{Error, Result};
pub use executor::{DuplicatePolicy, Executor, JobContext, JobHandler};
