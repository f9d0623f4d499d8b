//! Built-in job handlers
//!
//! Registered by the executor binary so a freshly deployed executor can
//! serve jobs before any embedding application adds its own:
//!
//! - `echo`  — returns its parameter string
//! - `sleep` — sleeps for the given number of milliseconds, observing
//!   cancellation
//! - `shell` — runs the parameter string as a shell command, killing the
//!   child process on cancellation

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::info;

use crate::error::{Error, Result};
use crate::executor::{Executor, JobContext, JobHandler};

/// Register all built-in handlers on an executor
pub fn register_builtins(executor: &Executor) {
    executor.register("echo", Arc::new(EchoHandler));
    executor.register("sleep", Arc::new(SleepHandler));
    executor.register("shell", Arc::new(ShellHandler));
}

// ─────────────────────────────────────────────────────────────────
// Echo
// ─────────────────────────────────────────────────────────────────

/// Returns its parameter string unchanged
pub struct EchoHandler;

#[async_trait]
impl JobHandler for EchoHandler {
    async fn execute(&self, ctx: JobContext) -> Result<String> {
        Ok(ctx.params)
    }
}

// ─────────────────────────────────────────────────────────────────
// Sleep
// ─────────────────────────────────────────────────────────────────

/// Sleeps for `params` milliseconds (default 1000), observing
/// cancellation
pub struct SleepHandler;

#[async_trait]
impl JobHandler for SleepHandler {
    async fn execute(&self, ctx: JobContext) -> Result<String> {
        let millis: u64 = ctx.params.trim().parse().unwrap_or(1000);

        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_millis(millis)) => {
                Ok(format!("slept {}ms", millis))
            }
            _ = ctx.cancelled() => {
                Err(Error::Cancelled { job_id: ctx.job_id })
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Shell
// ─────────────────────────────────────────────────────────────────

/// Runs the parameter string as a shell command.
///
/// Cancellation kills the child process. Stdout becomes the result
/// payload; a non-zero exit maps to a failure carrying stderr.
pub struct ShellHandler;

#[async_trait]
impl JobHandler for ShellHandler {
    async fn execute(&self, ctx: JobContext) -> Result<String> {
        let command = ctx.params.trim();
        if command.is_empty() {
            return Err(Error::Execution("empty shell command".to_string()));
        }

        info!(job_id = ctx.job_id, command, "Running shell command");

        let mut child = shell_command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Execution(format!("failed to spawn '{}': {}", command, e)))?;

        let status = tokio::select! {
            status = child.wait() => Some(status),
            _ = ctx.cancelled() => None,
        };

        let status = match status {
            Some(status) => {
                status.map_err(|e| Error::Execution(format!("wait failed: {}", e)))?
            }
            None => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(Error::Cancelled { job_id: ctx.job_id });
            }
        };

        let mut stdout = String::new();
        if let Some(mut pipe) = child.stdout.take() {
            let _ = pipe.read_to_string(&mut stdout).await;
        }

        if status.success() {
            Ok(stdout.trim_end().to_string())
        } else {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr).await;
            }
            let detail = if stderr.is_empty() {
                format!("exit code {:?}", status.code())
            } else {
                stderr.trim_end().to_string()
            };
            Err(Error::Execution(detail))
        }
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn context(job_id: i64, params: &str) -> JobContext {
        JobContext {
            job_id,
            params: params.to_string(),
            log_id: 0,
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn test_echo_returns_params() {
        let out = EchoHandler.execute(context(1, "hello")).await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_sleep_completes() {
        let out = SleepHandler.execute(context(2, "10")).await.unwrap();
        assert_eq!(out, "slept 10ms");
    }

    #[tokio::test]
    async fn test_sleep_observes_cancellation() {
        let ctx = context(3, "60000");
        let cancel = ctx.cancel.clone();

        let task = tokio::spawn(async move { SleepHandler.execute(ctx).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Cancelled { job_id: 3 }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_captures_stdout() {
        let out = ShellHandler.execute(context(4, "echo ok")).await.unwrap();
        assert_eq!(out, "ok");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_nonzero_exit_fails() {
        let err = ShellHandler.execute(context(5, "exit 3")).await.unwrap_err();
        assert!(matches!(err, Error::Execution(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_killed_on_cancellation() {
        let ctx = context(6, "sleep 60");
        let cancel = ctx.cancel.clone();

        let task = tokio::spawn(async move { ShellHandler.execute(ctx).await });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cancel.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Cancelled { job_id: 6 }));
    }

    #[tokio::test]
    async fn test_shell_empty_command_fails() {
        let err = ShellHandler.execute(context(7, "  ")).await.unwrap_err();
        assert!(matches!(err, Error::Execution(_)));
    }
}
