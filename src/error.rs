//! Error types for the JobHub executor
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - Retryable/fatal classification
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for executor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,

    // Transport errors (3xx)
    ConnectionFailed = 300,
    RequestTimeout = 301,

    // Protocol errors (4xx)
    ProtocolMalformed = 401,

    // Execution errors (5xx)
    ExecutionFailed = 500,
    ExecutionTimeout = 501,
    ExecutionCancelled = 502,
    UnknownHandler = 510,
    JobNotRunning = 511,
    DuplicateJob = 512,

    // Registration errors (6xx)
    RegistrationFailed = 600,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Transport errors
            400..=499 => 40, // Protocol errors
            500..=599 => 50, // Execution errors
            600..=699 => 60, // Registration errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the executor
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// Generic configuration error (parse or validation)
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File write error
    #[error("Failed to write file: {}", path.display())]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Transport Errors
    // ─────────────────────────────────────────────────────────────

    /// Outbound HTTP call to the scheduling center failed
    #[error("Scheduling center request failed: {0}")]
    Http(#[from] reqwest::Error),

    // ─────────────────────────────────────────────────────────────
    // Protocol Errors
    // ─────────────────────────────────────────────────────────────

    /// Inbound payload failed to decode
    #[error("Malformed request payload: {0}")]
    Decode(String),

    // ─────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────

    /// Start referenced a handler name absent from the registry
    #[error("No handler registered under '{name}'")]
    UnknownHandler { name: String },

    /// Kill referenced a job id absent from the running table
    #[error("Job {job_id} is not running")]
    JobNotRunning { job_id: i64 },

    /// Start for a job id that is already running (reject policy)
    #[error("Job {job_id} is already running")]
    DuplicateJob { job_id: i64 },

    /// Job body returned an error
    #[error("Job execution failed: {0}")]
    Execution(String),

    /// Job body exceeded its configured timeout
    #[error("Job {job_id} timed out after {timeout_secs}s")]
    Timeout { job_id: i64, timeout_secs: u64 },

    /// Job body stopped after observing cancellation
    #[error("Job {job_id} was cancelled")]
    Cancelled { job_id: i64 },

    // ─────────────────────────────────────────────────────────────
    // Registration Errors
    // ─────────────────────────────────────────────────────────────

    /// The heartbeat payload could not be constructed at startup
    #[error("Executor registration failed: {0}")]
    Registration(String),

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(_) => ErrorCode::IoRead,

            Error::Http(e) if e.is_timeout() => ErrorCode::RequestTimeout,
            Error::Http(_) => ErrorCode::ConnectionFailed,

            Error::Decode(_) => ErrorCode::ProtocolMalformed,

            Error::UnknownHandler { .. } => ErrorCode::UnknownHandler,
            Error::JobNotRunning { .. } => ErrorCode::JobNotRunning,
            Error::DuplicateJob { .. } => ErrorCode::DuplicateJob,
            Error::Execution(_) => ErrorCode::ExecutionFailed,
            Error::Timeout { .. } => ErrorCode::ExecutionTimeout,
            Error::Cancelled { .. } => ErrorCode::ExecutionCancelled,

            Error::Registration(_) => ErrorCode::RegistrationFailed,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Timeout { .. } | Error::Io(_) | Error::IoWrite { .. }
        )
    }

    /// Check if the error is fatal (the executor should exit)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::Config(_)
                | Error::Registration(_)
                | Error::Internal(_)
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => {
                Some("Run 'jobhub-executor config init' to create a default configuration file.")
            }
            Error::Config(_) => Some(
                "Check the configuration file. Run 'jobhub-executor config validate' to see details.",
            ),
            Error::Http(_) => {
                Some("Check your network connection and verify the scheduling center address.")
            }
            Error::Registration(_) => Some(
                "Verify 'center.address' and 'executor.registry_key' in the configuration file.",
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", code.as_str(), self);

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
