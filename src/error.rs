//! Error type shared by every executor, the [`Exec`](crate::Exec) driver and the [`App`](crate::App).
//!
//! [`ExecError`] covers three families:
//!
//! - **configuration** errors ([`ExecError::Config`]) returned immediately and never retried;
//! - **child failures** ([`ExecError::Fail`], [`ExecError::Step`], [`ExecError::Repeat`], ...)
//!   propagated according to the combinator that observed them;
//! - **context** errors ([`ExecError::Canceled`], [`ExecError::DeadlineExceeded`]).
//!
//! Like the rest of the crate it provides `as_label` / `as_message` helpers for logs.

use std::fmt::Display;

use thiserror::Error;

/// # Errors produced by executors.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ExecError {
    /// Invalid configuration (malformed address, bad cron expression, ...).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Generic failure reported by user code or a collaborator.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// A child of a sequential chain failed.
    #[error("executor:{index} has err:{source}")]
    Step {
        /// Position of the failing child in the chain.
        index: usize,
        /// The child's error.
        source: Box<ExecError>,
    },

    /// An iteration of a repeat loop failed.
    #[error("repeat {iteration} failed: {source}")]
    Repeat {
        /// 1-based iteration that failed.
        iteration: u64,
        /// The child's error.
        source: Box<ExecError>,
    },

    /// A calendar schedule has no next fire time.
    #[error("none plan")]
    NoMorePlan,

    /// The context was cancelled.
    #[error("context cancelled")]
    Canceled,

    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// A panic converted to an error by [`Recover`](crate::executors::Recover).
    #[error("panicked: {0}")]
    Panic(String),

    /// A subprocess exited unsuccessfully.
    #[error("process exited with {status}")]
    Process {
        /// Exit status as reported by the OS.
        status: String,
    },

    /// I/O failure (bind, spawn, ...).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Builds an [`ExecError::Fail`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use execvisor::ExecError;
    ///
    /// let err = ExecError::fail("connection refused");
    /// assert_eq!(err.to_string(), "execution failed: connection refused");
    /// ```
    pub fn fail(error: impl Display) -> Self {
        ExecError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use execvisor::ExecError;
    ///
    /// assert_eq!(ExecError::NoMorePlan.as_label(), "exec_no_more_plan");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ExecError::Config(_) => "exec_config",
            ExecError::Fail { .. } => "exec_failed",
            ExecError::Step { .. } => "exec_step_failed",
            ExecError::Repeat { .. } => "exec_repeat_failed",
            ExecError::NoMorePlan => "exec_no_more_plan",
            ExecError::Canceled => "exec_canceled",
            ExecError::DeadlineExceeded => "exec_deadline_exceeded",
            ExecError::Panic(_) => "exec_panicked",
            ExecError::Process { .. } => "exec_process_failed",
            ExecError::Io(_) => "exec_io",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ExecError::Config(msg) => format!("config: {msg}"),
            ExecError::Fail { error } => format!("error: {error}"),
            ExecError::Step { index, source } => format!("step {index}: {}", source.as_message()),
            ExecError::Repeat { iteration, source } => {
                format!("iteration {iteration}: {}", source.as_message())
            }
            ExecError::NoMorePlan => "schedule exhausted".to_string(),
            ExecError::Canceled => "context cancelled".to_string(),
            ExecError::DeadlineExceeded => "deadline exceeded".to_string(),
            ExecError::Panic(msg) => format!("panic: {msg}"),
            ExecError::Process { status } => format!("process: {status}"),
            ExecError::Io(err) => format!("io: {err}"),
        }
    }

    /// True for the two context errors ([`ExecError::Canceled`], [`ExecError::DeadlineExceeded`]).
    pub fn is_context(&self) -> bool {
        matches!(self, ExecError::Canceled | ExecError::DeadlineExceeded)
    }
}
