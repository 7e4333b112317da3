//! # Subprocess executor.
//!
//! [`Command`] runs an external program bound to the context: when the context is
//! cancelled the child process is killed and the context error is returned.
//!
//! ## Rules
//! - Spawn failure → [`ExecError::Io`].
//! - Non-zero exit → [`ExecError::Process`].
//! - Stdio is inherited unless redirected with [`Command::stdin`] / [`Command::stdout`] /
//!   [`Command::stderr`]; a redirection is consumed by the first execution, later ones inherit.

use std::ffi::OsString;
use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::context::Context;
use crate::error::ExecError;
use crate::executors::executor::Executor;

/// External process executor.
///
/// # Example
/// ```no_run
/// use execvisor::executors::Command;
/// use execvisor::{Context, Executor};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), execvisor::ExecError> {
/// let ls = Command::new("ls").arg("-l").env("LC_ALL", "C");
/// ls.execute(Context::background()).await
/// # }
/// ```
pub struct Command {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    stdin: Mutex<Option<Stdio>>,
    stdout: Mutex<Option<Stdio>>,
    stderr: Mutex<Option<Stdio>>,
}

impl Command {
    /// Creates a command for `program` with no arguments.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            stdin: Mutex::new(None),
            stdout: Mutex::new(None),
            stderr: Mutex::new(None),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment variable on top of the inherited environment.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Redirects stdin.
    pub fn stdin(self, stdio: impl Into<Stdio>) -> Self {
        *lock(&self.stdin) = Some(stdio.into());
        self
    }

    /// Redirects stdout.
    pub fn stdout(self, stdio: impl Into<Stdio>) -> Self {
        *lock(&self.stdout) = Some(stdio.into());
        self
    }

    /// Redirects stderr.
    pub fn stderr(self, stdio: impl Into<Stdio>) -> Self {
        *lock(&self.stderr) = Some(stdio.into());
        self
    }

    fn build(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .kill_on_drop(true);
        if let Some(stdio) = lock(&self.stdin).take() {
            cmd.stdin(stdio);
        }
        if let Some(stdio) = lock(&self.stdout).take() {
            cmd.stdout(stdio);
        }
        if let Some(stdio) = lock(&self.stderr).take() {
            cmd.stderr(stdio);
        }
        cmd
    }
}

fn lock(slot: &Mutex<Option<Stdio>>) -> std::sync::MutexGuard<'_, Option<Stdio>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Executor for Command {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        let mut child = self.build().spawn()?;
        debug!(program = ?self.program, pid = ?child.id(), "process started");

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(ExecError::Process { status: status.to_string() })
                }
            }
            _ = ctx.cancelled() => {
                // Already exited between the two branches is fine.
                let _ = child.kill().await;
                debug!(program = ?self.program, "process killed on cancellation");
                Err(ctx.err().unwrap_or(ExecError::Canceled))
            }
        }
    }
}
