//! # Fan-out combinators: [`Parallel`] and [`Concurrent`].
//!
//! Both spawn one Tokio task per branch into a [`JoinSet`] and join before returning,
//! but they treat failures differently:
//!
//! | Combinator | Branches | Failure |
//! |---|---|---|
//! | [`Parallel`] + [`FailureMode::Fatal`] | heterogeneous | panics the fan-out with the child's error |
//! | [`Parallel`] + [`FailureMode::Error`] | heterogeneous | first error in spawn order is returned |
//! | [`Concurrent`] | the same executor N times | logged, always `Ok(())` |
//!
//! A panic inside a branch is always re-raised in the joining task.

use async_trait::async_trait;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, warn};

use crate::context::Context;
use crate::error::ExecError;
use crate::executors::executor::{Executor, ExecutorRef};

/// How [`Parallel`] reacts to a failing branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// The first observed failure panics the fan-out (payload: the child's [`ExecError`]).
    ///
    /// Fatal to the process unless the caller wraps the combinator in
    /// [`Recover`](super::Recover), which turns the panic back into that error.
    #[default]
    Fatal,
    /// All branches are joined; the first error in spawn order is returned.
    Error,
}

/// Runs heterogeneous children concurrently and joins them.
#[derive(Clone)]
pub struct Parallel {
    execs: Vec<ExecutorRef>,
    mode: FailureMode,
}

impl Parallel {
    /// Creates a fan-out with [`FailureMode::Fatal`].
    pub fn new(execs: Vec<ExecutorRef>) -> Self {
        Self {
            execs,
            mode: FailureMode::Fatal,
        }
    }

    /// Overrides the failure mode.
    pub fn with_mode(mut self, mode: FailureMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the failure mode.
    pub fn mode(&self) -> FailureMode {
        self.mode
    }
}

#[async_trait]
impl Executor for Parallel {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        let mut set = JoinSet::new();
        for (index, exec) in self.execs.iter().enumerate() {
            let exec = exec.clone();
            let ctx = ctx.clone();
            set.spawn(async move { (index, exec.execute(ctx).await) });
        }

        let mut failures: Vec<Option<ExecError>> = Vec::new();
        failures.resize_with(self.execs.len(), || None);

        while let Some(joined) = set.join_next().await {
            let Some((index, res)) = unwrap_join(joined) else {
                continue;
            };
            let Err(err) = res else {
                continue;
            };
            match self.mode {
                FailureMode::Fatal => {
                    error!(branch = index, error = %err, "parallel branch failed");
                    std::panic::panic_any(err);
                }
                FailureMode::Error => failures[index] = Some(err),
            }
        }

        match failures.into_iter().flatten().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Runs one executor `n` times concurrently; failures are logged, never returned.
#[derive(Clone)]
pub struct Concurrent {
    n: usize,
    exec: ExecutorRef,
}

impl Concurrent {
    /// Creates a fan-out of `n` copies of `exec`.
    pub fn new(n: usize, exec: ExecutorRef) -> Self {
        Self { n, exec }
    }
}

#[async_trait]
impl Executor for Concurrent {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        let mut set = JoinSet::new();
        for i in 0..self.n {
            let exec = self.exec.clone();
            let ctx = ctx.clone();
            set.spawn(async move {
                if let Err(err) = exec.execute(ctx).await {
                    warn!(worker = i, error = %err, "concurrent worker failed");
                }
            });
        }
        while let Some(joined) = set.join_next().await {
            unwrap_join(joined);
        }
        Ok(())
    }
}

/// Re-raises branch panics; drops aborted branches.
pub(crate) fn unwrap_join<T>(joined: Result<T, JoinError>) -> Option<T> {
    match joined {
        Ok(v) => Some(v),
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => {
            warn!(error = %err, "branch aborted");
            None
        }
    }
}
