//! # Exec: runs one root executor with hooks, signals and injected arguments.
//!
//! ## State machine
//! ```text
//! run(ctx)
//!   ├─► before(ctx) ── Err ──► return Err            (after never runs)
//!   ├─► inject arguments (if any)
//!   ├─► arm signal listeners (if any signal is mapped)
//!   ├─► spawn root ─► RootTask
//!   ├─► loop select (biased):
//!   │     ├─ root finished     ─► its result
//!   │     ├─ signal delivered  ─► run mapped executor; Err ─► return Err, Ok ─► continue
//!   │     └─ ctx cancelled     ─► RootTask::detach(), Ok(())
//!   ├─► after(background ctx)                         (exactly once)
//!   └─► re-raise a root panic, otherwise return the result
//! ```
//!
//! ## Rules
//! - Cancellation is a request, not a wait: the root task is **detached**, never joined,
//!   on the cancellation path. Whatever the root is blocked on must be released by the
//!   post-hook (e.g. each Runner's `stop`).
//! - A failing post-hook is logged; the run's own result is returned.

use std::any::Any;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::context::{Arguments, Context};
use crate::error::ExecError;
use crate::exec::builder::{ExecBuilder, ExecOptions};
use crate::exec::signals::SignalListener;
use crate::executors::{Executor, ExecutorRef};

/// How a driven run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Ended {
    /// The root executor (or a signal executor) finished.
    Completed,
    /// The context was cancelled first.
    Cancelled,
}

enum Outcome {
    Done(Result<Ended, ExecError>),
    Panicked(Box<dyn Any + Send>),
}

/// Root executor running on its own task.
struct RootTask {
    handle: JoinHandle<Result<(), ExecError>>,
}

impl RootTask {
    fn spawn(exec: ExecutorRef, ctx: Context) -> Self {
        Self {
            handle: tokio::spawn(async move { exec.execute(ctx).await }),
        }
    }

    /// Leaves the root running; nobody waits for it any more.
    fn detach(self) {
        debug!("root executor detached");
        drop(self.handle);
    }
}

/// Single-use supervisor driver around one root executor.
pub struct Exec {
    root: ExecutorRef,
    opts: ExecOptions,
}

impl Exec {
    /// Creates a driver with no hooks, signals or arguments.
    pub fn new(root: ExecutorRef) -> Self {
        Self::from_parts(root, ExecOptions::default())
    }

    /// Starts a builder around `root`.
    pub fn builder(root: impl Executor) -> ExecBuilder {
        ExecBuilder::new(root)
    }

    pub(crate) fn from_parts(root: ExecutorRef, opts: ExecOptions) -> Self {
        Self { root, opts }
    }

    /// Runs the root executor to completion, failure, or cancellation.
    ///
    /// Cancellation of `ctx` is not an error: it yields `Ok(())` after the post-hook ran.
    pub async fn run(self, ctx: Context) -> Result<(), ExecError> {
        self.run_until(ctx).await.map(|_| ())
    }

    pub(crate) async fn run_until(self, ctx: Context) -> Result<Ended, ExecError> {
        if let Some(before) = &self.opts.before {
            before.execute(ctx.clone()).await?;
        }

        let outcome = self.drive(ctx).await;
        self.after().await;

        match outcome {
            Outcome::Done(res) => res,
            Outcome::Panicked(payload) => std::panic::resume_unwind(payload),
        }
    }

    async fn drive(&self, ctx: Context) -> Outcome {
        let ctx = if self.opts.args.is_empty() {
            ctx
        } else {
            ctx.with_value(Arguments(self.opts.args.clone().into()))
        };

        let mut signals = match SignalListener::arm(self.opts.signals.keys().copied()) {
            Ok(listener) => listener,
            Err(err) => return Outcome::Done(Err(err.into())),
        };

        let mut root = RootTask::spawn(self.root.clone(), ctx.clone());
        loop {
            tokio::select! {
                biased;

                joined = &mut root.handle => {
                    return match joined {
                        Ok(res) => Outcome::Done(res.map(|()| Ended::Completed)),
                        Err(err) if err.is_panic() => Outcome::Panicked(err.into_panic()),
                        Err(err) => Outcome::Done(Err(ExecError::Panic(err.to_string()))),
                    };
                }
                Some(sig) = signals.recv() => {
                    let Some(exec) = self.opts.signals.get(&sig) else {
                        continue;
                    };
                    info!(signal = %sig, "signal received");
                    if let Err(err) = exec.execute(ctx.clone()).await {
                        return Outcome::Done(Err(err));
                    }
                }
                _ = ctx.cancelled() => {
                    root.detach();
                    return Outcome::Done(Ok(Ended::Cancelled));
                }
            }
        }
    }

    async fn after(&self) {
        let Some(after) = &self.opts.after else {
            return;
        };
        if let Err(err) = after.execute(Context::background()).await {
            error!(error = %err, label = err.as_label(), "after hook failed");
        }
    }
}

/// Runs `root` under a driver with no hooks, signals or arguments.
pub async fn execute(ctx: Context, root: impl Executor) -> Result<(), ExecError> {
    Exec::new(Arc::new(root)).run(ctx).await
}
