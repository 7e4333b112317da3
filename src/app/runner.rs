//! # Runner capabilities.
//!
//! A [`Runner`] is a long-running component (HTTP server, consumer, ...) that the [`App`](super::App)
//! starts and stops. Two optional capabilities are discovered at runtime:
//!
//! - [`Ready`] via [`Runner::as_ready`], polled by the readiness poller;
//! - [`Endpointer`] via [`Runner::as_endpointer`], queried once to build the registered instance.
//!
//! Both default to `None`.
//!
//! # Example
//! ```
//! use async_trait::async_trait;
//! use execvisor::app::{Endpointer, Runner};
//! use execvisor::{Context, ExecError};
//! use url::Url;
//!
//! struct Api;
//!
//! #[async_trait]
//! impl Runner for Api {
//!     async fn start(&self, ctx: Context) -> Result<(), ExecError> {
//!         ctx.cancelled().await;
//!         Ok(())
//!     }
//!     async fn stop(&self, _ctx: Context) -> Result<(), ExecError> {
//!         Ok(())
//!     }
//!     fn as_endpointer(&self) -> Option<&dyn Endpointer> {
//!         Some(self)
//!     }
//! }
//!
//! impl Endpointer for Api {
//!     fn endpoint(&self) -> Result<Url, ExecError> {
//!         Url::parse("http://127.0.0.1:8080").map_err(|e| ExecError::Config(e.to_string()))
//!     }
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::context::Context;
use crate::error::ExecError;
use crate::executors::Executor;

/// Start/stop-capable long-running component.
#[async_trait]
pub trait Runner: Send + Sync + 'static {
    /// Runs until stopped or failed.
    async fn start(&self, ctx: Context) -> Result<(), ExecError>;

    /// Makes a blocked [`Runner::start`] return and releases resources.
    ///
    /// `ctx` carries the app's stop timeout as its deadline.
    async fn stop(&self, ctx: Context) -> Result<(), ExecError>;

    /// Readiness capability, if any.
    fn as_ready(&self) -> Option<&dyn Ready> {
        None
    }

    /// Endpoint capability, if any.
    fn as_endpointer(&self) -> Option<&dyn Endpointer> {
        None
    }
}

/// Non-blocking readiness check.
pub trait Ready: Send + Sync {
    /// True once the runner can serve; polled until every ready-capable runner reports it.
    fn ready(&self) -> bool;
}

/// Address a runner listens on, known once it has bound.
pub trait Endpointer: Send + Sync {
    /// Listening address as a URL (`scheme://host:port`); an error leaves it out of
    /// the registered instance.
    fn endpoint(&self) -> Result<Url, ExecError>;
}

/// Shared handle to a runner.
pub type RunnerRef = Arc<dyn Runner>;

/// Function-backed runner; `stop` is a no-op.
#[derive(Clone)]
pub struct RunnerFn<F> {
    f: F,
}

impl<F> RunnerFn<F> {
    /// Wraps `f` as the runner's `start`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> RunnerFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ExecError>> + Send + 'static,
{
    /// Creates the runner and returns it as a shared handle.
    pub fn arc(f: F) -> RunnerRef {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Runner for RunnerFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ExecError>> + Send + 'static,
{
    async fn start(&self, ctx: Context) -> Result<(), ExecError> {
        (self.f)(ctx).await
    }

    async fn stop(&self, _ctx: Context) -> Result<(), ExecError> {
        Ok(())
    }
}

/// Executor calling [`Runner::start`].
pub(crate) struct StartRunner(pub(crate) RunnerRef);

#[async_trait]
impl Executor for StartRunner {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        self.0.start(ctx).await
    }
}

/// Executor calling [`Runner::stop`] on a context bounded by `timeout`.
pub(crate) struct StopRunner {
    pub(crate) runner: RunnerRef,
    pub(crate) timeout: Duration,
}

#[async_trait]
impl Executor for StopRunner {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        let (ctx, _guard) = ctx.with_timeout(self.timeout);
        self.runner.stop(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runner_fn_starts_and_stops_trivially() {
        let runner = RunnerFn::arc(|ctx: Context| async move {
            if ctx.is_cancelled() {
                Err(ExecError::Canceled)
            } else {
                Ok(())
            }
        });

        assert!(runner.start(Context::background()).await.is_ok());
        assert!(runner.stop(Context::background()).await.is_ok());
        assert!(runner.as_ready().is_none());
        assert!(runner.as_endpointer().is_none());
    }

    #[tokio::test]
    async fn stop_runner_bounds_context() {
        struct DeadlineEcho;

        #[async_trait]
        impl Runner for DeadlineEcho {
            async fn start(&self, _ctx: Context) -> Result<(), ExecError> {
                Ok(())
            }
            async fn stop(&self, ctx: Context) -> Result<(), ExecError> {
                match ctx.deadline() {
                    Some(_) => Ok(()),
                    None => Err(ExecError::fail("no deadline")),
                }
            }
        }

        let exec = StopRunner {
            runner: Arc::new(DeadlineEcho),
            timeout: Duration::from_secs(1),
        };
        assert!(exec.execute(Context::background()).await.is_ok());
    }
}
