//! # Time-bounded executors: [`Timeout`] and [`Deadline`].
//!
//! Both run the child in a fresh [`Exec`] driver on a derived context that is cancelled at
//! the time bound. The derived context is released on every exit path (its guard is dropped
//! when `execute` returns).
//!
//! - child finished first → child's result;
//! - bound reached first → [`ExecError::DeadlineExceeded`];
//! - parent cancelled first → `Ok(())` (cancellation is not an error).

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::context::Context;
use crate::error::ExecError;
use crate::exec::{Ended, Exec};
use crate::executors::executor::{Executor, ExecutorRef};

/// Bounds a child by a relative timeout.
#[derive(Clone)]
pub struct Timeout {
    timeout: Duration,
    exec: ExecutorRef,
}

impl Timeout {
    /// Creates a timeout of `timeout` around `exec`.
    pub fn new(timeout: Duration, exec: ExecutorRef) -> Self {
        Self { timeout, exec }
    }
}

#[async_trait]
impl Executor for Timeout {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        run_bounded(&ctx, Instant::now() + self.timeout, self.exec.clone()).await
    }
}

/// Bounds a child by an absolute deadline.
#[derive(Clone)]
pub struct Deadline {
    deadline: Instant,
    exec: ExecutorRef,
}

impl Deadline {
    /// Creates a deadline at `deadline` around `exec`.
    pub fn new(deadline: Instant, exec: ExecutorRef) -> Self {
        Self { deadline, exec }
    }
}

#[async_trait]
impl Executor for Deadline {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        run_bounded(&ctx, self.deadline, self.exec.clone()).await
    }
}

async fn run_bounded(ctx: &Context, deadline: Instant, exec: ExecutorRef) -> Result<(), ExecError> {
    let (bounded, _guard) = ctx.with_deadline(deadline);
    match Exec::new(exec).run_until(bounded.clone()).await {
        Ok(Ended::Completed) => Ok(()),
        // A child reporting the cancellation it observed counts as the bound firing.
        Ok(Ended::Cancelled) => expired(&bounded),
        Err(err) if err.is_context() && bounded.is_cancelled() => expired(&bounded),
        Err(err) => Err(err),
    }
}

fn expired(bounded: &Context) -> Result<(), ExecError> {
    match bounded.err() {
        Some(ExecError::DeadlineExceeded) => Err(ExecError::DeadlineExceeded),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::ExecutorFn;
    use std::sync::Arc;

    fn sleeper(ms: u64) -> ExecutorRef {
        ExecutorFn::arc(move |ctx| async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(ms)) => Ok(()),
                _ = ctx.cancelled() => Err(ExecError::Canceled),
            }
        })
    }

    #[tokio::test]
    async fn fast_child_succeeds() {
        let exec = Timeout::new(Duration::from_secs(5), sleeper(10));
        assert!(exec.execute(Context::background()).await.is_ok());
    }

    #[tokio::test]
    async fn child_error_propagates() {
        let exec = Timeout::new(
            Duration::from_secs(5),
            ExecutorFn::arc(|_ctx| async { Err(ExecError::fail("bad input")) }),
        );
        let err = exec.execute(Context::background()).await.unwrap_err();
        assert_eq!(err.to_string(), "execution failed: bad input");
    }

    #[tokio::test]
    async fn slow_child_hits_timeout() {
        let exec = Timeout::new(Duration::from_millis(30), sleeper(10_000));
        let err = exec.execute(Context::background()).await.unwrap_err();
        assert!(matches!(err, ExecError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn child_reporting_cancel_at_expiry_is_deadline_exceeded() {
        let exec = Timeout::new(
            Duration::from_millis(20),
            ExecutorFn::arc(|ctx| async move {
                ctx.cancelled().await;
                Err(ExecError::Canceled)
            }),
        );
        let err = exec.execute(Context::background()).await.unwrap_err();
        assert!(matches!(err, ExecError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn nested_timeout_error_propagates_unchanged() {
        let inner: ExecutorRef = Arc::new(Timeout::new(Duration::from_millis(10), sleeper(10_000)));
        let exec = Timeout::new(Duration::from_secs(5), inner);
        let err = exec.execute(Context::background()).await.unwrap_err();
        assert!(matches!(err, ExecError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn past_deadline_expires_immediately() {
        let exec = Deadline::new(Instant::now(), sleeper(10_000));
        let err = exec.execute(Context::background()).await.unwrap_err();
        assert!(matches!(err, ExecError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn parent_cancellation_is_not_an_error() {
        let ctx = Context::background();
        ctx.cancel();
        let exec = Timeout::new(Duration::from_secs(60), sleeper(10_000));
        assert!(exec.execute(ctx).await.is_ok());
    }
}
