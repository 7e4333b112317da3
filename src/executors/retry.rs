//! # Sequential loops: [`Retry`] and [`Repeat`].
//!
//! ```text
//! Retry(3):   attempt 1 ─Err─► attempt 2 ─Err─► attempt 3 ─► last result
//!                  └─Ok─► return Ok
//!
//! Repeat(3):  iteration 1 ─Ok─► [delay] ─► iteration 2 ─Ok─► [delay] ─► iteration 3
//!                  └─Err─► Repeat { iteration }
//! ```
//!
//! The current attempt / iteration (1-based) is visible to the child through
//! [`retry_attempt`] and [`repeat_iteration`].

use std::time::Duration;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::ExecError;
use crate::executors::executor::{Executor, ExecutorRef};

#[derive(Clone, Copy, Debug)]
struct RetryAttempt(u32);

#[derive(Clone, Copy, Debug)]
struct RepeatIteration(u64);

/// Current retry attempt (1-based), or `0` outside of a [`Retry`].
pub fn retry_attempt(ctx: &Context) -> u32 {
    ctx.value::<RetryAttempt>().map(|a| a.0).unwrap_or(0)
}

/// Current repeat iteration (1-based), or `0` outside of a [`Repeat`].
pub fn repeat_iteration(ctx: &Context) -> u64 {
    ctx.value::<RepeatIteration>().map(|r| r.0).unwrap_or(0)
}

/// Executes a child up to `times` attempts until it succeeds.
#[derive(Clone)]
pub struct Retry {
    times: u32,
    exec: ExecutorRef,
}

impl Retry {
    /// Creates a retry loop; `times == 0` is treated as `1`.
    pub fn new(times: u32, exec: ExecutorRef) -> Self {
        Self {
            times: times.max(1),
            exec,
        }
    }
}

#[async_trait]
impl Executor for Retry {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        let mut last = Ok(());
        for attempt in 1..=self.times {
            last = self.exec.execute(ctx.with_value(RetryAttempt(attempt))).await;
            if last.is_ok() {
                return last;
            }
        }
        last
    }
}

/// Executes a child `times` times (`0` = forever), stopping at the first failure.
#[derive(Clone)]
pub struct Repeat {
    times: u64,
    interval: Duration,
    exec: ExecutorRef,
}

impl Repeat {
    /// Creates a repeat loop with an optional delay after each successful iteration.
    pub fn new(times: u64, interval: Duration, exec: ExecutorRef) -> Self {
        Self {
            times,
            interval,
            exec,
        }
    }

    async fn iteration(&self, ctx: &Context, iteration: u64) -> Result<(), ExecError> {
        if let Err(err) = self
            .exec
            .execute(ctx.with_value(RepeatIteration(iteration)))
            .await
        {
            return Err(ExecError::Repeat {
                iteration,
                source: Box::new(err),
            });
        }
        if self.interval > Duration::ZERO {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = ctx.cancelled() => return Err(ctx.err().unwrap_or(ExecError::Canceled)),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Executor for Repeat {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        let mut iteration: u64 = 0;
        loop {
            if self.times > 0 && iteration >= self.times {
                return Ok(());
            }
            // Unbounded loops without a delay still yield to cancellation.
            if self.times == 0 && ctx.is_cancelled() {
                return Err(ctx.err().unwrap_or(ExecError::Canceled));
            }
            iteration += 1;
            self.iteration(&ctx, iteration).await?;
        }
    }
}
