//! # Readiness poller.
//!
//! ```text
//! no hook ─► Ok(())
//! every tick:
//!   ├─ ctx cancelled           ─► Ok(())
//!   └─ every Ready reports true ─► hook(ctx), return its result
//! ```
//!
//! Runners without the [`Ready`](super::Ready) capability count as ready.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::info;

use crate::app::runner::RunnerRef;
use crate::context::Context;
use crate::error::ExecError;
use crate::executors::{Executor, ExecutorRef};

/// Poll period of [`ReadinessPoller`].
pub(crate) const READY_TICK: Duration = Duration::from_millis(100);

pub(crate) struct ReadinessPoller {
    runners: Vec<RunnerRef>,
    hook: Option<ExecutorRef>,
    tick: Duration,
}

impl ReadinessPoller {
    pub(crate) fn new(runners: Vec<RunnerRef>, hook: Option<ExecutorRef>) -> Self {
        Self {
            runners,
            hook,
            tick: READY_TICK,
        }
    }

    fn all_ready(&self) -> bool {
        self.runners
            .iter()
            .filter_map(|runner| runner.as_ready())
            .all(|ready| ready.ready())
    }
}

#[async_trait]
impl Executor for ReadinessPoller {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        let Some(hook) = &self.hook else {
            return Ok(());
        };

        let mut ticker = time::interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    if self.all_ready() {
                        info!(runners = self.runners.len(), "all runners ready");
                        return hook.execute(ctx).await;
                    }
                }
            }
        }
    }
}
