//! # Bounded-pool fan-out.
//!
//! [`Pool`] runs a list of children on at most `size` workers at a time (`0` = unbounded).
//! Submission waits for a free worker; failures are logged and never returned.
//!
//! ```text
//! children ──► acquire permit ──► spawn ──► execute ──► release permit
//!                  (waits while `size` workers are busy)
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::ExecError;
use crate::executors::executor::{Executor, ExecutorRef};
use crate::executors::fanout::unwrap_join;

/// Fixed-size worker pool over a list of children.
#[derive(Clone)]
pub struct Pool {
    size: usize,
    execs: Vec<ExecutorRef>,
}

impl Pool {
    /// Creates a pool of `size` workers (`0` = unbounded) over `execs`.
    pub fn new(size: usize, execs: Vec<ExecutorRef>) -> Self {
        Self { size, execs }
    }

    /// Returns the worker limit, `None` when unbounded.
    #[inline]
    pub fn limit(&self) -> Option<usize> {
        if self.size == 0 {
            None
        } else {
            Some(self.size)
        }
    }
}

#[async_trait]
impl Executor for Pool {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        let semaphore = self.limit().map(|n| Arc::new(Semaphore::new(n)));
        let mut set = JoinSet::new();

        for (index, exec) in self.execs.iter().enumerate() {
            let permit = match &semaphore {
                Some(sem) => tokio::select! {
                    permit = sem.clone().acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_closed) => break,
                    },
                    _ = ctx.cancelled() => {
                        debug!(submitted = index, total = self.execs.len(), "pool submission cancelled");
                        break;
                    }
                },
                None => None,
            };

            let exec = exec.clone();
            let ctx = ctx.clone();
            set.spawn(async move {
                let _permit = permit;
                if let Err(err) = exec.execute(ctx).await {
                    warn!(child = index, error = %err, "pool child failed");
                }
            });
        }

        while let Some(joined) = set.join_next().await {
            unwrap_join(joined);
        }
        Ok(())
    }
}
