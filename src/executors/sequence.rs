//! # Sequential combinators: [`Append`] and [`Defer`].
//!
//! ```text
//! Append [e0, e1, e2]:  e0 ─► e1 ─► e2        stop at first Err → Step { index }
//! Defer  [e0, e1, e2]:  e2 ─► e1 ─► e0        every child runs; result of e0 reported
//! ```

use async_trait::async_trait;

use crate::context::Context;
use crate::error::ExecError;
use crate::executors::executor::{Executor, ExecutorRef};

/// Runs children one at a time, in order; the first failure stops the chain.
#[derive(Clone, Default)]
pub struct Append {
    execs: Vec<ExecutorRef>,
}

impl Append {
    /// Creates a chain over `execs`.
    pub fn new(execs: Vec<ExecutorRef>) -> Self {
        Self { execs }
    }

    /// Adds a child at the end of the chain.
    pub fn push(&mut self, exec: ExecutorRef) {
        self.execs.push(exec);
    }

    /// Builder-style [`Append::push`].
    pub fn then(mut self, exec: ExecutorRef) -> Self {
        self.push(exec);
        self
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.execs.len()
    }

    /// True if the chain has no children.
    pub fn is_empty(&self) -> bool {
        self.execs.is_empty()
    }
}

#[async_trait]
impl Executor for Append {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        for (index, exec) in self.execs.iter().enumerate() {
            exec.execute(ctx.clone())
                .await
                .map_err(|e| ExecError::Step {
                    index,
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }
}

/// Runs every child in reverse registration order (last registered first).
///
/// No child short-circuits the others. The reported result is the one of the
/// **first-registered** child, which runs last; the other results are dropped.
#[derive(Clone, Default)]
pub struct Defer {
    execs: Vec<ExecutorRef>,
}

impl Defer {
    /// Registers `execs` in order.
    pub fn new(execs: Vec<ExecutorRef>) -> Self {
        Self { execs }
    }
}

#[async_trait]
impl Executor for Defer {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        let mut result = Ok(());
        for exec in self.execs.iter().rev() {
            result = exec.execute(ctx.clone()).await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::ExecutorFn;
    use std::sync::{Arc, Mutex};

    fn recorder(
        log: &Arc<Mutex<Vec<usize>>>,
        id: usize,
        fail: bool,
    ) -> ExecutorRef {
        let log = log.clone();
        ExecutorFn::arc(move |_ctx| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(id);
                if fail {
                    Err(ExecError::fail(format!("child {id}")))
                } else {
                    Ok(())
                }
            }
        })
    }

    #[tokio::test]
    async fn append_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = Append::new((0..4).map(|i| recorder(&log, i, false)).collect());
        assert!(chain.execute(Context::background()).await.is_ok());
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn append_stops_at_first_failure() {
        for failing in 0..4 {
            let log = Arc::new(Mutex::new(Vec::new()));
            let chain = Append::new(
                (0..4)
                    .map(|i| recorder(&log, i, i == failing))
                    .collect(),
            );
            let err = chain.execute(Context::background()).await.unwrap_err();
            assert!(matches!(err, ExecError::Step { index, .. } if index == failing));
            assert_eq!(*log.lock().unwrap(), (0..=failing).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn append_push_extends_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = Append::default().then(recorder(&log, 0, false));
        chain.push(recorder(&log, 1, false));
        assert_eq!(chain.len(), 2);
        assert!(chain.execute(Context::background()).await.is_ok());
        assert_eq!(*log.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn defer_runs_all_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let deferred = Defer::new(vec![
            recorder(&log, 0, false),
            recorder(&log, 1, true),
            recorder(&log, 2, true),
        ]);
        // Children 1 and 2 fail, but child 0 (first registered, runs last) succeeds.
        assert!(deferred.execute(Context::background()).await.is_ok());
        assert_eq!(*log.lock().unwrap(), vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn defer_reports_first_registered_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let deferred = Defer::new(vec![recorder(&log, 0, true), recorder(&log, 1, false)]);
        let err = deferred.execute(Context::background()).await.unwrap_err();
        assert_eq!(err.to_string(), "execution failed: child 0");
        assert_eq!(*log.lock().unwrap(), vec![1, 0]);
    }
}
