//! # Executor abstraction.
//!
//! This module defines the [`Executor`] trait (async, cancelable, fallible) and the shared
//! handle type [`ExecutorRef`], an `Arc<dyn Executor>` suitable for composition.
//!
//! An executor receives a [`Context`] and should observe its cancellation to stop
//! cooperatively during shutdown.
//!
//! ## Middleware
//! A [`Middleware`] maps one executor to another (logging, recovery, timeouts, ...).
//! [`use_middleware`] applies a list of them so that the **first** middleware ends up outermost.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::ExecError;

/// # Asynchronous, cancelable unit of work.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use execvisor::{Context, ExecError, Executor};
///
/// struct Hello;
///
/// #[async_trait]
/// impl Executor for Hello {
///     async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
///         if ctx.is_cancelled() {
///             return Ok(());
///         }
///         // do work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Executes until completion, failure, or cancellation.
    async fn execute(&self, ctx: Context) -> Result<(), ExecError>;
}

/// Shared handle to an executor.
pub type ExecutorRef = Arc<dyn Executor>;

#[async_trait]
impl<E: Executor + ?Sized> Executor for Arc<E> {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        (**self).execute(ctx).await
    }
}

/// Wraps an executor into another one.
pub type Middleware = Arc<dyn Fn(ExecutorRef) -> ExecutorRef + Send + Sync>;

/// Wraps `exec` in `middleware`, applied in reverse so the first entry is outermost.
pub fn use_middleware(exec: ExecutorRef, middleware: &[Middleware]) -> ExecutorRef {
    middleware.iter().rev().fold(exec, |exec, m| m(exec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::func;
    use std::sync::Mutex;

    struct Tag {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        inner: ExecutorRef,
    }

    #[async_trait]
    impl Executor for Tag {
        async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
            self.log.lock().unwrap().push(self.name);
            self.inner.execute(ctx).await
        }
    }

    fn tag(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Middleware {
        Arc::new(move |inner| {
            Arc::new(Tag {
                name,
                log: log.clone(),
                inner,
            }) as ExecutorRef
        })
    }

    #[tokio::test]
    async fn first_middleware_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let core_log = log.clone();
        let core: ExecutorRef = Arc::new(func(move |_ctx| {
            let log = core_log.clone();
            async move {
                log.lock().unwrap().push("core");
                Ok(())
            }
        }));

        let wrapped = use_middleware(core, &[tag("a", log.clone()), tag("b", log.clone())]);
        wrapped.execute(Context::background()).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "core"]);
    }
}
