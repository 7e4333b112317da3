//! # Function-backed executor (`ExecutorFn`)
//!
//! [`ExecutorFn`] wraps a closure `F: Fn(Context) -> Fut`, producing a fresh future per
//! execution. An absent function (see [`ExecutorFn::from_option`] and [`noop`]) is a
//! successful no-op.
//!
//! ## Example
//! ```rust
//! use execvisor::{func, Context, ExecError, Executor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let hello = func(|ctx: Context| async move {
//!     if ctx.is_cancelled() {
//!         return Ok(());
//!     }
//!     Ok::<_, ExecError>(())
//! });
//! assert!(hello.execute(Context::background()).await.is_ok());
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::ExecError;
use crate::executors::executor::{Executor, ExecutorRef};

/// Function-backed executor.
#[derive(Debug, Clone)]
pub struct ExecutorFn<F> {
    f: Option<F>,
}

impl<F> ExecutorFn<F> {
    /// Creates a new function-backed executor.
    pub fn new(f: F) -> Self {
        Self { f: Some(f) }
    }

    /// Creates an executor from an optional function; `None` executes as a no-op success.
    pub fn from_option(f: Option<F>) -> Self {
        Self { f }
    }
}

impl<F, Fut> ExecutorFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ExecError>> + Send + 'static,
{
    /// Creates the executor and returns it as a shared handle.
    pub fn arc(f: F) -> ExecutorRef {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Executor for ExecutorFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), ExecError>> + Send + 'static,
{
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        match &self.f {
            Some(f) => f(ctx).await,
            None => Ok(()),
        }
    }
}

/// Shorthand for [`ExecutorFn::new`].
pub fn func<F, Fut>(f: F) -> ExecutorFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ExecError>> + Send + 'static,
{
    ExecutorFn::new(f)
}

/// Executor that does nothing and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

#[async_trait]
impl Executor for Noop {
    async fn execute(&self, _ctx: Context) -> Result<(), ExecError> {
        Ok(())
    }
}

/// Returns a shared [`Noop`].
pub fn noop() -> ExecutorRef {
    Arc::new(Noop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Ready;

    type PlainFn = fn(Context) -> Ready<Result<(), ExecError>>;

    #[tokio::test]
    async fn absent_function_is_noop_success() {
        let exec = ExecutorFn::<PlainFn>::from_option(None);
        assert!(exec.execute(Context::background()).await.is_ok());
        assert!(noop().execute(Context::background()).await.is_ok());
    }

    #[tokio::test]
    async fn function_result_is_returned() {
        let exec = ExecutorFn::arc(|_ctx| async { Err(ExecError::fail("boom")) });
        let err = exec.execute(Context::background()).await.unwrap_err();
        assert_eq!(err.to_string(), "execution failed: boom");
    }
}
