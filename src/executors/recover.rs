//! # Panic-safe wrapper.
//!
//! [`Recover`] executes its child and converts any panic into an [`ExecError`]:
//! - a payload that is an [`ExecError`] becomes that error;
//! - a `&str` / `String` payload becomes [`ExecError::Panic`] with the message;
//! - any other payload becomes [`ExecError::Panic`] with a generic message.
//!
//! A panic never escapes the wrapper. Wrapping a fatal [`Parallel`](super::Parallel)
//! turns its panic back into an ordinary error.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;

use crate::context::Context;
use crate::error::ExecError;
use crate::executors::executor::{Executor, ExecutorRef};

/// Executor that never panics.
pub struct Recover {
    exec: ExecutorRef,
}

impl Recover {
    /// Wraps `exec`.
    pub fn new(exec: ExecutorRef) -> Self {
        Self { exec }
    }
}

#[async_trait]
impl Executor for Recover {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        match AssertUnwindSafe(self.exec.execute(ctx)).catch_unwind().await {
            Ok(res) => res,
            Err(payload) => Err(panic_to_error(payload)),
        }
    }
}

/// Converts a panic payload into an [`ExecError`].
pub(crate) fn panic_to_error(payload: Box<dyn Any + Send>) -> ExecError {
    let payload = match payload.downcast::<ExecError>() {
        Ok(err) => return *err,
        Err(other) => other,
    };
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return ExecError::Panic((*msg).to_string());
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return ExecError::Panic(msg.clone());
    }
    ExecError::Panic("unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::ExecutorFn;

    #[tokio::test]
    async fn string_panic_becomes_error() {
        let exec = Recover::new(ExecutorFn::arc(|_ctx| async {
            if true {
                panic!("kaboom {}", 42);
            }
            Ok(())
        }));
        let err = exec.execute(Context::background()).await.unwrap_err();
        assert!(matches!(err, ExecError::Panic(ref msg) if msg == "kaboom 42"));
    }

    #[tokio::test]
    async fn error_payload_is_preserved() {
        let exec = Recover::new(ExecutorFn::arc(|_ctx| async {
            if true {
                std::panic::panic_any(ExecError::NoMorePlan);
            }
            Ok(())
        }));
        let err = exec.execute(Context::background()).await.unwrap_err();
        assert!(matches!(err, ExecError::NoMorePlan));
    }

    #[tokio::test]
    async fn other_payload_gets_generic_message() {
        let exec = Recover::new(ExecutorFn::arc(|_ctx| async {
            if true {
                std::panic::panic_any(17u8);
            }
            Ok(())
        }));
        let err = exec.execute(Context::background()).await.unwrap_err();
        assert!(matches!(err, ExecError::Panic(ref msg) if msg == "unknown panic"));
    }

    #[tokio::test]
    async fn success_passes_through() {
        let exec = Recover::new(ExecutorFn::arc(|_ctx| async { Ok(()) }));
        assert!(exec.execute(Context::background()).await.is_ok());
    }
}
