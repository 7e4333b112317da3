//! # Execution context: cancellation, deadline, and scoped values.
//!
//! Every [`Executor`](crate::Executor) receives a [`Context`]. It bundles:
//! - a [`CancellationToken`] (the only cancellation signal of a run);
//! - an optional deadline inherited by derived contexts;
//! - an immutable chain of typed values (retry attempt, repeat iteration,
//!   cron fire time, injected arguments).
//!
//! ## Derivation
//! ```text
//! Context::background()
//!     ├─► child()              (child token, same values)
//!     ├─► with_value(v)        (same token, one more value)
//!     └─► with_deadline(t)     (child token + timer, returns DropGuard)
//! ```
//!
//! ## Rules
//! - Cancelling a parent cancels all derived contexts; cancelling a child never
//!   touches its parent.
//! - Values are looked up by type, nearest first.
//! - Dropping the guard returned by [`Context::with_deadline`] cancels the
//!   derived context and releases its timer task.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::ExecError;

/// Opaque argument injected by [`ExecBuilder::arguments`](crate::ExecBuilder::arguments).
pub type Argument = Arc<dyn Any + Send + Sync>;

/// Injected arguments, stored in the context as a single value.
#[derive(Clone, Default)]
pub(crate) struct Arguments(pub(crate) Arc<[Argument]>);

struct Node {
    key: TypeId,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Node>>,
}

/// Cancellable execution context handed to every executor.
///
/// Cheap to clone: clones share the same token, deadline and values.
///
/// # Example
/// ```
/// use execvisor::Context;
///
/// #[derive(Debug, PartialEq)]
/// struct RequestId(u64);
///
/// let ctx = Context::background().with_value(RequestId(7));
/// assert_eq!(ctx.value::<RequestId>(), Some(&RequestId(7)));
///
/// let child = ctx.child();
/// ctx.cancel();
/// assert!(child.is_cancelled());
/// ```
#[derive(Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
    values: Option<Arc<Node>>,
}

impl Context {
    /// Creates a fresh root context: not cancelled, no deadline, no values.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            values: None,
        }
    }

    /// Same as [`Context::background`].
    pub fn new() -> Self {
        Self::background()
    }

    /// Wraps an existing token (e.g. one owned by a host runtime).
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
            values: None,
        }
    }

    /// Derives a child context: cancelled with its parent, cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            values: self.values.clone(),
        }
    }

    /// Derives a context carrying `value`, shadowing any previous value of the same type.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        let node = Node {
            key: TypeId::of::<T>(),
            value: Arc::new(value),
            parent: self.values.clone(),
        };
        Self {
            token: self.token.clone(),
            deadline: self.deadline,
            values: Some(Arc::new(node)),
        }
    }

    /// Looks up the nearest value of type `T`.
    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        let key = TypeId::of::<T>();
        let mut cur = self.values.as_deref();
        while let Some(node) = cur {
            if node.key == key {
                return node.value.downcast_ref::<T>();
            }
            cur = node.parent.as_deref();
        }
        None
    }

    /// Derives a child context that is cancelled at `deadline`.
    ///
    /// The effective deadline is the earlier of `deadline` and the inherited one.
    /// Must be called inside a Tokio runtime (a timer task is spawned).
    /// Dropping the returned guard cancels the derived context and stops the timer.
    pub fn with_deadline(&self, deadline: Instant) -> (Self, DropGuard) {
        let deadline = match self.deadline {
            Some(inherited) if inherited < deadline => inherited,
            _ => deadline,
        };
        let ctx = Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
            values: self.values.clone(),
        };

        let timer = ctx.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => timer.cancel(),
                _ = timer.cancelled() => {}
            }
        });

        let guard = ctx.token.clone().drop_guard();
        (ctx, guard)
    }

    /// Derives a child context that is cancelled after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> (Self, DropGuard) {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the context is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context ended, or `None` while it is still live.
    pub fn err(&self) -> Option<ExecError> {
        if !self.token.is_cancelled() {
            return None;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ExecError::DeadlineExceeded),
            _ => Some(ExecError::Canceled),
        }
    }

    /// Returns the underlying token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Arguments injected by the driver for this run (empty when none).
    pub fn arguments(&self) -> &[Argument] {
        self.value::<Arguments>().map(|a| &a.0[..]).unwrap_or(&[])
    }

    /// First injected argument of type `T`.
    pub fn argument<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.arguments().iter().find_map(|a| a.downcast_ref::<T>())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_shadow_by_type() {
        let ctx = Context::background().with_value(1u32).with_value("x").with_value(2u32);
        assert_eq!(ctx.value::<u32>(), Some(&2));
        assert_eq!(ctx.value::<&str>(), Some(&"x"));
        assert_eq!(ctx.value::<u64>(), None);
    }

    #[test]
    fn child_cancel_does_not_touch_parent() {
        let parent = Context::background();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
        assert!(matches!(child.err(), Some(ExecError::Canceled)));
        assert!(parent.err().is_none());
    }

    #[test]
    fn arguments_default_to_empty() {
        let ctx = Context::background();
        assert!(ctx.arguments().is_empty());

        let args: Arc<[Argument]> = vec![Arc::new(5i32) as Argument, Arc::new("name")].into();
        let ctx = ctx.with_value(Arguments(args));
        assert_eq!(ctx.arguments().len(), 2);
        assert_eq!(ctx.argument::<i32>(), Some(&5));
        assert_eq!(ctx.argument::<&str>(), Some(&"name"));
    }

    #[tokio::test]
    async fn deadline_cancels_and_reports_exceeded() {
        let root = Context::background();
        let (ctx, _guard) = root.with_timeout(Duration::from_millis(20));
        ctx.cancelled().await;
        assert!(matches!(ctx.err(), Some(ExecError::DeadlineExceeded)));
        assert!(!root.is_cancelled());
    }

    #[tokio::test]
    async fn dropping_guard_releases_context() {
        let root = Context::background();
        let (ctx, guard) = root.with_timeout(Duration::from_secs(60));
        drop(guard);
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.err(), Some(ExecError::Canceled)));
    }

    #[tokio::test]
    async fn inherited_deadline_wins_when_earlier() {
        let root = Context::background();
        let (outer, _g1) = root.with_timeout(Duration::from_millis(10));
        let (inner, _g2) = outer.with_timeout(Duration::from_secs(60));
        assert_eq!(inner.deadline(), outer.deadline());
    }
}
