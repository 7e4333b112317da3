//! # Executors and combinators.
//!
//! Leaf executors do one thing; combinators compose other executors.
//!
//! | Kind | Types |
//! |---|---|
//! | leaf | [`ExecutorFn`] / [`func`] / [`noop`], [`Command`], [`HttpServer`], [`Profiling`] |
//! | wrapper | [`Recover`], [`Timeout`], [`Deadline`], [`Retry`], [`Repeat`], [`Crontab`] |
//! | sequential | [`Append`], [`Defer`] |
//! | fan-out | [`Parallel`], [`Concurrent`], [`Pool`] |
//!
//! Every combinator holds its children as [`ExecutorRef`] and is itself an [`Executor`], so
//! trees of any depth can be built and handed to [`Exec`](crate::Exec).

mod command;
mod crontab;
mod executor;
mod fanout;
mod func;
pub(crate) mod http;
mod pool;
mod recover;
mod retry;
mod sequence;
mod timeout;

pub use command::Command;
pub use crontab::{cron_fire_time, Crontab, MuteWindow};
pub use executor::{use_middleware, Executor, ExecutorRef, Middleware};
pub use fanout::{Concurrent, FailureMode, Parallel};
pub use func::{func, noop, ExecutorFn, Noop};
pub use http::{profiling_router, HttpServer, Profiling, SHUTDOWN_GRACE};
pub use pool::Pool;
pub use recover::Recover;
pub use retry::{repeat_iteration, retry_attempt, Repeat, Retry};
pub use sequence::{Append, Defer};
pub use timeout::{Deadline, Timeout};
