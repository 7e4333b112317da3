//! # execvisor
//!
//! **Execvisor** composes async, cancellable units of work and supervises a service's
//! lifecycle on top of them.
//!
//! It provides an [`Executor`] trait, a set of combinators (sequence, fan-out, pool, retry,
//! repeat, cron, timeout), a driver ([`Exec`]) that runs one executor tree with pre/post hooks,
//! OS signal handlers and injected arguments, and an [`App`] that starts, registers and stops
//! a set of long-running [`Runner`](app::Runner)s.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌────────────┐   ┌────────────┐   ┌────────────┐
//!     │  Runner #1 │   │  Runner #2 │   │  profiling │
//!     └─────┬──────┘   └─────┬──────┘   └─────┬──────┘
//!           ▼                ▼                ▼
//! ┌───────────────────────────────────────────────────────┐
//! │  App                                                  │
//! │  - AppConfig (identity, signals, timeouts)            │
//! │  - Registrar (optional)                               │
//! │  - hooks: on_before / on_stop / on_all_ready          │
//! └──────────────────────────┬────────────────────────────┘
//!                            ▼ builds
//! ┌───────────────────────────────────────────────────────┐
//! │  Exec (driver)                                        │
//! │  before ─► root ─┬─ finished ─► result                │
//! │                  ├─ signal ─► side executor           │
//! │                  └─ cancelled ─► detach root          │
//! │  after  (exactly once when before succeeded)          │
//! └──────────────────────────┬────────────────────────────┘
//!                            ▼ runs
//! ┌───────────────────────────────────────────────────────┐
//! │  Executor tree                                        │
//! │  Parallel[ Parallel[start...], readiness poller ]     │
//! │  Append[ Parallel[stop...], on_stop + deregister ]    │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ### Failure semantics
//! ```text
//! Append      first Err stops the chain          ─► Step { index, source }
//! Parallel    Fatal: first Err panics the fan-out; Error: first Err in spawn order
//! Concurrent  Err logged                         ─► Ok
//! Pool        Err logged                         ─► Ok
//! Retry       Err ─► next attempt                ─► last attempt's result
//! Repeat      first Err stops                    ─► Repeat { iteration, source }
//! Crontab     first Err stops; no next fire      ─► NoMorePlan
//! Timeout     bound reached                      ─► DeadlineExceeded
//! Defer       every child runs (LIFO)            ─► first-registered child's result
//! ```
//!
//! ## Features
//! | Area | Description | Key types |
//! |---|---|---|
//! | **Context** | Cancellation, deadlines, typed values | [`Context`] |
//! | **Executors** | Leaf executors and combinators | [`executors`] |
//! | **Driver** | Hooks, signals, arguments, detach-on-cancel | [`Exec`], [`ExecBuilder`], [`Signal`] |
//! | **App** | Runner lifecycle and service registration | [`App`], [`AppBuilder`], [`AppConfig`] |
//! | **Errors** | Typed errors with stable labels | [`ExecError`] |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use execvisor::executors::{Append, Retry, Timeout};
//! use execvisor::{execute, func, Context, ExecError, ExecutorRef};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ExecError> {
//! let migrate = func(|_ctx: Context| async { Ok(()) });
//! let warmup = func(|_ctx: Context| async { Ok(()) });
//!
//! let boot = Append::new(vec![
//!     Arc::new(Retry::new(3, Arc::new(migrate))) as ExecutorRef,
//!     Arc::new(Timeout::new(Duration::from_secs(5), Arc::new(warmup))),
//! ]);
//!
//! execute(Context::background(), boot).await
//! # }
//! ```

pub mod app;
mod context;
mod error;
mod exec;
pub mod executors;

pub use app::{App, AppBuilder, AppConfig};
pub use context::{Argument, Context};
pub use error::ExecError;
pub use exec::{execute, Exec, ExecBuilder, Signal};
pub use executors::{func, Executor, ExecutorRef};
