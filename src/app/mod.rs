//! # Service lifecycle.
//!
//! [`App`] starts a set of [`Runner`]s, registers the process with an optional
//! [`Registrar`], waits for a shutdown signal or cancellation, then stops every runner
//! and deregisters. It is assembled from the crate's executors and driven by [`Exec`](crate::Exec).
//!
//! - [`AppConfig`]: identity, shutdown signals, timeouts, profiling address;
//! - [`AppBuilder`]: hooks, runners, registrar;
//! - [`Runner`], [`Ready`], [`Endpointer`]: what the app drives;
//! - [`Registrar`], [`ServiceInstance`]: what the app publishes.
//!
//! # Example
//! ```rust,no_run
//! use execvisor::app::{App, RunnerFn};
//! use execvisor::{Context, ExecError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ExecError> {
//!     let app = App::builder()
//!         .name("worker")
//!         .profiling("127.0.0.1:6060")
//!         .runner(RunnerFn::new(|ctx: Context| async move {
//!             ctx.cancelled().await;
//!             Ok(())
//!         }))
//!         .build();
//!
//!     // Blocks until SIGTERM, SIGQUIT or SIGINT.
//!     app.run(Context::background()).await
//! }
//! ```

mod builder;
mod config;
mod host;
mod lifecycle;
mod pprof;
mod ready;
mod registry;
mod runner;

pub use builder::AppBuilder;
pub use config::AppConfig;
pub use host::outbound_ip;
pub use lifecycle::App;
pub use registry::{Registrar, RegistrarRef, ServiceInstance};
pub use runner::{Endpointer, Ready, Runner, RunnerFn, RunnerRef};
