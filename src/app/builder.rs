use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::app::config::AppConfig;
use crate::app::lifecycle::{App, Hooks};
use crate::app::registry::{Registrar, RegistrarRef};
use crate::app::runner::{Runner, RunnerRef};
use crate::exec::Signal;
use crate::executors::Executor;

/// Builder for an [`App`].
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use execvisor::app::{App, RunnerFn};
/// use execvisor::{func, Context};
///
/// let app = App::builder()
///     .name("billing")
///     .version("1.4.2")
///     .stop_timeout(Duration::from_secs(5))
///     .on_all_ready(func(|_| async { Ok(()) }))
///     .runner(RunnerFn::new(|ctx: Context| async move {
///         ctx.cancelled().await;
///         Ok(())
///     }))
///     .build();
///
/// assert_eq!(app.name(), "billing");
/// ```
pub struct AppBuilder {
    cfg: AppConfig,
    hooks: Hooks,
    runners: Vec<RunnerRef>,
    registrar: Option<RegistrarRef>,
}

impl AppBuilder {
    /// Creates a builder with the given configuration.
    pub fn new(cfg: AppConfig) -> Self {
        Self {
            cfg,
            hooks: Hooks::default(),
            runners: Vec::new(),
            registrar: None,
        }
    }

    /// Instance id (default: random uuid).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.cfg.id = id.into();
        self
    }

    /// Service name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.cfg.name = name.into();
        self
    }

    /// Service version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.cfg.version = version.into();
        self
    }

    /// Service metadata.
    pub fn metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.cfg.metadata = metadata;
        self
    }

    /// Replaces the shutdown signal set.
    pub fn signals<I>(mut self, signals: I) -> Self
    where
        I: IntoIterator<Item = Signal>,
    {
        self.cfg.signals = signals.into_iter().collect();
        self
    }

    /// Deadline handed to every runner's `stop`.
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.stop_timeout = timeout;
        self
    }

    /// Registry backend for this instance.
    pub fn registrar(mut self, registrar: impl Registrar) -> Self {
        self.registrar = Some(Arc::new(registrar));
        self
    }

    /// Bound for each registrar call.
    pub fn registrar_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.registrar_timeout = timeout;
        self
    }

    /// Hook run before any runner starts; its failure aborts the app.
    pub fn on_before(mut self, exec: impl Executor) -> Self {
        self.hooks.before = Some(Arc::new(exec));
        self
    }

    /// Hook run after every runner stopped, before deregistration.
    pub fn on_stop(mut self, exec: impl Executor) -> Self {
        self.hooks.after = Some(Arc::new(exec));
        self
    }

    /// Hook run once when every runner reports ready.
    pub fn on_all_ready(mut self, exec: impl Executor) -> Self {
        self.hooks.all_ready = Some(Arc::new(exec));
        self
    }

    /// Enables the profiling listener on `addr`.
    pub fn profiling(mut self, addr: impl Into<String>) -> Self {
        self.cfg.profiling = Some(addr.into());
        self
    }

    /// Adds a runner.
    pub fn runner(mut self, runner: impl Runner) -> Self {
        self.runners.push(Arc::new(runner));
        self
    }

    /// Adds shared runners.
    pub fn runners<I>(mut self, runners: I) -> Self
    where
        I: IntoIterator<Item = RunnerRef>,
    {
        self.runners.extend(runners);
        self
    }

    /// Builds the app.
    pub fn build(self) -> Arc<App> {
        Arc::new(App::from_parts(
            self.cfg,
            self.hooks,
            self.runners,
            self.registrar,
        ))
    }
}
