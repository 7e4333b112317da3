//! # App: service lifecycle assembled from executors.
//!
//! ```text
//! run(ctx)
//!   ctx' = ctx.child()
//!   Exec
//!   ├─ before : on_before ─► build ServiceInstance ─► register (≤ registrar_timeout)
//!   ├─ root   : Parallel[ Parallel[start(r) for r in runners], readiness poller ]   (fatal)
//!   ├─ signal : SIGTERM | SIGQUIT | SIGINT ─► ctx'.cancel()
//!   └─ after  : Append[ Parallel[stop(r) (≤ stop_timeout)], on_stop ─► deregister ]
//! ```
//!
//! ## Rules
//! - A failing `on_before` or registration aborts the run; no runner is started or stopped.
//! - Once `before` succeeded, every runner's `stop` is called exactly once, whichever way the
//!   run ends (root finished, root panicked, signal, cancellation).
//! - A runner whose `start` fails is fatal: the start fan-out panics, runners are stopped,
//!   then the panic is re-raised to the caller of [`App::run`].
//! - An app without runners stays up until its context is cancelled.
//! - Deregistration happens only after every `stop` returned, and only if registration
//!   succeeded. Register and deregister are sequenced by the driver; the instance lock only
//!   guards the slot.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use percent_encoding::percent_decode_str;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::app::builder::AppBuilder;
use crate::app::config::AppConfig;
use crate::app::host;
use crate::app::pprof::ProfilingRunner;
use crate::app::ready::ReadinessPoller;
use crate::app::registry::{RegistrarRef, ServiceInstance};
use crate::app::runner::{RunnerRef, StartRunner, StopRunner};
use crate::context::Context;
use crate::error::ExecError;
use crate::exec::Exec;
use crate::executors::{func, Append, Executor, ExecutorFn, ExecutorRef, FailureMode, Parallel};

/// Optional user hooks.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub(crate) before: Option<ExecutorRef>,
    pub(crate) after: Option<ExecutorRef>,
    pub(crate) all_ready: Option<ExecutorRef>,
}

/// Service-lifecycle supervisor over a set of [`Runner`](super::Runner)s.
pub struct App {
    cfg: AppConfig,
    hooks: Hooks,
    runners: Vec<RunnerRef>,
    registrar: Option<RegistrarRef>,
    instance: Mutex<Option<ServiceInstance>>,
}

impl App {
    /// Starts a builder with [`AppConfig::default`].
    pub fn builder() -> AppBuilder {
        AppBuilder::new(AppConfig::default())
    }

    pub(crate) fn from_parts(
        cfg: AppConfig,
        hooks: Hooks,
        runners: Vec<RunnerRef>,
        registrar: Option<RegistrarRef>,
    ) -> Self {
        Self {
            cfg,
            hooks,
            runners,
            registrar,
            instance: Mutex::new(None),
        }
    }

    /// Instance id.
    pub fn id(&self) -> &str {
        &self.cfg.id
    }

    /// Service name.
    pub fn name(&self) -> &str {
        &self.cfg.name
    }

    /// Service version.
    pub fn version(&self) -> &str {
        &self.cfg.version
    }

    /// Instance metadata.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.cfg.metadata
    }

    /// The full configuration the app was built with.
    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    /// Endpoints of the registered instance; empty before registration or without a registrar.
    pub async fn endpoints(&self) -> Vec<String> {
        self.instance
            .lock()
            .await
            .as_ref()
            .map(|instance| instance.endpoints.clone())
            .unwrap_or_default()
    }

    /// Runs the app until every runner returned, a shutdown signal arrives, or `ctx` is cancelled.
    ///
    /// Fails without side effects when the profiling listener cannot bind.
    pub async fn run(self: &Arc<Self>, ctx: Context) -> Result<(), ExecError> {
        let mut runners = self.runners.clone();
        if let Some(addr) = self.cfg.profiling_addr() {
            runners.push(Arc::new(ProfilingRunner::bind(addr).await?));
        }
        let ctx = ctx.child();

        let starts: Vec<ExecutorRef> = if runners.is_empty() {
            vec![ExecutorFn::arc(|ctx: Context| async move {
                ctx.cancelled().await;
                Ok(())
            })]
        } else {
            runners
                .iter()
                .map(|runner| Arc::new(StartRunner(runner.clone())) as ExecutorRef)
                .collect()
        };
        let stops: Vec<ExecutorRef> = runners
            .iter()
            .map(|runner| {
                Arc::new(StopRunner {
                    runner: runner.clone(),
                    timeout: self.cfg.stop_timeout,
                }) as ExecutorRef
            })
            .collect();

        let poller = ReadinessPoller::new(runners.clone(), self.hooks.all_ready.clone());
        let root = Parallel::new(vec![
            Arc::new(Parallel::new(starts)) as ExecutorRef,
            Arc::new(poller),
        ]);

        let before = {
            let app = self.clone();
            func(move |ctx| {
                let app = app.clone();
                let runners = runners.clone();
                async move { app.before(ctx, &runners).await }
            })
        };
        let post_stop = {
            let app = self.clone();
            ExecutorFn::arc(move |ctx| {
                let app = app.clone();
                async move { app.post_stop(ctx).await }
            })
        };
        let after = Append::new(vec![
            Arc::new(Parallel::new(stops).with_mode(FailureMode::Error)) as ExecutorRef,
            post_stop,
        ]);
        let shutdown = {
            let ctx = ctx.clone();
            func(move |_| {
                ctx.cancel();
                async { Ok(()) }
            })
        };

        Exec::builder(root)
            .before(before)
            .after(after)
            .signal(shutdown, self.cfg.signals.iter().copied())
            .build()
            .run(ctx)
            .await
    }

    async fn before(&self, ctx: Context, runners: &[RunnerRef]) -> Result<(), ExecError> {
        if let Some(hook) = &self.hooks.before {
            hook.execute(ctx.clone()).await?;
        }
        let Some(registrar) = &self.registrar else {
            return Ok(());
        };

        let instance = self.build_instance(runners).await?;
        let (rctx, _guard) = ctx.with_timeout(self.cfg.registrar_timeout);
        info!(id = %instance.id, name = %instance.name, endpoints = ?instance.endpoints, "registering service instance");
        tokio::time::timeout(self.cfg.registrar_timeout, registrar.register(rctx, &instance))
            .await
            .map_err(|_| ExecError::DeadlineExceeded)??;

        *self.instance.lock().await = Some(instance);
        Ok(())
    }

    async fn post_stop(&self, ctx: Context) -> Result<(), ExecError> {
        if let Some(hook) = &self.hooks.after {
            hook.execute(ctx.clone()).await?;
        }
        let Some(registrar) = &self.registrar else {
            return Ok(());
        };

        let slot = self.instance.lock().await;
        let Some(instance) = slot.as_ref() else {
            return Ok(());
        };
        let (rctx, _guard) = ctx.with_timeout(self.cfg.registrar_timeout);
        info!(id = %instance.id, name = %instance.name, "deregistering service instance");
        let res = tokio::time::timeout(self.cfg.registrar_timeout, registrar.deregister(rctx, instance))
            .await
            .map_err(|_| ExecError::DeadlineExceeded)
            .and_then(|res| res);
        if let Err(err) = &res {
            warn!(error = %err, "deregistration failed");
        }
        res
    }

    async fn build_instance(&self, runners: &[RunnerRef]) -> Result<ServiceInstance, ExecError> {
        let mut endpoints = Vec::new();
        for runner in runners {
            let Some(endpointer) = runner.as_endpointer() else {
                continue;
            };
            let url = endpointer.endpoint()?;
            endpoints.push(percent_decode_str(url.as_str()).decode_utf8_lossy().into_owned());
        }

        Ok(ServiceInstance {
            id: self.cfg.id.clone(),
            name: self.cfg.name.clone(),
            version: self.cfg.version.clone(),
            metadata: self.cfg.metadata.clone(),
            endpoints,
            launch_time: Utc::now().timestamp(),
            ip: host::outbound_ip()
                .await
                .map(|ip| ip.to_string())
                .unwrap_or_default(),
        })
    }
}
