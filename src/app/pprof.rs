//! Profiling runner appended by the [`App`](super::App) when a profiling address is configured.
//!
//! The listener is bound when the app starts running, so its endpoint (`pprof://host:port`)
//! is known before registration.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tracing::info;
use url::Url;

use crate::app::host;
use crate::app::runner::{Endpointer, Runner};
use crate::context::Context;
use crate::error::ExecError;
use crate::executors::http::{profiling_router, serve, SHUTDOWN_GRACE};

pub(crate) struct ProfilingRunner {
    listener: Mutex<Option<TcpListener>>,
    endpoint: Url,
    shutdown: Context,
}

impl ProfilingRunner {
    /// Binds `addr`; the listener is served by [`Runner::start`].
    pub(crate) async fn bind(addr: &str) -> Result<Self, ExecError> {
        let listener = TcpListener::bind(addr).await?;
        let advertised = host::advertised(listener.local_addr()?).await;
        let endpoint = Url::parse(&format!("pprof://{advertised}"))
            .map_err(|e| ExecError::Config(format!("profiling endpoint: {e}")))?;

        Ok(Self {
            listener: Mutex::new(Some(listener)),
            endpoint,
            shutdown: Context::background(),
        })
    }
}

#[async_trait]
impl Runner for ProfilingRunner {
    async fn start(&self, _ctx: Context) -> Result<(), ExecError> {
        let listener = self
            .listener
            .lock()
            .map_err(|_| ExecError::Config("profiling listener poisoned".into()))?
            .take()
            .ok_or_else(|| ExecError::Config("profiling listener already started".into()))?;

        info!(endpoint = %self.endpoint, "profiling listener started");
        serve(self.shutdown.clone(), listener, profiling_router(), SHUTDOWN_GRACE).await
    }

    async fn stop(&self, _ctx: Context) -> Result<(), ExecError> {
        self.shutdown.cancel();
        Ok(())
    }

    fn as_endpointer(&self) -> Option<&dyn Endpointer> {
        Some(self)
    }
}

impl Endpointer for ProfilingRunner {
    fn endpoint(&self) -> Result<Url, ExecError> {
        Ok(self.endpoint.clone())
    }
}
