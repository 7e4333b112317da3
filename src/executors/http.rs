//! # Background HTTP listeners.
//!
//! [`HttpServer`] serves an [`axum::Router`] on a configured address until the context is
//! cancelled; [`Profiling`] is the same listener preloaded with a diagnostics router.
//!
//! ## Flow
//! ```text
//! execute(ctx)
//!   ├─ address empty ─► Ok(())            (no-op)
//!   ├─ bind ─► Err(Io) on failure
//!   ├─ spawn serve(listener).with_graceful_shutdown(rx)
//!   └─ select:
//!        ├─ ctx cancelled ─► send shutdown, wait ≤ 1s ─► Ok / DeadlineExceeded
//!        └─ server ended  ─► its result
//! ```
//!
//! Exactly one of {shutdown result, server result} is returned.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{routing::get, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::ExecError;
use crate::executors::executor::Executor;

/// Upper bound for the graceful shutdown of a listener.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Generic HTTP listener executor.
#[derive(Clone)]
pub struct HttpServer {
    addr: String,
    router: Router,
}

impl HttpServer {
    /// Creates a listener for `addr` (`""` disables it).
    pub fn new(addr: impl Into<String>, router: Router) -> Self {
        Self {
            addr: addr.into(),
            router,
        }
    }

    /// Configured address.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Executor for HttpServer {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        if self.addr.is_empty() {
            return Ok(());
        }
        let listener = TcpListener::bind(&self.addr).await?;
        info!(addr = %self.addr, "http listener started");
        serve(ctx, listener, self.router.clone(), SHUTDOWN_GRACE).await
    }
}

/// Serves `router` on `listener` until `ctx` is cancelled or the server fails.
pub(crate) async fn serve(
    ctx: Context,
    listener: TcpListener,
    router: Router,
    grace: Duration,
) -> Result<(), ExecError> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::select! {
        _ = ctx.cancelled() => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(grace, &mut server).await {
                Ok(Ok(res)) => res.map_err(ExecError::from),
                Ok(Err(join)) => Err(ExecError::Panic(join.to_string())),
                Err(_elapsed) => {
                    server.abort();
                    debug!(?grace, "http listener shutdown exceeded grace");
                    Err(ExecError::DeadlineExceeded)
                }
            }
        }
        res = &mut server => match res {
            Ok(res) => res.map_err(ExecError::from),
            Err(join) => Err(ExecError::Panic(join.to_string())),
        }
    }
}

/// Diagnostics router: `/debug/health` and `/debug/vars`.
pub fn profiling_router() -> Router {
    let started = Instant::now();
    Router::new()
        .route("/debug/health", get(|| async { "ok" }))
        .route(
            "/debug/vars",
            get(move || async move {
                Json(json!({
                    "pid": std::process::id(),
                    "uptime_secs": started.elapsed().as_secs(),
                }))
            }),
        )
}

/// HTTP listener serving [`profiling_router`].
pub struct Profiling {
    inner: HttpServer,
}

impl Profiling {
    /// Creates a profiling listener for `addr` (`""` disables it).
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            inner: HttpServer::new(addr, profiling_router()),
        }
    }
}

#[async_trait]
impl Executor for Profiling {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        self.inner.execute(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn empty_address_is_noop() {
        let exec = HttpServer::new("", Router::new());
        assert!(exec.execute(Context::background()).await.is_ok());
    }

    #[tokio::test]
    async fn bad_address_fails_immediately() {
        let exec = Profiling::new("not-an-address");
        let err = exec.execute(Context::background()).await.unwrap_err();
        assert!(matches!(err, ExecError::Io(_)));
    }

    #[tokio::test]
    async fn serves_until_cancelled() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let ctx = Context::background();
        let handle = tokio::spawn(serve(
            ctx.clone(),
            listener,
            profiling_router(),
            SHUTDOWN_GRACE,
        ));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /debug/health HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut body = String::new();
        stream.read_to_string(&mut body).await.unwrap();
        assert!(body.starts_with("HTTP/1.1 200"));
        assert!(body.ends_with("ok"));

        ctx.cancel();
        assert!(handle.await.unwrap().is_ok());
    }
}
