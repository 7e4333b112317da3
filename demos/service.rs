//! # Example: Service lifecycle
//!
//! An app with two runners (a periodic job and a ticker that becomes ready after a
//! warm-up), a profiling listener and a registrar printing the registered instance.
//!
//! Run with `RUST_LOG=debug cargo run --example service`, stop with Ctrl-C.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use execvisor::app::{App, Ready, Registrar, Runner, RunnerFn, ServiceInstance};
use execvisor::executors::{Repeat, Retry};
use execvisor::{func, Context, ExecError, Executor};
use tracing_subscriber::EnvFilter;

/// Registry that prints instead of publishing.
struct StdoutRegistry;

#[async_trait]
impl Registrar for StdoutRegistry {
    async fn register(&self, _ctx: Context, instance: &ServiceInstance) -> Result<(), ExecError> {
        let json = serde_json::to_string_pretty(instance).map_err(ExecError::fail)?;
        println!("[registry] register\n{json}");
        Ok(())
    }

    async fn deregister(&self, _ctx: Context, instance: &ServiceInstance) -> Result<(), ExecError> {
        println!("[registry] deregister {}", instance.id);
        Ok(())
    }
}

/// Becomes ready after a warm-up, then ticks until stopped.
#[derive(Default)]
struct Ticker {
    ready: AtomicBool,
    halt: Context,
}

#[async_trait]
impl Runner for Ticker {
    async fn start(&self, _ctx: Context) -> Result<(), ExecError> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        self.ready.store(true, Ordering::SeqCst);

        let tick = Repeat::new(
            0,
            Duration::from_secs(1),
            Arc::new(func(|_ctx: Context| async {
                println!("[ticker] tick");
                Ok(())
            })),
        );
        match tick.execute(self.halt.clone()).await {
            Err(err) if err.is_context() => Ok(()),
            other => other,
        }
    }

    async fn stop(&self, _ctx: Context) -> Result<(), ExecError> {
        println!("[ticker] stop");
        self.halt.cancel();
        Ok(())
    }

    fn as_ready(&self) -> Option<&dyn Ready> {
        Some(self)
    }
}

impl Ready for Ticker {
    fn ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let job = RunnerFn::new(|ctx: Context| async move {
        let flaky = Retry::new(
            3,
            Arc::new(func(|ctx: Context| async move {
                let attempt = execvisor::executors::retry_attempt(&ctx);
                println!("[job] attempt {attempt}");
                if attempt < 2 {
                    return Err(ExecError::fail("warming up"));
                }
                Ok(())
            })),
        );
        flaky.execute(ctx.clone()).await?;
        ctx.cancelled().await;
        Ok(())
    });

    let app = App::builder()
        .name("demo")
        .version(env!("CARGO_PKG_VERSION"))
        .stop_timeout(Duration::from_secs(5))
        .profiling("127.0.0.1:0")
        .registrar(StdoutRegistry)
        .on_all_ready(func(|_ctx: Context| async {
            println!("[app] all runners ready");
            Ok(())
        }))
        .on_stop(func(|_ctx: Context| async {
            println!("[app] runners stopped");
            Ok(())
        }))
        .runner(job)
        .runner(Ticker::default())
        .build();

    println!("[app] id={} name={}", app.id(), app.name());
    app.run(Context::background()).await?;
    Ok(())
}
