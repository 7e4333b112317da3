use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::Argument;
use crate::exec::driver::Exec;
use crate::exec::signals::Signal;
use crate::executors::ExecutorRef;

/// Options of one [`Exec`] run, fixed at build time.
#[derive(Clone, Default)]
pub(crate) struct ExecOptions {
    pub(crate) before: Option<ExecutorRef>,
    pub(crate) after: Option<ExecutorRef>,
    pub(crate) signals: HashMap<Signal, ExecutorRef>,
    pub(crate) args: Vec<Argument>,
}

/// Builder for an [`Exec`] driver.
///
/// # Example
/// ```rust
/// use execvisor::{func, Context, Exec, ExecError, Signal};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), ExecError> {
/// let ctx = Context::background();
/// let stop = ctx.clone();
///
/// let exec = Exec::builder(func(|ctx: Context| async move {
///         assert_eq!(ctx.argument::<&str>(), Some(&"config.toml"));
///         Ok(())
///     }))
///     .before(func(|_| async { Ok(()) }))
///     .after(func(|_| async { Ok(()) }))
///     .signal(func(move |_| { stop.cancel(); async { Ok(()) } }), Signal::SHUTDOWN)
///     .argument("config.toml")
///     .build();
///
/// exec.run(ctx).await
/// # }
/// ```
pub struct ExecBuilder {
    root: ExecutorRef,
    opts: ExecOptions,
}

impl ExecBuilder {
    /// Creates a builder around the root executor.
    pub fn new(root: impl crate::Executor) -> Self {
        Self::from_ref(Arc::new(root))
    }

    /// Creates a builder around a shared root executor.
    pub fn from_ref(root: ExecutorRef) -> Self {
        Self {
            root,
            opts: ExecOptions::default(),
        }
    }

    /// Pre-hook: runs before the root; its failure aborts the run with no cleanup.
    pub fn before(mut self, exec: impl crate::Executor) -> Self {
        self.opts.before = Some(Arc::new(exec));
        self
    }

    /// Post-hook: runs exactly once after a successful pre-hook, however the run ends.
    pub fn after(mut self, exec: impl crate::Executor) -> Self {
        self.opts.after = Some(Arc::new(exec));
        self
    }

    /// Maps every signal in `signals` to `exec`.
    pub fn signal<I>(mut self, exec: impl crate::Executor, signals: I) -> Self
    where
        I: IntoIterator<Item = Signal>,
    {
        let exec: ExecutorRef = Arc::new(exec);
        for sig in signals {
            self.opts.signals.insert(sig, exec.clone());
        }
        self
    }

    /// Replaces the injected arguments.
    pub fn arguments<I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = Argument>,
    {
        self.opts.args = args.into_iter().collect();
        self
    }

    /// Appends one injected argument.
    pub fn argument<T: Any + Send + Sync>(mut self, arg: T) -> Self {
        self.opts.args.push(Arc::new(arg));
        self
    }

    /// Builds the driver.
    pub fn build(self) -> Exec {
        Exec::from_parts(self.root, self.opts)
    }
}
