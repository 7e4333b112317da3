//! # OS signal delivery for the [`Exec`](super::Exec) driver.
//!
//! [`Signal`] names the signals the driver can react to. [`SignalListener::arm`] installs one
//! listener task per configured signal; every delivery is forwarded into a single-slot channel
//! (extra deliveries while the slot is full are coalesced).
//!
//! **Unix platforms:** every variant maps to a [`tokio::signal::unix::SignalKind`].
//!
//! **Other platforms:** only [`Signal::Interrupt`] is supported (via [`tokio::signal::ctrl_c`]);
//! other variants are ignored.

use std::fmt;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;
#[cfg(not(unix))]
use tracing::warn;

/// Signals that can be mapped to side executors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    /// `SIGINT` (Ctrl-C).
    Interrupt,
    /// `SIGTERM` (default kill signal, used by systemd/Kubernetes).
    Terminate,
    /// `SIGQUIT`.
    Quit,
    /// `SIGHUP`.
    Hangup,
    /// `SIGUSR1`.
    User1,
    /// `SIGUSR2`.
    User2,
}

impl Signal {
    /// Default shutdown set: terminate, quit, interrupt.
    pub const SHUTDOWN: [Signal; 3] = [Signal::Terminate, Signal::Quit, Signal::Interrupt];

    #[cfg(unix)]
    fn kind(self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;
        match self {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Quit => SignalKind::quit(),
            Signal::Hangup => SignalKind::hangup(),
            Signal::User1 => SignalKind::user_defined1(),
            Signal::User2 => SignalKind::user_defined2(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Quit => "SIGQUIT",
            Signal::Hangup => "SIGHUP",
            Signal::User1 => "SIGUSR1",
            Signal::User2 => "SIGUSR2",
        };
        f.write_str(name)
    }
}

/// Armed signal listeners. Dropping it uninstalls them.
pub(crate) struct SignalListener {
    rx: Option<mpsc::Receiver<Signal>>,
    _tasks: JoinSet<()>,
}

impl SignalListener {
    /// Arms listeners for `signals`; an empty set installs nothing.
    pub(crate) fn arm<I>(signals: I) -> std::io::Result<Self>
    where
        I: IntoIterator<Item = Signal>,
    {
        let mut tasks = JoinSet::new();
        let (tx, rx) = mpsc::channel(1);
        let mut armed = 0usize;

        for sig in signals {
            if forward(&mut tasks, sig, tx.clone())? {
                armed += 1;
            }
        }
        debug!(armed, "signal listeners armed");

        Ok(Self {
            rx: (armed > 0).then_some(rx),
            _tasks: tasks,
        })
    }

    /// Waits for the next delivered signal; pends forever when nothing is armed.
    pub(crate) async fn recv(&mut self) -> Option<Signal> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(unix)]
fn forward(tasks: &mut JoinSet<()>, sig: Signal, tx: mpsc::Sender<Signal>) -> std::io::Result<bool> {
    let mut stream = tokio::signal::unix::signal(sig.kind())?;
    tasks.spawn(async move {
        while stream.recv().await.is_some() {
            if tx.try_send(sig).is_err() {
                debug!(signal = %sig, "signal coalesced");
            }
        }
    });
    Ok(true)
}

#[cfg(not(unix))]
fn forward(tasks: &mut JoinSet<()>, sig: Signal, tx: mpsc::Sender<Signal>) -> std::io::Result<bool> {
    if sig != Signal::Interrupt {
        warn!(signal = %sig, "signal not supported on this platform");
        return Ok(false);
    }
    tasks.spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.try_send(sig);
        }
    });
    Ok(true)
}
