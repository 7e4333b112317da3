//! # App configuration.
//!
//! [`AppConfig`] holds the identity and shutdown settings of an [`App`](super::App).
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use execvisor::app::AppConfig;
//!
//! let mut cfg = AppConfig::default();
//! cfg.name = "billing".into();
//! cfg.stop_timeout = Duration::from_secs(5);
//! cfg.profiling = Some("127.0.0.1:6060".into());
//!
//! assert_eq!(cfg.profiling_addr(), Some("127.0.0.1:6060"));
//! ```

use std::collections::HashMap;
use std::time::Duration;

use crate::exec::Signal;

/// Identity, signals and timeouts of an app.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Instance id.
    pub id: String,
    /// Service name.
    pub name: String,
    /// Service version.
    pub version: String,
    /// Free-form service metadata.
    pub metadata: HashMap<String, String>,
    /// Signals that trigger shutdown.
    pub signals: Vec<Signal>,
    /// Deadline handed to every runner's `stop`.
    pub stop_timeout: Duration,
    /// Bound for each registrar call.
    pub registrar_timeout: Duration,
    /// Profiling listener address (`None` or empty = disabled).
    pub profiling: Option<String>,
}

impl AppConfig {
    /// Profiling address, if enabled.
    pub fn profiling_addr(&self) -> Option<&str> {
        self.profiling.as_deref().filter(|addr| !addr.is_empty())
    }
}

impl Default for AppConfig {
    /// Provides a default configuration:
    /// - `id = random uuid v4`
    /// - empty `name`, `version`, `metadata`
    /// - `signals = [SIGTERM, SIGQUIT, SIGINT]`
    /// - `stop_timeout = 30s`
    /// - `registrar_timeout = 10s`
    /// - `profiling = None`
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: String::new(),
            version: String::new(),
            metadata: HashMap::new(),
            signals: Signal::SHUTDOWN.to_vec(),
            stop_timeout: Duration::from_secs(30),
            registrar_timeout: Duration::from_secs(10),
            profiling: None,
        }
    }
}
