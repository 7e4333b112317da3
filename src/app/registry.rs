//! # Service registration.
//!
//! A [`Registrar`] publishes the [`ServiceInstance`] describing this process to a registry
//! backend (etcd, consul, ...). The [`App`](super::App) registers once in its pre-start hook
//! and deregisters at most once after its runners stopped; both calls are bounded by
//! [`AppConfig::registrar_timeout`](super::AppConfig::registrar_timeout).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::ExecError;

/// Registry-facing description of this process.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Unique instance id, [`AppConfig::id`](super::AppConfig::id).
    pub id: String,
    /// Service name shared by every instance.
    pub name: String,
    /// Service version.
    pub version: String,
    /// Free-form labels copied from the app config.
    pub metadata: HashMap<String, String>,
    /// Percent-decoded endpoint URLs of every runner exposing one.
    pub endpoints: Vec<String>,
    /// Unix seconds.
    pub launch_time: i64,
    /// Outbound IP, empty when unknown.
    pub ip: String,
}

/// Registry backend.
#[async_trait]
pub trait Registrar: Send + Sync + 'static {
    /// Publishes `instance`. `ctx` carries the registrar timeout; an error aborts the run
    /// before any runner starts.
    async fn register(&self, ctx: Context, instance: &ServiceInstance) -> Result<(), ExecError>;

    /// Withdraws `instance`. Called at most once, after the runners stopped and only if
    /// registration succeeded; an error is logged.
    async fn deregister(&self, ctx: Context, instance: &ServiceInstance) -> Result<(), ExecError>;
}

/// Shared handle to a registrar.
pub type RegistrarRef = Arc<dyn Registrar>;
