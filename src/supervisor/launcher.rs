//! The boundary between the Supervisor and however a worker process is
//! actually started and probed (spec.md §4.1: "launch child with tenant id
//! and port as parameters", "poll child's health endpoint").
//!
//! Production code wires this to `tokio::process::Command` plus an RPC
//! `HealthCheck` call (see `acsd-router`'s `main.rs`); tests inject a fake.

use crate::acs_error::AcsErrorKind;
use crate::tenant::TenantId;
use async_trait::async_trait;
use std::time::Duration;

/// Spawns and probes tenant worker processes.
#[async_trait]
pub trait WorkerLauncher: Send + Sync + 'static {
    /// Opaque handle to a spawned child; used only to terminate it later.
    type Handle: Send + 'static;

    async fn spawn(&self, tenant_id: &TenantId, port: u16) -> Result<Self::Handle, AcsErrorKind>;

    /// Probe the worker's health endpoint; `true` means `healthy`.
    async fn health_check(&self, tenant_id: &TenantId, port: u16) -> bool;

    /// Ask the worker to exit gracefully, then hard-kill after `grace`.
    async fn terminate(&self, handle: Self::Handle, grace: Duration);
}
