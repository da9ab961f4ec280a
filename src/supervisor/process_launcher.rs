//! Production [`WorkerLauncher`]: spawns the `acsd-worker` binary as a child
//! process and probes it over the gRPC `HealthCheck` RPC (spec.md §4.1, §6).

use super::WorkerLauncher;
use crate::acs_error::AcsErrorKind;
use crate::rpc::proto::{acs_client::AcsClient, HealthCheckRequest};
use crate::tenant::TenantId;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

pub struct ProcessLauncher {
    worker_binary: PathBuf,
}

impl ProcessLauncher {
    pub fn new(worker_binary: impl Into<PathBuf>) -> Self {
        Self { worker_binary: worker_binary.into() }
    }
}

#[async_trait]
impl WorkerLauncher for ProcessLauncher {
    type Handle = Child;

    async fn spawn(&self, tenant_id: &TenantId, port: u16) -> Result<Self::Handle, AcsErrorKind> {
        Command::new(&self.worker_binary)
            .env("TENANT_ID", tenant_id.as_str())
            .env("GRPC_PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AcsErrorKind::SpawnFailed {
                tenant_id: tenant_id.to_string(),
                reason: e.to_string(),
            })
    }

    async fn health_check(&self, _tenant_id: &TenantId, port: u16) -> bool {
        let Ok(endpoint) = tonic::transport::Channel::from_shared(format!("http://127.0.0.1:{port}"))
        else {
            return false;
        };
        let mut client = AcsClient::new(endpoint.connect_lazy());
        matches!(client.health_check(HealthCheckRequest {}).await, Ok(response) if response.into_inner().healthy)
    }

    /// No portable way to send a graceful-shutdown signal without `unsafe`
    /// (this crate forbids it); wait for natural exit within `grace`, then
    /// hard-kill.
    async fn terminate(&self, mut handle: Self::Handle, grace: Duration) {
        let _ = tokio::time::timeout(grace, handle.wait()).await;
        let _ = handle.kill().await;
    }
}
