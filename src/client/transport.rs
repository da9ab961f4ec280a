//! The boundary between the Tenant Client and however an envelope actually
//! crosses the wire to a worker (spec.md §4.3/§6). Production code wires
//! [`Connector`] to [`crate::rpc`]'s gRPC client; tests inject a fake.

use crate::acs_error::AcsErrorKind;
use crate::tenant::TenantId;
use crate::wire::{CancellationToken, Envelope, Reply};
use async_trait::async_trait;

/// A live connection to one tenant worker. Cheap to clone (e.g. a gRPC
/// channel handle); cloning must not reconnect.
#[async_trait]
pub trait Transport: Clone + Send + Sync + 'static {
    async fn call(&self, envelope: Envelope, cancel: CancellationToken) -> Result<Reply, AcsErrorKind>;
}

/// Establishes a [`Transport`] to a tenant's worker at `host:port`.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    async fn connect(&self, tenant_id: &TenantId, port: u16) -> Result<Self::Transport, AcsErrorKind>;
}
