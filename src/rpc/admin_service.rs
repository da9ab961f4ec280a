//! The Supervisor control surface (spec.md §4.1 "Supervisor CLI / control
//! surface, not public wire"): `start`/`stop`/`list`/`health`, consumed only
//! by `acsd-ctl`.

use super::proto;
use crate::supervisor::{Supervisor, TenantRecord, WorkerLauncher};
use crate::tenant::TenantId;
use std::sync::Arc;
use tonic::{Request, Response, Status};

pub struct AdminGrpc<L: WorkerLauncher, Sink> {
    supervisor: Arc<Supervisor<L, Sink>>,
}

impl<L: WorkerLauncher, Sink> AdminGrpc<L, Sink> {
    pub fn new(supervisor: Arc<Supervisor<L, Sink>>) -> Self {
        Self { supervisor }
    }
}

fn to_reply(record: TenantRecord) -> proto::TenantRecordReply {
    proto::TenantRecordReply {
        tenant_id: record.tenant_id.as_str().to_string(),
        state: record.state.to_string(),
        listen_port: record.listen_port.map(u32::from).unwrap_or(0),
        generation: record.generation,
        restart_count: record.restart_count,
    }
}

#[tonic::async_trait]
impl<L, Sink> proto::admin_server::Admin for AdminGrpc<L, Sink>
where
    L: WorkerLauncher + Send + Sync + 'static,
    L::Handle: Send,
    Sink: tower::Service<crate::telemetry::PolicyEvent, Response = ()> + Clone + Send + 'static,
    Sink::Error: std::error::Error + Send + 'static,
    Sink::Future: Send + 'static,
{
    async fn start(
        &self,
        request: Request<proto::TenantIdRequest>,
    ) -> Result<Response<proto::TenantRecordReply>, Status> {
        let tenant_id = TenantId::parse(request.into_inner().tenant_id)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        self.supervisor
            .start(&tenant_id)
            .await
            .map(|record| Response::new(to_reply(record)))
            .map_err(|e| Status::unavailable(e.to_string()))
    }

    async fn stop(&self, request: Request<proto::TenantIdRequest>) -> Result<Response<proto::Empty>, Status> {
        let tenant_id = TenantId::parse(request.into_inner().tenant_id)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        self.supervisor.stop(&tenant_id).await;
        Ok(Response::new(proto::Empty {}))
    }

    async fn list(&self, _request: Request<proto::Empty>) -> Result<Response<proto::ListReply>, Status> {
        let records = self.supervisor.list().into_iter().map(to_reply).collect();
        Ok(Response::new(proto::ListReply { records }))
    }

    async fn health(
        &self,
        request: Request<proto::TenantIdRequest>,
    ) -> Result<Response<proto::TenantRecordReply>, Status> {
        let tenant_id = TenantId::parse(request.into_inner().tenant_id)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        self.supervisor
            .lookup(&tenant_id)
            .map(|record| Response::new(to_reply(record)))
            .ok_or_else(|| Status::not_found(format!("unknown tenant {tenant_id}")))
    }
}
