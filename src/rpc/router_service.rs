//! The Router's front door (spec.md §2 "Tenant Extractor"): resolves
//! `tenant_id` and proxies the envelope through the [`TenantClient`].

use super::proto;
use crate::client::{Connector, TenantClient};
use crate::tenant::TenantId;
use crate::wire::{CancelOnDrop, CancellationToken};
use std::time::Duration;
use tonic::{Request, Response, Status};

pub struct RouterGrpc<C: Connector> {
    client: TenantClient<C>,
    call_deadline: Duration,
}

impl<C: Connector> RouterGrpc<C> {
    pub fn new(client: TenantClient<C>, call_deadline: Duration) -> Self {
        Self { client, call_deadline }
    }

    pub fn into_router(self) -> tonic::transport::server::Router {
        let service = proto::router_server::RouterServer::new(self)
            .max_decoding_message_size(super::MAX_MESSAGE_SIZE)
            .max_encoding_message_size(super::MAX_MESSAGE_SIZE);
        tonic::transport::Server::builder().add_service(service)
    }
}

#[tonic::async_trait]
impl<C: Connector> proto::router_server::Router for RouterGrpc<C> {
    async fn route(&self, request: Request<proto::RouteRequest>) -> Result<Response<proto::Reply>, Status> {
        let req = request.into_inner();
        let tenant_id =
            TenantId::parse(req.tenant_id).map_err(|e| Status::invalid_argument(e.to_string()))?;
        let envelope = req.envelope.ok_or_else(|| Status::invalid_argument("envelope is required"))?;
        let envelope = crate::wire::Envelope::new(envelope.op_name, envelope.payload_bytes, envelope.correlation_id);
        let cancel = CancellationToken::new();
        let _cancel_guard = CancelOnDrop::new(cancel.clone());

        match self.client.call(&tenant_id, envelope, cancel, self.call_deadline).await {
            Ok(reply) => Ok(Response::new(proto::Reply {
                success: reply.success,
                result_bytes: reply.result_bytes,
                error_message: reply.error_message,
                correlation_id: reply.correlation_id,
            })),
            Err(kind) => {
                let reply = crate::wire::Reply::failure(&kind, String::new());
                Ok(Response::new(proto::Reply {
                    success: reply.success,
                    result_bytes: reply.result_bytes,
                    error_message: reply.error_message,
                    correlation_id: reply.correlation_id,
                }))
            }
        }
    }
}
