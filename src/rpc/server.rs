//! The `Acs` gRPC service: a thin adapter from tonic requests onto a
//! worker's [`CommandBuffer`] (spec.md §2: "Worker's RPC Endpoint" →
//! "Command Buffer").

use super::proto;
use crate::buffer::CommandBuffer;
use crate::telemetry::NullSink;
use crate::wire::{CancelOnDrop, CancellationToken};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tonic::{Request, Response, Status};

pub struct AcsGrpc<Sink = NullSink> {
    buffer: Arc<CommandBuffer<Sink>>,
    active_connections: AtomicU32,
}

impl<Sink> AcsGrpc<Sink> {
    pub fn new(buffer: Arc<CommandBuffer<Sink>>) -> Self {
        Self { buffer, active_connections: AtomicU32::new(0) }
    }
}

#[tonic::async_trait]
impl<Sink> proto::acs_server::Acs for AcsGrpc<Sink>
where
    Sink: tower::Service<crate::telemetry::PolicyEvent, Response = ()> + Clone + Send + 'static,
    Sink::Error: std::error::Error + Send + 'static,
    Sink::Future: Send + 'static,
{
    async fn execute_command(
        &self,
        request: Request<proto::Envelope>,
    ) -> Result<Response<proto::Reply>, Status> {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        let req = request.into_inner();
        let envelope = crate::wire::Envelope::new(req.op_name, req.payload_bytes, req.correlation_id);
        let cancel = CancellationToken::new();
        let _cancel_guard = CancelOnDrop::new(cancel.clone());
        let reply = self.buffer.dispatch_envelope(envelope, cancel).await;
        self.active_connections.fetch_sub(1, Ordering::Relaxed);

        Ok(Response::new(proto::Reply {
            success: reply.success,
            result_bytes: reply.result_bytes,
            error_message: reply.error_message,
            correlation_id: reply.correlation_id,
        }))
    }

    async fn health_check(
        &self,
        _request: Request<proto::HealthCheckRequest>,
    ) -> Result<Response<proto::HealthCheckResponse>, Status> {
        let snapshot = self.buffer.stats();
        Ok(Response::new(proto::HealthCheckResponse {
            healthy: true,
            uptime_seconds: snapshot.uptime.as_secs(),
            commands_processed: snapshot.commands_processed,
            active_connections: self.active_connections.load(Ordering::Relaxed),
        }))
    }
}

impl<Sink> AcsGrpc<Sink>
where
    Sink: tower::Service<crate::telemetry::PolicyEvent, Response = ()> + Clone + Send + 'static,
    Sink::Error: std::error::Error + Send + 'static,
    Sink::Future: Send + 'static,
{
    pub fn into_router(self) -> tonic::transport::server::Router {
        let service = proto::acs_server::AcsServer::new(self)
            .max_decoding_message_size(super::MAX_MESSAGE_SIZE)
            .max_encoding_message_size(super::MAX_MESSAGE_SIZE);
        tonic::transport::Server::builder().add_service(service)
    }
}
