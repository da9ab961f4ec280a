//! Router process: owns the Tenant Process Supervisor and exposes the
//! `Router`/`Acs`-client-facing front door over gRPC (spec.md §2, §6).
//!
//! Tenant extraction/authentication ahead of this service, and starting
//! tenants on demand, are out of scope here — a tenant must already be
//! `Ready` (via `acsd-ctl start`) before `Router::route` can reach it.

use acsd::config::Config;
use acsd::prelude::*;
use acsd::rpc::proto::admin_server::AdminServer;
use acsd::rpc::proto::router_server::RouterServer;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let addr = config.listen_addr.parse()?;

    let supervisor = Arc::new(Supervisor::with_sink(
        acsd::supervisor::ProcessLauncher::new(config.worker_binary.clone()),
        config.supervisor,
        LogSink,
    ));

    let client = TenantClient::new(supervisor.clone(), GrpcConnector::new(), config.breaker);
    let router = RouterGrpc::new(client, config.call_deadline);
    let admin = AdminGrpc::new(supervisor);

    tracing::info!(addr = %addr, "router listening");
    tonic::transport::Server::builder()
        .add_service(
            RouterServer::new(router)
                .max_decoding_message_size(acsd::rpc::MAX_MESSAGE_SIZE)
                .max_encoding_message_size(acsd::rpc::MAX_MESSAGE_SIZE),
        )
        .add_service(
            AdminServer::new(admin)
                .max_decoding_message_size(acsd::rpc::MAX_MESSAGE_SIZE)
                .max_encoding_message_size(acsd::rpc::MAX_MESSAGE_SIZE),
        )
        .serve(addr)
        .await?;
    Ok(())
}
