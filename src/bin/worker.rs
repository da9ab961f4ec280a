//! Tenant worker process: hosts one tenant's [`CommandBuffer`] behind the
//! `Acs` gRPC service (spec.md §6). Launched by the Supervisor with
//! `TENANT_ID`/`GRPC_PORT` set in its environment.

use acsd::config::WorkerConfig;
use acsd::prelude::*;
use std::sync::Arc;

fn install_echo_handler(registry: &HandlerRegistry) {
    use acsd::wire::JsonHandler;

    registry
        .register(
            "echo",
            Arc::new(JsonHandler::<String, String, _>::new(
                "echo",
                acsd::wire::OpClass::CommandWithResult,
                |req, _cancel| async move { Ok(req) },
            )),
        )
        .expect("echo is registered exactly once at startup");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = WorkerConfig::from_env()?;
    tracing::info!(tenant_id = %config.tenant_id, port = config.grpc_port, "worker starting");

    let registry = Arc::new(HandlerRegistry::new());
    install_echo_handler(&registry);

    let buffer = Arc::new(CommandBuffer::with_sink(config.buffer, registry, LogSink));
    let service = AcsGrpc::new(buffer);

    let addr = format!("0.0.0.0:{}", config.grpc_port).parse()?;
    service.into_router().serve(addr).await?;
    Ok(())
}
