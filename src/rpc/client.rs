//! gRPC implementations of [`crate::client::Connector`]/[`crate::client::Transport`].

use super::proto;
use crate::acs_error::AcsErrorKind;
use crate::client::{Connector, Transport};
use crate::tenant::TenantId;
use crate::wire::{CancellationToken, Envelope, Reply};
use async_trait::async_trait;
use tonic::transport::Channel;

#[derive(Clone)]
pub struct GrpcTransport {
    client: proto::acs_client::AcsClient<Channel>,
}

#[async_trait]
impl Transport for GrpcTransport {
    async fn call(&self, envelope: Envelope, cancel: CancellationToken) -> Result<Reply, AcsErrorKind> {
        if cancel.is_cancelled() {
            return Err(AcsErrorKind::Cancelled);
        }

        let request = tonic::Request::new(proto::Envelope {
            op_name: envelope.op_name,
            payload_bytes: envelope.payload_bytes,
            correlation_id: envelope.correlation_id,
        });

        let mut client = self.client.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AcsErrorKind::Cancelled),
            result = client.execute_command(request) => match result {
                Ok(response) => {
                    let reply = response.into_inner();
                    Ok(Reply {
                        success: reply.success,
                        result_bytes: reply.result_bytes,
                        error_message: reply.error_message,
                        correlation_id: reply.correlation_id,
                    })
                }
                Err(status) => Err(status_to_acs_error(status)),
            },
        }
    }
}

fn status_to_acs_error(status: tonic::Status) -> AcsErrorKind {
    use tonic::Code;
    match status.code() {
        Code::Unavailable | Code::Aborted | Code::Internal if is_transport_error(&status) => {
            AcsErrorKind::TenantUnavailable { tenant_id: String::new(), state: status.message().to_string() }
        }
        Code::DeadlineExceeded => AcsErrorKind::DeadlineExceeded { elapsed: std::time::Duration::ZERO },
        Code::Cancelled => AcsErrorKind::Cancelled,
        _ => AcsErrorKind::Internal { message: status.message().to_string() },
    }
}

/// `Unavailable`/`Aborted`/connection-level `Internal` statuses from tonic all
/// indicate the peer could not be reached rather than an application error.
fn is_transport_error(status: &tonic::Status) -> bool {
    matches!(status.code(), tonic::Code::Unavailable | tonic::Code::Aborted)
        || status.message().contains("transport error")
}

pub struct GrpcConnector {
    scheme: &'static str,
}

impl GrpcConnector {
    pub fn new() -> Self {
        Self { scheme: "http" }
    }
}

impl Default for GrpcConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for GrpcConnector {
    type Transport = GrpcTransport;

    async fn connect(&self, tenant_id: &TenantId, port: u16) -> Result<Self::Transport, AcsErrorKind> {
        let uri = format!("{}://127.0.0.1:{}", self.scheme, port);
        let channel = Channel::from_shared(uri)
            .map_err(|e| AcsErrorKind::TenantUnavailable {
                tenant_id: tenant_id.to_string(),
                state: format!("invalid worker endpoint: {e}"),
            })?
            .connect()
            .await
            .map_err(|e| AcsErrorKind::TenantUnavailable {
                tenant_id: tenant_id.to_string(),
                state: format!("connect failed: {e}"),
            })?;

        let client = proto::acs_client::AcsClient::new(channel)
            .max_decoding_message_size(super::MAX_MESSAGE_SIZE)
            .max_encoding_message_size(super::MAX_MESSAGE_SIZE);
        Ok(GrpcTransport { client })
    }
}
