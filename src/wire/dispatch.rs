//! Dispatch algorithm (spec.md §4.4): look the op up, invoke it, and turn the
//! outcome into a [`Reply`] that always echoes the request's correlation id.

use crate::acs_error::AcsErrorKind;
use crate::telemetry::{emit_best_effort, DispatchEvent, NullSink, PolicyEvent};
use crate::wire::cancel::CancellationToken;
use crate::wire::envelope::{Envelope, Reply};
use crate::wire::registry::HandlerRegistry;
use std::sync::Arc;

/// Binds a [`HandlerRegistry`] to the dispatch algorithm. Stateless beyond the
/// registry handle and a telemetry sink; cheap to clone and share across
/// connections.
///
/// Generic over the telemetry sink the way [`crate::buffer::CommandBuffer`]
/// is, defaulting to [`NullSink`] for callers who don't wire one up.
#[derive(Clone)]
pub struct Dispatcher<Sink = NullSink> {
    registry: Arc<HandlerRegistry>,
    sink: Sink,
}

impl Dispatcher<NullSink> {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self::with_sink(registry, NullSink)
    }
}

impl<Sink> Dispatcher<Sink>
where
    Sink: tower::Service<PolicyEvent, Response = ()> + Clone + Send + 'static,
    Sink::Error: std::error::Error + Send + 'static,
    Sink::Future: Send + 'static,
{
    pub fn with_sink(registry: Arc<HandlerRegistry>, sink: Sink) -> Self {
        Self { registry, sink }
    }

    /// Steps 1-6 of the dispatch algorithm. Never panics on caller input: any
    /// failure becomes a `Reply { success: false, .. }`.
    pub async fn dispatch(&self, envelope: Envelope, cancel: CancellationToken) -> Reply {
        let Envelope { op_name, payload_bytes, correlation_id } = envelope;

        let Some(handler) = self.registry.get(&op_name) else {
            self.emit(DispatchEvent::UnknownOp { op_name: op_name.clone() }).await;
            let kind = AcsErrorKind::UnknownOp { op_name };
            return Reply::failure(&kind, correlation_id);
        };

        if cancel.is_cancelled() {
            return Reply::failure(&AcsErrorKind::Cancelled, correlation_id);
        }

        match handler.invoke(&payload_bytes, cancel).await {
            Ok(result_bytes) => Reply::success(result_bytes, correlation_id),
            Err(kind) => {
                match &kind {
                    AcsErrorKind::BadPayload { .. } => {
                        self.emit(DispatchEvent::BadPayload { op_name: op_name.clone() }).await;
                    }
                    AcsErrorKind::Cancelled => {}
                    _ => {
                        self.emit(DispatchEvent::HandlerError { op_name: op_name.clone() }).await;
                    }
                }
                Reply::failure(&kind, correlation_id)
            }
        }
    }

    async fn emit(&self, event: DispatchEvent) {
        emit_best_effort(self.sink.clone(), PolicyEvent::Dispatch(event)).await;
    }
}
