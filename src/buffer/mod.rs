//! The Command Buffer (spec.md §4.2): a bounded FIFO lane for commands run in
//! strict per-tenant order by a single consumer task, plus a bounded-parallel
//! lane for queries that carry no ordering requirement.
//!
//! Routing between the two lanes is driven entirely by the [`OpClass`]
//! registered for an envelope's `op_name` (spec.md §4.4) — the buffer never
//! inspects payload bytes to decide where work goes.

pub mod stats;

use crate::acs_error::AcsErrorKind;
use crate::config::{AdmissionPolicy, BufferConfig};
use crate::telemetry::{emit_best_effort, BufferEvent, NullSink, PolicyEvent};
use crate::wire::{CancellationToken, Dispatcher, Envelope, HandlerRegistry, OpClass, Reply};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinHandle;

pub use stats::{Stats, StatsSnapshot};

struct QueuedCommand {
    envelope: Envelope,
    cancel: CancellationToken,
    reply_tx: oneshot::Sender<Reply>,
}

/// Ordered command lane + parallel query lane, fronting a [`Dispatcher`].
///
/// Generic over the telemetry sink the way [`crate::timeout::TimeoutLayer`]
/// is, defaulting to [`NullSink`] for callers who don't wire one up.
pub struct CommandBuffer<Sink = NullSink> {
    command_tx: mpsc::Sender<QueuedCommand>,
    consumer: JoinHandle<()>,
    query_semaphore: Arc<Semaphore>,
    registry: Arc<HandlerRegistry>,
    dispatcher: Dispatcher<Sink>,
    stats: Arc<Stats>,
    admission_policy: AdmissionPolicy,
    sink: Sink,
}

impl CommandBuffer<NullSink> {
    pub fn new(config: BufferConfig, registry: Arc<HandlerRegistry>) -> Self {
        Self::with_sink(config, registry, NullSink)
    }
}

impl<Sink> CommandBuffer<Sink>
where
    Sink: tower::Service<PolicyEvent, Response = ()> + Clone + Send + 'static,
    Sink::Error: std::error::Error + Send + 'static,
    Sink::Future: Send + 'static,
{
    pub fn with_sink(config: BufferConfig, registry: Arc<HandlerRegistry>, sink: Sink) -> Self {
        let (command_tx, mut command_rx) = mpsc::channel::<QueuedCommand>(config.capacity);
        let dispatcher = Dispatcher::with_sink(registry.clone(), sink.clone());
        let stats = Arc::new(Stats::new(config.capacity));

        let consumer_dispatcher = dispatcher.clone();
        let consumer_stats = stats.clone();
        let consumer = tokio::spawn(async move {
            while let Some(cmd) = command_rx.recv().await {
                let reply = consumer_dispatcher.dispatch(cmd.envelope, cmd.cancel).await;
                consumer_stats.command_completed();
                if !reply.success {
                    consumer_stats.record_error(reply.error_message.clone());
                }
                let _ = cmd.reply_tx.send(reply);
            }
        });

        Self {
            command_tx,
            consumer,
            query_semaphore: Arc::new(Semaphore::new(config.query_concurrency)),
            registry,
            dispatcher,
            stats,
            admission_policy: config.admission_policy,
            sink,
        }
    }

    /// Route `envelope` to the command or query lane based on its op's
    /// registered [`OpClass`], and return the resulting [`Reply`].
    ///
    /// Unknown ops never touch either lane: the dispatcher already produces
    /// the right `UnknownOp` reply without ordering or concurrency concerns.
    pub async fn dispatch_envelope(&self, envelope: Envelope, cancel: CancellationToken) -> Reply {
        let Some(handler) = self.registry.get(&envelope.op_name) else {
            return self.dispatcher.dispatch(envelope, cancel).await;
        };

        match handler.class() {
            OpClass::Query => self.dispatch_query(envelope, cancel).await,
            OpClass::CommandVoid | OpClass::CommandWithResult => {
                self.dispatch_command(envelope, cancel).await
            }
        }
    }

    async fn dispatch_query(&self, envelope: Envelope, cancel: CancellationToken) -> Reply {
        let correlation_id = envelope.correlation_id.clone();
        let permit = match self.admission_policy {
            AdmissionPolicy::FailFast => self.query_semaphore.clone().try_acquire_owned().ok(),
            AdmissionPolicy::Block => self.query_semaphore.clone().acquire_owned().await.ok(),
        };
        let Some(_permit) = permit else {
            self.emit(BufferEvent::Overloaded {
                in_flight: self.stats.commands_in_flight(),
                capacity: self.query_semaphore.available_permits(),
            })
            .await;
            let kind = AcsErrorKind::Overloaded { capacity: self.stats.capacity() };
            return Reply::failure(&kind, correlation_id);
        };

        let reply = self.dispatcher.dispatch(envelope, cancel).await;
        self.stats.query_completed();
        reply
    }

    async fn dispatch_command(&self, envelope: Envelope, cancel: CancellationToken) -> Reply {
        let correlation_id = envelope.correlation_id.clone();
        let (reply_tx, reply_rx) = oneshot::channel();
        let queued = QueuedCommand { envelope, cancel, reply_tx };

        let admitted = match self.admission_policy {
            AdmissionPolicy::FailFast => self.command_tx.try_send(queued).is_ok(),
            AdmissionPolicy::Block => self.command_tx.send(queued).await.is_ok(),
        };

        if !admitted {
            self.emit(BufferEvent::Overloaded {
                in_flight: self.stats.commands_in_flight(),
                capacity: self.stats.capacity(),
            })
            .await;
            let kind = AcsErrorKind::Overloaded { capacity: self.stats.capacity() };
            return Reply::failure(&kind, correlation_id);
        }

        self.stats.command_admitted();
        self.emit(BufferEvent::Admitted {
            in_flight: self.stats.commands_in_flight(),
            capacity: self.stats.capacity(),
        })
        .await;

        match reply_rx.await {
            Ok(reply) => reply,
            Err(_) => Reply::failure(&AcsErrorKind::Cancelled, correlation_id),
        }
    }

    async fn emit(&self, event: BufferEvent) {
        emit_best_effort(self.sink.clone(), PolicyEvent::Buffer(event)).await;
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop accepting new commands and wait for in-flight ones to drain, up to
    /// `deadline`. Queries in flight are not tracked here; they complete or
    /// time out on their own caller-supplied deadline.
    pub async fn stop(self, deadline: std::time::Duration) {
        drop(self.command_tx);
        let _ = tokio::time::timeout(deadline, self.consumer).await;
    }
}
