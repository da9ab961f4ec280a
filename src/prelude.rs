//! Convenient re-exports for common acsd types.
pub use crate::{
    acs_error::AcsErrorKind,
    backoff::Backoff,
    buffer::{CommandBuffer, Stats, StatsSnapshot},
    circuit_breaker::{CircuitBreakerConfig, CircuitState},
    client::{Connector, TenantBreakerRegistry, TenantClient, TenantDirectory, Transport},
    config::{AdmissionPolicy, BreakerConfig, BufferConfig, Config, ConfigError, SupervisorConfig, WorkerConfig},
    jitter::Jitter,
    retry::{BuildError, RetryPolicy, RetryPolicyBuilder},
    rpc::{AcsGrpc, AdminGrpc, GrpcConnector, GrpcTransport, RouterGrpc},
    supervisor::{Supervisor, TenantRecord, TenantState, WorkerLauncher},
    telemetry::{
        BufferEvent, BulkheadEvent, CircuitBreakerEvent, DispatchEvent, FallbackSink, LogSink,
        MemorySink, MulticastSink, NullSink, PolicyEvent, RequestOutcome, RetryEvent,
        StreamingSink, SupervisorEvent, TelemetrySink, TimeoutEvent,
    },
    tenant::TenantId,
    timeout::{TimeoutError, TimeoutPolicy, MAX_TIMEOUT},
    wire::{Dispatcher, Envelope, Handler, HandlerRegistry, Reply},
    BulkheadPolicy, ResilienceError, StackError,
};
