//! Telemetry and observability for the resilience policies and the
//! supervisor/buffer/dispatch subsystems built on top of them.
//!
//! This module provides the event system that enables every subsystem to emit
//! structured telemetry. Events flow through `TelemetrySink` implementations
//! which can log, aggregate, or forward events to external systems.
//!
//! # Event Types
//!
//! - **Retry**: `RetryAttempt`, `RetryExhausted`
//! - **Circuit Breaker**: `CircuitOpened`, `CircuitClosed`, `CircuitHalfOpen`
//! - **Bulkhead**: `BulkheadAcquired`, `BulkheadRejected`
//! - **Timeout**: `TimeoutOccurred`
//! - **Supervisor**: `Spawned`, `SpawnFailed`, `HealthCheckFailed`, `Restarted`, `Stopped`, `Parked`
//! - **Buffer**: `Admitted`, `Overloaded`, `Cancelled`
//! - **Dispatch**: `UnknownOp`, `BadPayload`, `HandlerError`
//! - **All policies**: `RequestSuccess`, `RequestFailure`
//!
//! # Telemetry Sinks
//!
//! The `TelemetrySink` trait defines how events are consumed. It's implemented
//! as a `tower::Service<PolicyEvent>` for composability.

pub mod events;
pub mod sinks;

// Re-export core types for backward compatibility
pub use events::{
    event_to_json, BufferEvent, BulkheadEvent, CircuitBreakerEvent, DispatchEvent, PolicyEvent,
    RequestOutcome, RetryEvent, SupervisorEvent, TimeoutEvent,
};
pub use sinks::{
    emit_best_effort, ComposedSinkError, FallbackSink, LogSink, MemorySink, MulticastSink,
    NonBlockingSink, NullSink, StreamingSink, TelemetrySink,
};

#[cfg(test)]
mod tests {
    // Note: Tests have been moved to submodules (events.rs and sinks.rs)
}