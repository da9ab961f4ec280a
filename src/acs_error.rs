//! The wire-crossing error taxonomy (spec.md §7).
//!
//! `ResilienceError` (see [`crate::error`]) is the generic policy-composition
//! wrapper used internally by the client's retry/breaker/timeout stack.
//! `AcsErrorKind` is the closed set of kinds that may ever reach a caller or
//! cross the RPC boundary — every internal error is classified into one of
//! these before it leaves the process that produced it.

use std::time::Duration;

#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum AcsErrorKind {
    #[error("no live record for tenant {tenant_id}")]
    UnknownTenant { tenant_id: String },

    #[error("tenant {tenant_id} record exists but is not ready (state: {state})")]
    TenantUnavailable { tenant_id: String, state: String },

    #[error("worker for tenant {tenant_id} could not be started: {reason}")]
    SpawnFailed { tenant_id: String, reason: String },

    #[error("circuit open for tenant {tenant_id} ({consecutive_failures} consecutive failures)")]
    CircuitOpen { tenant_id: String, consecutive_failures: usize },

    #[error("command buffer full (capacity {capacity})")]
    Overloaded { capacity: usize },

    #[error("deadline exceeded after {elapsed:?}")]
    DeadlineExceeded { elapsed: Duration },

    #[error("operation cancelled")]
    Cancelled,

    #[error("no handler registered for op {op_name:?}")]
    UnknownOp { op_name: String },

    #[error("payload for op {op_name:?} failed to decode: {reason}")]
    BadPayload { op_name: String, reason: String },

    #[error("handler error: {message}")]
    HandlerError { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl AcsErrorKind {
    /// Whether the Tenant Client should retry the call that produced this error.
    ///
    /// Only transport-indistinguishable-from-`Unavailable` failures are
    /// retried (spec.md §4.3, §7): `TenantUnavailable` and generic transport
    /// failures folded into `Internal` by the transport layer never count,
    /// neither does any already-classified application error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TenantUnavailable { .. })
    }

    /// Whether this error should count as a failure against the circuit breaker.
    ///
    /// Application-level errors (`HandlerError`, `BadPayload`, `UnknownOp`)
    /// mean the worker is alive and answering; only unreachability counts.
    pub fn counts_against_breaker(&self) -> bool {
        matches!(self, Self::TenantUnavailable { .. } | Self::DeadlineExceeded { .. })
    }
}

/// Strip anything resembling a secret from a handler's error message before
/// it crosses the wire (spec.md §7: "minus any secret patterns").
pub fn redact(message: &str) -> String {
    crate::wire::redact::redact(message)
}
