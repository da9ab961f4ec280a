#![forbid(unsafe_code)]

//! # acsd
//!
//! A multi-tenant access-control serving platform. A stateless router dispatches
//! requests to per-tenant worker processes over gRPC; a supervisor owns the
//! lifecycle of those processes, a command buffer preserves per-tenant write
//! ordering while letting reads run in parallel, and a tenant client wraps every
//! outbound call in retry/circuit-breaker resilience.
//!
//! ## Layers
//!
//! - [`supervisor`] — spawns, health-checks, and restarts tenant worker processes
//! - [`buffer`] — per-tenant FIFO command lane plus a bounded parallel query lane
//! - [`client`] — circuit-broken, retrying RPC client to a tenant's worker
//! - [`wire`] — the envelope format and op-name dispatch table workers use
//! - [`rpc`] — the gRPC transport tying client and worker together
//!
//! These sit on top of the resilience primitives this crate started from: retry
//! policies, circuit breakers, bulkheads, and timeouts, composable via
//! [`ResilienceStackBuilder`].
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use acsd::{
//!     Backoff, BulkheadPolicy, CircuitBreakerPolicy, Jitter, ResilienceError, ResilienceStack,
//!     ResilienceStackBuilder, RetryPolicy, TimeoutPolicy,
//! };
//!
//! async fn flaky_operation(
//!     attempts: Arc<AtomicUsize>,
//! ) -> Result<(), ResilienceError<std::io::Error>> {
//!     let n = attempts.fetch_add(1, Ordering::Relaxed);
//!     if n < 2 {
//!         Err(ResilienceError::Inner(std::io::Error::new(
//!             std::io::ErrorKind::Other,
//!             "transient failure",
//!         )))
//!     } else {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ResilienceError<std::io::Error>> {
//!     let attempts = Arc::new(AtomicUsize::new(0));
//!
//!     // Configure individual policies.
//!     let retry = RetryPolicy::builder()
//!         .max_attempts(3)
//!         .expect("max_attempts > 0")
//!         .backoff(Backoff::exponential(Duration::from_millis(200)))
//!         .with_jitter(Jitter::full())
//!         .build();
//!     let _timeout = TimeoutPolicy::new(Duration::from_secs(2)).expect("valid timeout");
//!     let _bulkhead = BulkheadPolicy::new(32);
//!     let _circuit_breaker = CircuitBreakerPolicy::new(5, Duration::from_secs(30));
//!
//!     // Compose via the stack builder (Retry → CircuitBreaker → Bulkhead → Timeout).
//!     let stack: ResilienceStack<std::io::Error> = ResilienceStackBuilder::new()
//!         .retry(retry)
//!         .circuit_breaker(5, Duration::from_secs(30))
//!         .bulkhead(32)
//!         .timeout(Duration::from_secs(2))
//!         .expect("valid timeout config")
//!         .build()
//!         .expect("valid stack");
//!
//!     stack.execute(|| flaky_operation(attempts.clone())).await?;
//!     Ok(())
//! }
//! ```

mod acs_error;
mod backoff;
mod bulkhead;
pub mod buffer;
mod circuit_breaker;
pub mod client;
pub mod config;
mod error;
mod jitter;
mod retry;
pub mod rpc;
mod sleeper;
mod stack;
mod tenant;
mod timeout;
pub mod wire;

pub mod supervisor;
pub mod telemetry;

// Re-exports
pub use acs_error::AcsErrorKind;
pub use backoff::Backoff;
pub use bulkhead::BulkheadPolicy;
pub use circuit_breaker::{CircuitBreakerConfig, CircuitBreakerPolicy, CircuitState};
pub use config::{AdmissionPolicy, BreakerConfig, BufferConfig, Config, ConfigError, SupervisorConfig, WorkerConfig};
pub use error::ResilienceError;
pub use jitter::Jitter;
pub use retry::{BuildError, RetryPolicy, RetryPolicyBuilder};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use stack::{ResilienceStack, ResilienceStackBuilder, StackError};
pub use tenant::TenantId;
pub use timeout::{TimeoutError, TimeoutPolicy, MAX_TIMEOUT};

pub mod prelude;
