//! The Tenant Client + Circuit Breaker (spec.md §4.3): resolves a tenant to
//! its worker via the Supervisor, reuses or reconnects a transport through
//! the [`ChannelPool`], and wraps each call in the teacher's
//! [`RetryPolicy`]/[`CircuitBreakerPolicy`] stack.
//!
//! Application-level failures (a worker answering `Reply{success: false}`)
//! are surfaced to the caller as `Ok(Reply)` and never touch retry or the
//! breaker; only transport-indistinguishable-from-unavailable failures do
//! (spec.md "Application `success=false` replies are not counted against
//! the breaker").

mod breaker_registry;
mod channel_pool;
mod transport;

pub use breaker_registry::TenantBreakerRegistry;
pub use channel_pool::ChannelPool;
pub use transport::{Connector, Transport};

use crate::acs_error::AcsErrorKind;
use crate::backoff::Backoff;
use crate::config::BreakerConfig;
use crate::error::ResilienceError;
use crate::jitter::Jitter;
use crate::retry::RetryPolicy;
use crate::supervisor::TenantRecord;
use crate::tenant::TenantId;
use crate::wire::{CancellationToken, Envelope, Reply};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Read-only view the client needs of the Supervisor's tenant registry.
/// [`crate::supervisor::Supervisor`] implements this directly.
pub trait TenantDirectory: Send + Sync + 'static {
    fn lookup(&self, tenant_id: &TenantId) -> Option<TenantRecord>;
}

/// Default retry attempts (spec.md §4.3: "up to `R` attempts (default 3)").
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

pub struct TenantClient<C: Connector> {
    directory: Arc<dyn TenantDirectory>,
    connector: C,
    pool: ChannelPool<C::Transport>,
    breakers: TenantBreakerRegistry,
    retry: RetryPolicy<AcsErrorKind>,
}

impl<C: Connector> TenantClient<C> {
    pub fn new(directory: Arc<dyn TenantDirectory>, connector: C, breaker_config: BreakerConfig) -> Self {
        Self::with_max_attempts(directory, connector, breaker_config, DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(
        directory: Arc<dyn TenantDirectory>,
        connector: C,
        breaker_config: BreakerConfig,
        max_attempts: usize,
    ) -> Self {
        let retry = RetryPolicy::builder()
            .max_attempts(max_attempts.max(1))
            .expect("max_attempts clamped to >= 1")
            .backoff(Backoff::linear(Duration::from_millis(100)))
            .with_jitter(Jitter::bounded(0.10))
            .should_retry(|e: &AcsErrorKind| e.is_retryable())
            .build();

        Self {
            directory,
            connector,
            pool: ChannelPool::new(),
            breakers: TenantBreakerRegistry::new(breaker_config),
            retry,
        }
    }

    /// Deliver `envelope` to `tenant_id`'s worker, bounding the sum of every
    /// attempt (connect, retries, backoff sleeps) by `deadline`.
    pub async fn call(
        &self,
        tenant_id: &TenantId,
        envelope: Envelope,
        cancel: CancellationToken,
        deadline: Duration,
    ) -> Result<Reply, AcsErrorKind> {
        let started = Instant::now();
        let breaker = self.breakers.get_or_create(tenant_id);
        let correlation_id = envelope.correlation_id.clone();

        let outcome = tokio::time::timeout(deadline, async {
            self.retry
                .execute(|| {
                    let envelope = envelope.clone();
                    let cancel = cancel.clone();
                    let breaker = breaker.clone();
                    let correlation_id = correlation_id.clone();
                    async move {
                        breaker
                            .execute(|| {
                                let envelope = envelope.clone();
                                let cancel = cancel.clone();
                                let correlation_id = correlation_id.clone();
                                async move {
                                    let remaining = deadline.saturating_sub(started.elapsed());
                                    match self.attempt(tenant_id, envelope, cancel, remaining).await {
                                        Ok(reply) => Ok(reply),
                                        Err(kind) if kind.counts_against_breaker() => {
                                            Err(ResilienceError::Inner(kind))
                                        }
                                        Err(kind) => Ok(Reply::failure(&kind, correlation_id)),
                                    }
                                }
                            })
                            .await
                    }
                })
                .await
        })
        .await;

        match outcome {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(ResilienceError::Inner(kind))) => Err(kind),
            Ok(Err(ResilienceError::CircuitOpen { failure_count, .. })) => {
                Err(AcsErrorKind::CircuitOpen {
                    tenant_id: tenant_id.to_string(),
                    consecutive_failures: failure_count,
                })
            }
            Ok(Err(ResilienceError::RetryExhausted { failures, .. })) => {
                Err(failures.into_iter().last().unwrap_or(AcsErrorKind::Internal {
                    message: "retry exhausted with no recorded failure".to_string(),
                }))
            }
            Ok(Err(ResilienceError::Timeout { .. } | ResilienceError::Bulkhead { .. })) => {
                unreachable!("tenant client never composes timeout or bulkhead policies")
            }
            Err(_elapsed) => Err(AcsErrorKind::DeadlineExceeded { elapsed: deadline }),
        }
    }

    async fn attempt(
        &self,
        tenant_id: &TenantId,
        envelope: Envelope,
        cancel: CancellationToken,
        remaining: Duration,
    ) -> Result<Reply, AcsErrorKind> {
        let record = self.directory.lookup(tenant_id).ok_or_else(|| AcsErrorKind::UnknownTenant {
            tenant_id: tenant_id.to_string(),
        })?;

        if record.state != crate::supervisor::TenantState::Ready {
            return Err(AcsErrorKind::TenantUnavailable {
                tenant_id: tenant_id.to_string(),
                state: record.state.to_string(),
            });
        }
        let Some(port) = record.listen_port else {
            return Err(AcsErrorKind::TenantUnavailable {
                tenant_id: tenant_id.to_string(),
                state: "Ready without an assigned port".to_string(),
            });
        };

        let transport = self
            .pool
            .get_or_connect(tenant_id, record.generation, || self.connector.connect(tenant_id, port))
            .await?;

        match tokio::time::timeout(remaining, transport.call(envelope, cancel)).await {
            Ok(result) => result,
            Err(_elapsed) => {
                self.pool.evict(tenant_id);
                Err(AcsErrorKind::DeadlineExceeded { elapsed: remaining })
            }
        }
    }

    /// Operator-triggered breaker reset for `tenant_id` (e.g. after a manual restart).
    pub fn reset_breaker(&self, tenant_id: &TenantId) {
        self.breakers.reset(tenant_id);
    }

    pub fn breaker_state(&self, tenant_id: &TenantId) -> Option<crate::circuit_breaker::CircuitState> {
        self.breakers.state(tenant_id)
    }
}
