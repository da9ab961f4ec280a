//! The Tenant Process Supervisor (spec.md §4.1): owns the lifecycle of one
//! worker process per tenant — allocation, spawn, health, restart, teardown,
//! port registry.
//!
//! Registry mutations are serialized per tenant by a `tokio::sync::Mutex`
//! held for the duration of a spawn sequence; concurrent `start()` callers
//! for the same tenant queue on that lock and, once it is free, observe the
//! record the first caller produced rather than spawning again. `stop()`
//! signals a per-tenant [`CancellationToken`] so a `start()` in progress can
//! be interrupted and land directly in `Stopped` (spec.md "Concurrency
//! guarantees").

mod launcher;
mod port_pool;
mod process_launcher;
mod record;

pub use launcher::WorkerLauncher;
pub use port_pool::PortPool;
pub use process_launcher::ProcessLauncher;
pub use record::{TenantRecord, TenantState};

use crate::acs_error::AcsErrorKind;
use crate::backoff::Backoff;
use crate::config::SupervisorConfig;
use crate::tenant::TenantId;
use crate::telemetry::{emit_best_effort, NullSink, PolicyEvent, SupervisorEvent};
use crate::wire::CancellationToken;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;

struct TenantEntry<H> {
    record: Mutex<TenantRecord>,
    spawn_lock: AsyncMutex<()>,
    cancel: Mutex<CancellationToken>,
    child: AsyncMutex<Option<H>>,
    restart_window_started_at: Mutex<Option<Instant>>,
}

impl<H> TenantEntry<H> {
    fn new(tenant_id: TenantId) -> Self {
        Self {
            record: Mutex::new(TenantRecord::new(tenant_id)),
            spawn_lock: AsyncMutex::new(()),
            cancel: Mutex::new(CancellationToken::new()),
            child: AsyncMutex::new(None),
            restart_window_started_at: Mutex::new(None),
        }
    }
}

/// Owns every tenant's [`TenantRecord`] and port reservation.
///
/// Generic over [`WorkerLauncher`] and, like [`crate::timeout::TimeoutLayer`],
/// over the telemetry sink, defaulting to [`NullSink`].
pub struct Supervisor<L: WorkerLauncher, Sink = NullSink> {
    launcher: Arc<L>,
    config: SupervisorConfig,
    entries: Mutex<HashMap<TenantId, Arc<TenantEntry<L::Handle>>>>,
    ports: Mutex<PortPool>,
    sink: Sink,
}

impl<L: WorkerLauncher> Supervisor<L, NullSink> {
    pub fn new(launcher: L, config: SupervisorConfig) -> Self {
        Self::with_sink(launcher, config, NullSink)
    }
}

impl<L, Sink> Supervisor<L, Sink>
where
    L: WorkerLauncher,
    Sink: tower::Service<PolicyEvent, Response = ()> + Clone + Send + 'static,
    Sink::Error: std::error::Error + Send + 'static,
    Sink::Future: Send + 'static,
{
    pub fn with_sink(launcher: L, config: SupervisorConfig, sink: Sink) -> Self {
        let ports = Mutex::new(PortPool::new(config.port_range.clone()));
        Self { launcher: Arc::new(launcher), config, entries: Mutex::new(HashMap::new()), ports, sink }
    }

    fn entry(&self, tenant_id: &TenantId) -> Arc<TenantEntry<L::Handle>> {
        self.entries
            .lock()
            .expect("supervisor registry lock poisoned")
            .entry(tenant_id.clone())
            .or_insert_with(|| Arc::new(TenantEntry::new(tenant_id.clone())))
            .clone()
    }

    /// Start (or return the already-`Ready` record for) `tenant_id`.
    ///
    /// Concurrent callers for the same tenant collapse onto the same spawn:
    /// the `spawn_lock` ensures only the first caller through actually runs
    /// the spawn sequence; the rest observe its result.
    pub async fn start(&self, tenant_id: &TenantId) -> Result<TenantRecord, AcsErrorKind> {
        let entry = self.entry(tenant_id);
        let _guard = entry.spawn_lock.lock().await;

        {
            let record = entry.record.lock().expect("tenant record lock poisoned");
            if record.state == TenantState::Ready {
                return Ok(record.clone());
            }
        }

        let cancel = {
            let mut cancel = entry.cancel.lock().expect("tenant cancel lock poisoned");
            *cancel = CancellationToken::new();
            cancel.clone()
        };

        let port = {
            let mut ports = self.ports.lock().expect("port pool lock poisoned");
            ports.allocate().ok_or_else(|| AcsErrorKind::SpawnFailed {
                tenant_id: tenant_id.to_string(),
                reason: "no free ports in configured range".to_string(),
            })?
        };

        let generation = {
            let mut record = entry.record.lock().expect("tenant record lock poisoned");
            record.generation += 1;
            record.state = TenantState::Starting;
            record.listen_port = Some(port);
            record.generation
        };

        match self.run_spawn_sequence(tenant_id, port, &cancel).await {
            Ok(handle) => {
                *entry.child.lock().await = Some(handle);
                let record = {
                    let mut record = entry.record.lock().expect("tenant record lock poisoned");
                    record.state = TenantState::Ready;
                    record.started_at = Some(Instant::now());
                    record.last_health_ok_at = Some(Instant::now());
                    record.clone()
                };
                self.emit(SupervisorEvent::Spawned {
                    tenant_id: tenant_id.to_string(),
                    generation,
                    port,
                })
                .await;
                self.spawn_health_loop(tenant_id.clone(), entry.clone(), generation);
                Ok(record)
            }
            Err(AcsErrorKind::Cancelled) => {
                let mut ports = self.ports.lock().expect("port pool lock poisoned");
                ports.release(port);
                drop(ports);
                let mut record = entry.record.lock().expect("tenant record lock poisoned");
                record.state = TenantState::Stopped;
                record.listen_port = None;
                Err(AcsErrorKind::Cancelled)
            }
            Err(err) => {
                let mut ports = self.ports.lock().expect("port pool lock poisoned");
                ports.release(port);
                drop(ports);
                let mut record = entry.record.lock().expect("tenant record lock poisoned");
                record.state = TenantState::Failed;
                record.listen_port = None;
                self.emit(SupervisorEvent::SpawnFailed {
                    tenant_id: tenant_id.to_string(),
                    reason: err.to_string(),
                })
                .await;
                Err(err)
            }
        }
    }

    async fn run_spawn_sequence(
        &self,
        tenant_id: &TenantId,
        port: u16,
        cancel: &CancellationToken,
    ) -> Result<L::Handle, AcsErrorKind> {
        let handle = self.launcher.spawn(tenant_id, port).await?;

        let backoff = Backoff::exponential(Duration::from_millis(50)).with_max(Duration::from_secs(2));
        let poll = async {
            let mut attempt = 0usize;
            loop {
                if self.launcher.health_check(tenant_id, port).await {
                    return Ok(());
                }
                attempt += 1;
                tokio::time::sleep(backoff.delay(attempt)).await;
            }
        };

        let outcome = tokio::select! {
            result = tokio::time::timeout(self.config.spawn_timeout, poll) => {
                match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(())) => unreachable!("poll future never returns Err"),
                    Err(_elapsed) => Err(AcsErrorKind::SpawnFailed {
                        tenant_id: tenant_id.to_string(),
                        reason: "health check did not succeed within spawn_timeout".to_string(),
                    }),
                }
            }
            _ = cancel.cancelled() => Err(AcsErrorKind::Cancelled),
        };

        match outcome {
            Ok(()) => Ok(handle),
            Err(err) => {
                self.launcher.terminate(handle, self.config.grace_period).await;
                Err(err)
            }
        }
    }

    /// Stop (idempotently) `tenant_id`. Interrupts an in-progress `start()`.
    pub async fn stop(&self, tenant_id: &TenantId) {
        let entry = self.entry(tenant_id);
        entry.cancel.lock().expect("tenant cancel lock poisoned").cancel();

        let _guard = entry.spawn_lock.lock().await;

        let already_stopped = {
            let record = entry.record.lock().expect("tenant record lock poisoned");
            record.state == TenantState::Stopped
        };
        if already_stopped {
            return;
        }

        {
            let mut record = entry.record.lock().expect("tenant record lock poisoned");
            record.state = TenantState::Stopping;
        }

        if let Some(handle) = entry.child.lock().await.take() {
            self.launcher.terminate(handle, self.config.grace_period).await;
        }

        let port = {
            let mut record = entry.record.lock().expect("tenant record lock poisoned");
            record.state = TenantState::Stopped;
            record.listen_port.take()
        };
        if let Some(port) = port {
            self.ports.lock().expect("port pool lock poisoned").release(port);
        }

        self.emit(SupervisorEvent::Stopped { tenant_id: tenant_id.to_string() }).await;
    }

    pub fn lookup(&self, tenant_id: &TenantId) -> Option<TenantRecord> {
        let entries = self.entries.lock().expect("supervisor registry lock poisoned");
        entries.get(tenant_id).map(|e| e.record.lock().expect("tenant record lock poisoned").clone())
    }

    pub fn list(&self) -> Vec<TenantRecord> {
        let entries = self.entries.lock().expect("supervisor registry lock poisoned");
        entries.values().map(|e| e.record.lock().expect("tenant record lock poisoned").clone()).collect()
    }

    /// Background liveness probe (spec.md "Liveness"): on `k` consecutive
    /// failures, restart; restarts beyond `max_restarts` within
    /// `restart_window` park the tenant in `Failed`.
    fn spawn_health_loop(&self, tenant_id: TenantId, entry: Arc<TenantEntry<L::Handle>>, generation: u64) {
        let launcher = self.launcher.clone();
        let interval = self.config.health_interval;
        let failures_to_restart = self.config.health_failures_to_restart;
        let restart_window = self.config.restart_window;
        let max_restarts = self.config.max_restarts;
        let grace_period = self.config.grace_period;
        let spawn_timeout = self.config.spawn_timeout;
        let sink = self.sink.clone();

        tokio::spawn(async move {
            let mut consecutive_failures = 0u32;
            loop {
                tokio::time::sleep(interval).await;

                let still_current = {
                    let record = entry.record.lock().expect("tenant record lock poisoned");
                    record.generation == generation && record.state != TenantState::Stopped
                };
                if !still_current {
                    return;
                }

                let port = {
                    let record = entry.record.lock().expect("tenant record lock poisoned");
                    match record.listen_port {
                        Some(p) => p,
                        None => return,
                    }
                };

                if launcher.health_check(&tenant_id, port).await {
                    consecutive_failures = 0;
                    let mut record = entry.record.lock().expect("tenant record lock poisoned");
                    if record.state == TenantState::Unhealthy {
                        record.state = TenantState::Ready;
                    }
                    record.last_health_ok_at = Some(Instant::now());
                    continue;
                }

                consecutive_failures += 1;
                emit_best_effort(
                    sink.clone(),
                    PolicyEvent::Supervisor(SupervisorEvent::HealthCheckFailed {
                        tenant_id: tenant_id.to_string(),
                        consecutive_failures,
                    }),
                )
                .await;

                if consecutive_failures < failures_to_restart {
                    let mut record = entry.record.lock().expect("tenant record lock poisoned");
                    record.state = TenantState::Unhealthy;
                    continue;
                }

                let window_expired = {
                    let mut started = entry
                        .restart_window_started_at
                        .lock()
                        .expect("restart window lock poisoned");
                    match *started {
                        Some(t) if t.elapsed() < restart_window => false,
                        _ => {
                            *started = Some(Instant::now());
                            true
                        }
                    }
                };

                if window_expired {
                    entry.record.lock().expect("tenant record lock poisoned").restart_count = 0;
                }

                let restart_count = {
                    let record = entry.record.lock().expect("tenant record lock poisoned");
                    record.restart_count
                };
                if restart_count >= max_restarts {
                    let mut record = entry.record.lock().expect("tenant record lock poisoned");
                    record.state = TenantState::Failed;
                    emit_best_effort(
                        sink.clone(),
                        PolicyEvent::Supervisor(SupervisorEvent::Parked {
                            tenant_id: tenant_id.to_string(),
                            restart_count,
                        }),
                    )
                    .await;
                    return;
                }

                if let Some(handle) = entry.child.lock().await.take() {
                    launcher.terminate(handle, grace_period).await;
                }

                let new_generation = {
                    let mut record = entry.record.lock().expect("tenant record lock poisoned");
                    record.generation += 1;
                    record.restart_count += 1;
                    record.state = TenantState::Starting;
                    record.generation
                };

                let cancel = entry.cancel.lock().expect("tenant cancel lock poisoned").clone();
                let backoff = Backoff::exponential(Duration::from_millis(50)).with_max(Duration::from_secs(2));
                let poll = async {
                    let mut attempt = 0usize;
                    loop {
                        if launcher.health_check(&tenant_id, port).await {
                            return true;
                        }
                        attempt += 1;
                        tokio::time::sleep(backoff.delay(attempt)).await;
                    }
                };

                match launcher.spawn(&tenant_id, port).await {
                    Ok(new_handle) => {
                        let ok = tokio::select! {
                            res = tokio::time::timeout(spawn_timeout, poll) => matches!(res, Ok(true)),
                            _ = cancel.cancelled() => false,
                        };
                        if ok {
                            *entry.child.lock().await = Some(new_handle);
                            consecutive_failures = 0;
                            let mut record = entry.record.lock().expect("tenant record lock poisoned");
                            record.state = TenantState::Ready;
                            record.last_health_ok_at = Some(Instant::now());
                            emit_best_effort(
                                sink.clone(),
                                PolicyEvent::Supervisor(SupervisorEvent::Restarted {
                                    tenant_id: tenant_id.to_string(),
                                    generation: new_generation,
                                }),
                            )
                            .await;
                        } else {
                            launcher.terminate(new_handle, grace_period).await;
                            let mut record = entry.record.lock().expect("tenant record lock poisoned");
                            record.state = TenantState::Failed;
                        }
                    }
                    Err(_) => {
                        let mut record = entry.record.lock().expect("tenant record lock poisoned");
                        record.state = TenantState::Failed;
                    }
                }
            }
        });
    }

    async fn emit(&self, event: SupervisorEvent) {
        emit_best_effort(self.sink.clone(), PolicyEvent::Supervisor(event)).await;
    }
}

impl<L, Sink> crate::client::TenantDirectory for Supervisor<L, Sink>
where
    L: WorkerLauncher,
    Sink: tower::Service<PolicyEvent, Response = ()> + Clone + Send + 'static,
    Sink::Error: std::error::Error + Send + 'static,
    Sink::Future: Send + 'static,
{
    fn lookup(&self, tenant_id: &TenantId) -> Option<TenantRecord> {
        Supervisor::lookup(self, tenant_id)
    }
}
