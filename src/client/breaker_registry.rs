//! Per-tenant circuit breaker instances, lazily created (spec.md §4.3:
//! `CircuitBreakerRegistry::get_or_create(tenant_id)`).

use crate::circuit_breaker::{CircuitBreakerPolicy, CircuitState};
use crate::config::BreakerConfig;
use crate::tenant::TenantId;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct TenantBreakerRegistry {
    config: BreakerConfig,
    breakers: Mutex<HashMap<TenantId, CircuitBreakerPolicy>>,
}

impl TenantBreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self { config, breakers: Mutex::new(HashMap::new()) }
    }

    pub fn get_or_create(&self, tenant_id: &TenantId) -> CircuitBreakerPolicy {
        self.breakers
            .lock()
            .expect("breaker registry lock poisoned")
            .entry(tenant_id.clone())
            .or_insert_with(|| {
                CircuitBreakerPolicy::new(self.config.failure_threshold, self.config.open_timeout)
            })
            .clone()
    }

    /// Operator-triggered reset (e.g. after a manual restart).
    pub fn reset(&self, tenant_id: &TenantId) {
        if let Some(breaker) = self.breakers.lock().expect("breaker registry lock poisoned").get(tenant_id) {
            breaker.reset();
        }
    }

    pub fn state(&self, tenant_id: &TenantId) -> Option<CircuitState> {
        self.breakers
            .lock()
            .expect("breaker registry lock poisoned")
            .get(tenant_id)
            .map(|b| b.current_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn same_tenant_reuses_the_same_breaker() {
        let registry = TenantBreakerRegistry::new(BreakerConfig {
            failure_threshold: 3,
            open_timeout: Duration::from_secs(1),
        });
        let tenant_id = TenantId::new("t1");

        let first = registry.get_or_create(&tenant_id);
        first.reset();
        let second = registry.get_or_create(&tenant_id);

        // Cloned policies share the same underlying atomics.
        assert_eq!(second.current_state(), CircuitState::Closed);
        assert!(registry.state(&tenant_id).is_some());
    }

    #[test]
    fn distinct_tenants_get_distinct_breakers() {
        let registry = TenantBreakerRegistry::new(BreakerConfig {
            failure_threshold: 1,
            open_timeout: Duration::from_secs(60),
        });
        let a = registry.get_or_create(&TenantId::new("a"));
        let b = registry.get_or_create(&TenantId::new("b"));
        assert_eq!(a.current_state(), CircuitState::Closed);
        assert_eq!(b.current_state(), CircuitState::Closed);
    }
}
