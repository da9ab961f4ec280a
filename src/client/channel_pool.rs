//! Per-tenant transport cache, reconnecting whenever the Supervisor's
//! `generation` for a tenant advances (spec.md §3 Channel Pool, I-C1, I-C2):
//! a restarted worker gets a new generation, and any pooled channel tagged
//! with the old one is discarded rather than reused against a dead process.

use crate::tenant::TenantId;
use std::collections::HashMap;
use std::sync::Mutex;

struct PooledEntry<T> {
    generation: u64,
    transport: T,
}

pub struct ChannelPool<T> {
    entries: Mutex<HashMap<TenantId, PooledEntry<T>>>,
}

impl<T: Clone> ChannelPool<T> {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    /// Return the pooled transport for `tenant_id` if its generation matches,
    /// otherwise run `connect` and cache the result under the new generation.
    pub async fn get_or_connect<F, Fut, E>(
        &self,
        tenant_id: &TenantId,
        generation: u64,
        connect: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if let Some(transport) = self.fresh(tenant_id, generation) {
            return Ok(transport);
        }

        let transport = connect().await?;
        self.entries
            .lock()
            .expect("channel pool lock poisoned")
            .insert(tenant_id.clone(), PooledEntry { generation, transport: transport.clone() });
        Ok(transport)
    }

    fn fresh(&self, tenant_id: &TenantId, generation: u64) -> Option<T> {
        let entries = self.entries.lock().expect("channel pool lock poisoned");
        let entry = entries.get(tenant_id)?;
        (entry.generation == generation).then(|| entry.transport.clone())
    }

    /// Drop the cached entry for `tenant_id`, forcing the next call to reconnect.
    pub fn evict(&self, tenant_id: &TenantId) {
        self.entries.lock().expect("channel pool lock poisoned").remove(tenant_id);
    }
}

impl<T: Clone> Default for ChannelPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn reuses_transport_while_generation_is_unchanged() {
        let pool: ChannelPool<u32> = ChannelPool::new();
        let tenant_id = TenantId::new("t1");
        let connects = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let connects = connects.clone();
            let transport = pool
                .get_or_connect(&tenant_id, 1, || async move {
                    connects.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::convert::Infallible>(42)
                })
                .await
                .unwrap();
            assert_eq!(transport, 42);
        }
        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn generation_bump_forces_reconnect() {
        let pool: ChannelPool<u32> = ChannelPool::new();
        let tenant_id = TenantId::new("t1");

        let first = pool.get_or_connect(&tenant_id, 1, || async { Ok::<_, std::convert::Infallible>(1) }).await.unwrap();
        let second = pool.get_or_connect(&tenant_id, 2, || async { Ok::<_, std::convert::Infallible>(2) }).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn evict_forces_reconnect_on_next_call() {
        let pool: ChannelPool<u32> = ChannelPool::new();
        let tenant_id = TenantId::new("t1");
        let connects = Arc::new(AtomicUsize::new(0));

        let mk = |connects: Arc<AtomicUsize>| async move {
            connects.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::convert::Infallible>(7)
        };
        pool.get_or_connect(&tenant_id, 1, || mk(connects.clone())).await.unwrap();
        pool.evict(&tenant_id);
        pool.get_or_connect(&tenant_id, 1, || mk(connects.clone())).await.unwrap();
        assert_eq!(connects.load(Ordering::SeqCst), 2);
    }
}
