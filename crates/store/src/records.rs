//! Tenant-scoped record storage.
//!
//! The trait is the persistence seam: the engine only ever talks to a
//! `RecordStore`. The in-memory implementation backs tests and standalone
//! use; a database-backed one would slot in behind the same trait.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError, RwLock};

use anyhow::anyhow;

use billkeep_core::TenantId;

/// Tenant-isolated key/value record store.
///
/// Unexpected storage failures surface as `anyhow::Error`; the engine maps
/// them to an internal error with no partial-state guarantee.
pub trait RecordStore<K, V>: Send + Sync {
    fn get(&self, tenant_id: TenantId, key: &K) -> anyhow::Result<Option<V>>;
    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> anyhow::Result<()>;
    fn remove(&self, tenant_id: TenantId, key: &K) -> anyhow::Result<Option<V>>;
    fn list(&self, tenant_id: TenantId) -> anyhow::Result<Vec<V>>;
}

/// In-memory record store.
#[derive(Debug)]
pub struct InMemoryRecords<K, V> {
    inner: RwLock<HashMap<(TenantId, K), V>>,
}

impl<K, V> InMemoryRecords<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryRecords<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RecordStore<K, V> for InMemoryRecords<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> anyhow::Result<Option<V>> {
        let map = self
            .inner
            .read()
            .map_err(|_| anyhow!("record store lock poisoned"))?;
        Ok(map.get(&(tenant_id, key.clone())).cloned())
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> anyhow::Result<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| anyhow!("record store lock poisoned"))?;
        map.insert((tenant_id, key), value);
        Ok(())
    }

    fn remove(&self, tenant_id: TenantId, key: &K) -> anyhow::Result<Option<V>> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| anyhow!("record store lock poisoned"))?;
        Ok(map.remove(&(tenant_id, key.clone())))
    }

    fn list(&self, tenant_id: TenantId) -> anyhow::Result<Vec<V>> {
        let map = self
            .inner
            .read()
            .map_err(|_| anyhow!("record store lock poisoned"))?;
        Ok(map
            .iter()
            .filter_map(|((t, _k), v)| (*t == tenant_id).then(|| v.clone()))
            .collect())
    }
}

/// Per-tenant monotonic sequence numbers.
///
/// Assigned once at insert and stored on the record; the `(date, seq)`
/// pair is the ledger sort key, so same-day records keep causal order.
/// One counter spans all record types of a tenant.
#[derive(Debug, Default)]
pub struct SeqAllocator {
    inner: Mutex<HashMap<TenantId, u64>>,
}

impl SeqAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, tenant_id: TenantId) -> u64 {
        let mut counters = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let counter = counters.entry(tenant_id).or_insert(0);
        *counter += 1;
        *counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_tenant_isolated() {
        let store: InMemoryRecords<u32, String> = InMemoryRecords::new();
        let a = TenantId::new();
        let b = TenantId::new();

        store.upsert(a, 1, "one".into()).unwrap();
        store.upsert(b, 1, "uno".into()).unwrap();

        assert_eq!(store.get(a, &1).unwrap().as_deref(), Some("one"));
        assert_eq!(store.get(b, &1).unwrap().as_deref(), Some("uno"));
        assert_eq!(store.list(a).unwrap().len(), 1);
    }

    #[test]
    fn remove_returns_the_record() {
        let store: InMemoryRecords<u32, String> = InMemoryRecords::new();
        let t = TenantId::new();
        store.upsert(t, 7, "x".into()).unwrap();
        assert_eq!(store.remove(t, &7).unwrap().as_deref(), Some("x"));
        assert_eq!(store.get(t, &7).unwrap(), None);
    }

    #[test]
    fn sequences_are_monotonic_per_tenant() {
        let seq = SeqAllocator::new();
        let a = TenantId::new();
        let b = TenantId::new();
        assert_eq!(seq.next(a), 1);
        assert_eq!(seq.next(a), 2);
        assert_eq!(seq.next(b), 1);
        assert_eq!(seq.next(a), 3);
    }
}
