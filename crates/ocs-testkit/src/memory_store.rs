//! In-memory [`OrderStore`] implementations.
//!
//! `MemoryOrderStore` keeps the stored payload as JSON, exactly like the
//! Postgres table, so decode and identifier-override paths are exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ocs_db::{decode_stored, encode_stored, OrderStore, StoreError};
use ocs_schemas::OrderRecord;
use serde_json::Value;

#[derive(Default)]
pub struct MemoryOrderStore {
    rows: Mutex<HashMap<String, Value>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with orders (overwriting on duplicate ids).
    pub fn with_orders(orders: &[OrderRecord]) -> Self {
        let store = Self::new();
        for o in orders {
            store.put_raw(&o.order_uid, serde_json::to_value(o).unwrap_or(Value::Null));
        }
        store
    }

    /// Store an arbitrary payload under `order_uid`, bypassing encoding.
    pub fn put_raw(&self, order_uid: &str, payload: Value) {
        self.lock().insert(order_uid.to_string(), payload);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, order: &OrderRecord) -> Result<(), StoreError> {
        let payload = encode_stored(order)?;
        let mut rows = self.lock();
        if rows.contains_key(&order.order_uid) {
            return Err(StoreError::Write {
                order_uid: order.order_uid.clone(),
                reason: "duplicate order_uid".to_string(),
            });
        }
        rows.insert(order.order_uid.clone(), payload);
        Ok(())
    }

    async fn upsert(&self, order: &OrderRecord) -> Result<(), StoreError> {
        let payload = encode_stored(order)?;
        self.lock().insert(order.order_uid.clone(), payload);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let rows: Vec<(String, Value)> = self
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        rows.into_iter()
            .map(|(uid, payload)| decode_stored(uid, payload))
            .collect()
    }

    async fn get_by_id(&self, order_uid: &str) -> Result<OrderRecord, StoreError> {
        let payload = self
            .lock()
            .get(order_uid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(order_uid.to_string()))?;
        decode_stored(order_uid.to_string(), payload)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.lock().len() as i64)
    }
}

// ---------------------------------------------------------------------------
// FailingOrderStore
// ---------------------------------------------------------------------------

/// Which operations a [`FailingOrderStore`] rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// `insert` / `upsert` fail with `Write`.
    Writes,
    /// `get_all` / `get_by_id` / `count` fail with `Read`.
    Reads,
}

/// Wraps a [`MemoryOrderStore`] and injects connectivity failures while armed.
pub struct FailingOrderStore {
    inner: MemoryOrderStore,
    mode: FailureMode,
    armed: AtomicBool,
    rejected: AtomicU64,
}

impl FailingOrderStore {
    pub fn new(inner: MemoryOrderStore, mode: FailureMode) -> Self {
        Self {
            inner,
            mode,
            armed: AtomicBool::new(true),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.armed.store(failing, Ordering::SeqCst);
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryOrderStore {
        &self.inner
    }

    fn fails(&self, mode: FailureMode) -> bool {
        let hit = self.mode == mode && self.armed.load(Ordering::SeqCst);
        if hit {
            self.rejected.fetch_add(1, Ordering::SeqCst);
        }
        hit
    }
}

#[async_trait]
impl OrderStore for FailingOrderStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn insert(&self, order: &OrderRecord) -> Result<(), StoreError> {
        if self.fails(FailureMode::Writes) {
            return Err(StoreError::Write {
                order_uid: order.order_uid.clone(),
                reason: "connection reset (injected)".to_string(),
            });
        }
        self.inner.insert(order).await
    }

    async fn upsert(&self, order: &OrderRecord) -> Result<(), StoreError> {
        if self.fails(FailureMode::Writes) {
            return Err(StoreError::Write {
                order_uid: order.order_uid.clone(),
                reason: "connection reset (injected)".to_string(),
            });
        }
        self.inner.upsert(order).await
    }

    async fn get_all(&self) -> Result<Vec<OrderRecord>, StoreError> {
        if self.fails(FailureMode::Reads) {
            return Err(StoreError::Read("connection refused (injected)".to_string()));
        }
        self.inner.get_all().await
    }

    async fn get_by_id(&self, order_uid: &str) -> Result<OrderRecord, StoreError> {
        if self.fails(FailureMode::Reads) {
            return Err(StoreError::Read("connection refused (injected)".to_string()));
        }
        self.inner.get_by_id(order_uid).await
    }

    async fn count(&self) -> Result<i64, StoreError> {
        if self.fails(FailureMode::Reads) {
            return Err(StoreError::Read("connection refused (injected)".to_string()));
        }
        self.inner.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_order;

    #[tokio::test]
    async fn insert_rejects_duplicate_and_upsert_overwrites() {
        let store = MemoryOrderStore::new();
        let mut o = sample_order("dup-1");
        store.insert(&o).await.unwrap();

        let err = store.insert(&o).await.unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));

        o.track_number = "CHANGED".to_string();
        store.upsert(&o).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_by_id("dup-1").await.unwrap().track_number, "CHANGED");
    }

    #[tokio::test]
    async fn failing_store_recovers_when_disarmed() {
        let store = FailingOrderStore::new(MemoryOrderStore::new(), FailureMode::Writes);
        let o = sample_order("f-1");
        assert!(store.insert(&o).await.is_err());
        store.set_failing(false);
        store.insert(&o).await.unwrap();
        assert_eq!(store.rejected(), 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
