//! Storage capability used by warm-up, ingestion and the CLI.
//!
//! Callers hold `Arc<dyn OrderStore>` so the Postgres backend can be swapped
//! for an in-memory one (see `ocs-testkit`) without touching the runtime.

use async_trait::async_trait;
use ocs_schemas::OrderRecord;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The order could not be encoded into its stored payload.
    #[error("serialize order {order_uid} failed: {source}")]
    Serialization {
        order_uid: String,
        #[source]
        source: serde_json::Error,
    },
    /// Backend rejected the write (constraint violation, connectivity loss).
    #[error("write order {order_uid} failed: {reason}")]
    Write { order_uid: String, reason: String },
    #[error("read failed: {0}")]
    Read(String),
    #[error("order not found: {0}")]
    NotFound(String),
    /// Stored payload no longer parses as an order.
    #[error("stored payload for order {order_uid} is not a valid order: {source}")]
    Decode {
        order_uid: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

// ---------------------------------------------------------------------------
// OrderStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Human-readable backend name for logs (e.g. `"postgres"`).
    fn name(&self) -> &'static str;

    /// Write one row. A second row for an existing `order_uid` is rejected
    /// with [`StoreError::Write`].
    async fn insert(&self, order: &OrderRecord) -> Result<(), StoreError>;

    /// Write one row, replacing the payload if `order_uid` already exists.
    async fn upsert(&self, order: &OrderRecord) -> Result<(), StoreError>;

    /// Every stored order, in no particular order. The stored identifier
    /// column overrides whatever `order_uid` the payload carries.
    async fn get_all(&self) -> Result<Vec<OrderRecord>, StoreError>;

    async fn get_by_id(&self, order_uid: &str) -> Result<OrderRecord, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;
}

/// Decode a stored payload, forcing the identifier to the key it was stored under.
pub fn decode_stored(order_uid: String, payload: serde_json::Value) -> Result<OrderRecord, StoreError> {
    match serde_json::from_value::<OrderRecord>(payload) {
        Ok(mut order) => {
            order.order_uid = order_uid;
            Ok(order)
        }
        Err(source) => Err(StoreError::Decode { order_uid, source }),
    }
}

/// Encode an order into its stored payload.
pub fn encode_stored(order: &OrderRecord) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(order).map_err(|source| StoreError::Serialization {
        order_uid: order.order_uid.clone(),
        source,
    })
}
