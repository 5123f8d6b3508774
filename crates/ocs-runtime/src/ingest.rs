//! Ingestion: decode, persist, render, cache.
//!
//! Per message, strictly in that order. A message that fails to decode is
//! dropped before any store or cache effect. A message whose persistence
//! fails is never cached, so the cache only ever holds orders the store has
//! accepted. A render or cache failure after persistence leaves the row in
//! place; there is no rollback. Every failure is logged and counted; none
//! stops the loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ocs_config::DuplicatePolicy;
use ocs_db::{OrderStore, StoreError};
use ocs_schemas::{ModelError, OrderRecord};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{CacheError, OrderCache};
use crate::feed::OrderFeed;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("message dropped: {0}")]
    Decode(#[source] ModelError),
    #[error("persist failed: {0}")]
    Persist(#[source] StoreError),
    #[error("render failed for persisted order {order_uid}: {source}")]
    Render {
        order_uid: String,
        #[source]
        source: ModelError,
    },
    #[error("cache insert failed for persisted order: {0}")]
    Cache(#[source] CacheError),
}

impl IngestError {
    /// Stable short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Persist(_) => "persist",
            Self::Render { .. } => "render",
            Self::Cache(_) => "cache",
        }
    }

    /// True when the order reached the store despite the error.
    pub fn persisted(&self) -> bool {
        matches!(self, Self::Render { .. } | Self::Cache(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub order_uid: String,
    /// A live cache entry for this id was overwritten.
    pub replaced: bool,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct IngestMetrics {
    pub received: AtomicU64,
    pub persisted: AtomicU64,
    pub cached: AtomicU64,
    pub decode_failures: AtomicU64,
    pub persist_failures: AtomicU64,
    pub cache_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestMetricsSnapshot {
    pub received: u64,
    pub persisted: u64,
    pub cached: u64,
    pub decode_failures: u64,
    pub persist_failures: u64,
    pub cache_failures: u64,
}

impl IngestMetrics {
    pub fn snapshot(&self) -> IngestMetricsSnapshot {
        IngestMetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            cached: self.cached.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            cache_failures: self.cache_failures.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Ingestor
// ---------------------------------------------------------------------------

pub struct OrderIngestor {
    store: Arc<dyn OrderStore>,
    cache: Arc<OrderCache>,
    policy: DuplicatePolicy,
    metrics: Arc<IngestMetrics>,
}

impl OrderIngestor {
    pub fn new(store: Arc<dyn OrderStore>, cache: Arc<OrderCache>, policy: DuplicatePolicy) -> Self {
        Self {
            store,
            cache,
            policy,
            metrics: Arc::new(IngestMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<IngestMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Handle one raw payload end to end.
    pub async fn process_message(&self, payload: &[u8]) -> Result<IngestOutcome, IngestError> {
        IngestMetrics::bump(&self.metrics.received);

        let order = OrderRecord::from_json_validated(payload).map_err(|e| {
            IngestMetrics::bump(&self.metrics.decode_failures);
            IngestError::Decode(e)
        })?;

        let stored = match self.policy {
            DuplicatePolicy::Overwrite => self.store.upsert(&order).await,
            DuplicatePolicy::Reject => self.store.insert(&order).await,
        };
        stored.map_err(|e| {
            IngestMetrics::bump(&self.metrics.persist_failures);
            IngestError::Persist(e)
        })?;
        IngestMetrics::bump(&self.metrics.persisted);

        let rendered = order.render().map_err(|source| {
            IngestMetrics::bump(&self.metrics.cache_failures);
            IngestError::Render {
                order_uid: order.order_uid.clone(),
                source,
            }
        })?;

        let replaced = match self.policy {
            DuplicatePolicy::Overwrite => self.cache.set(&order.order_uid, rendered),
            DuplicatePolicy::Reject => {
                self.cache.add(&order.order_uid, rendered).map_err(|e| {
                    IngestMetrics::bump(&self.metrics.cache_failures);
                    IngestError::Cache(e)
                })?;
                false
            }
        };
        IngestMetrics::bump(&self.metrics.cached);

        Ok(IngestOutcome {
            order_uid: order.order_uid,
            replaced,
        })
    }

    /// Consume `feed` until it closes or `shutdown` becomes true.
    ///
    /// Messages are handled one at a time; a message already being processed
    /// finishes before shutdown is observed.
    pub async fn run<F: OrderFeed>(self, mut feed: F, mut shutdown: watch::Receiver<bool>) -> Arc<IngestMetrics> {
        let source = feed.describe();
        info!(source = %source, policy = ?self.policy, store = self.store.name(), "ingestion started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let payload = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                next = feed.next_payload() => match next {
                    Some(p) => p,
                    None => {
                        info!(source = %source, "order feed closed");
                        break;
                    }
                },
            };

            match self.process_message(&payload).await {
                Ok(outcome) => {
                    debug!(order_uid = %outcome.order_uid, replaced = outcome.replaced, "order ingested");
                }
                Err(err) => {
                    warn!(
                        kind = err.kind(),
                        persisted = err.persisted(),
                        payload_bytes = payload.len(),
                        error = %err,
                        "order ingestion failed"
                    );
                }
            }
        }

        let snap = self.metrics.snapshot();
        info!(
            received = snap.received,
            persisted = snap.persisted,
            cached = snap.cached,
            decode_failures = snap.decode_failures,
            persist_failures = snap.persist_failures,
            cache_failures = snap.cache_failures,
            "ingestion stopped"
        );
        self.metrics
    }
}
