//! Shared runtime state for ocs-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The cache and the
//! ingest metrics are owned elsewhere (warm-up and the ingestion task); this
//! module only holds handles to them.

use std::sync::Arc;
use std::time::Instant;

use ocs_runtime::{IngestMetrics, OrderCache, OrderQuery, WarmReport};
use serde::Serialize;

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health / status responses.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    /// Read side over the shared order cache.
    pub query: OrderQuery,
    /// Counters written by the ingestion task.
    pub metrics: Arc<IngestMetrics>,
    /// Hash of the merged config the daemon booted with, if any.
    pub config_hash: Option<String>,
    /// Result of the startup warm-up, if one ran.
    pub warm: Option<WarmReport>,
    started: Instant,
}

impl AppState {
    pub fn new(cache: Arc<OrderCache>, metrics: Arc<IngestMetrics>) -> Self {
        Self {
            build: BuildInfo {
                service: "ocs-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            query: OrderQuery::new(cache),
            metrics,
            config_hash: None,
            warm: None,
            started: Instant::now(),
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn with_warm_report(mut self, report: WarmReport) -> Self {
        self.warm = Some(report);
        self
    }

    pub fn cache(&self) -> &Arc<OrderCache> {
        self.query.cache()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
