//! Request and response types for ocs-daemon HTTP endpoints.
//!
//! No business logic lives here.

use ocs_runtime::{IngestMetricsSnapshot, WarmReport};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// /v1/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub daemon_uptime_secs: u64,
    /// Entries currently held, including expired ones not yet swept.
    pub cache_entries: usize,
    /// `None` when entries never expire.
    pub cache_default_ttl_secs: Option<u64>,
    pub config_hash: Option<String>,
    pub warm: Option<WarmReport>,
    pub ingest: IngestMetricsSnapshot,
}

// ---------------------------------------------------------------------------
// /v1/orders/:order_uid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_uid: String,
    pub order: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// POST /postform
// ---------------------------------------------------------------------------

/// Browser form body. A missing field decodes as empty and is rejected by
/// the handler, same as an explicitly empty one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupForm {
    #[serde(rename = "orderId", default)]
    pub order_id: String,
}
