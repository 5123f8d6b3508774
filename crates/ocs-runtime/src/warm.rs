//! Startup warm-up: load every persisted order into the cache.
//!
//! Runs once, before the feed is subscribed. A store read failure is fatal
//! to startup and is returned to the caller. A single order that cannot be
//! rendered or added is logged and skipped.

use ocs_db::{OrderStore, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::OrderCache;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmReport {
    pub loaded: usize,
    pub cached: usize,
    pub skipped: usize,
}

pub async fn warm_cache(store: &dyn OrderStore, cache: &OrderCache) -> Result<WarmReport, StoreError> {
    let orders = store.get_all().await?;
    let mut report = WarmReport {
        loaded: orders.len(),
        ..WarmReport::default()
    };

    for order in orders {
        let rendered = match order.render() {
            Ok(v) => v,
            Err(err) => {
                warn!(order_uid = %order.order_uid, error = %err, "warm: render failed, skipping");
                report.skipped += 1;
                continue;
            }
        };
        match cache.add(&order.order_uid, rendered) {
            Ok(()) => report.cached += 1,
            Err(err) => {
                warn!(order_uid = %order.order_uid, error = %err, "warm: cache add failed, skipping");
                report.skipped += 1;
            }
        }
    }

    info!(
        store = store.name(),
        loaded = report.loaded,
        cached = report.cached,
        skipped = report.skipped,
        "cache warmed from store"
    );
    Ok(report)
}
