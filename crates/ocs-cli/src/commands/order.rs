//! `ocs order get`: read one order straight from the store.
//!
//! Bypasses the daemon's cache, so it also answers for expired entries.

use anyhow::{bail, Result};
use ocs_config::ServiceConfig;
use ocs_db::{OrderStore, StoreError};

pub async fn order_get(cfg: &ServiceConfig, order_uid: &str) -> Result<()> {
    let order_uid = order_uid.trim();
    if order_uid.is_empty() {
        bail!("--order-uid must not be empty");
    }

    let store = ocs_runtime::bootstrap::open_order_store(cfg).await?;
    match store.get_by_id(order_uid).await {
        Ok(order) => {
            println!("{}", order.render()?);
            Ok(())
        }
        Err(StoreError::NotFound(id)) => bail!("order not found: {id}"),
        Err(e) => Err(e.into()),
    }
}
