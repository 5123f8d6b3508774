//! In-process expiring map from `order_uid` to the rendered order.
//!
//! One default TTL applies to every insert; there is no per-call TTL.
//! Expiry is lazy: `get` treats an expired entry as absent and drops it.
//! [`spawn_janitor`] adds an optional periodic sweep so expired entries do
//! not accumulate, but nothing observable depends on it.
//!
//! Shared between the ingestion task and every HTTP handler, so the map is a
//! sharded `DashMap`; `add` uses the entry API so "insert if absent" is atomic
//! per key.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache entry already exists for order {0}")]
    AlreadyExists(String),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|t| now >= t)
    }
}

pub struct OrderCache {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Option<Duration>,
}

impl OrderCache {
    /// `default_ttl = None` means entries never expire.
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    fn entry_at(&self, value: String, now: Instant) -> CacheEntry {
        CacheEntry {
            value,
            expires_at: self.default_ttl.map(|ttl| now + ttl),
        }
    }

    /// Insert only if `order_uid` is absent (or its entry has expired).
    pub fn add(&self, order_uid: &str, value: String) -> Result<(), CacheError> {
        let now = Instant::now();
        match self.entries.entry(order_uid.to_string()) {
            Entry::Occupied(mut occ) => {
                if !occ.get().is_expired(now) {
                    return Err(CacheError::AlreadyExists(order_uid.to_string()));
                }
                occ.insert(self.entry_at(value, now));
            }
            Entry::Vacant(vac) => {
                vac.insert(self.entry_at(value, now));
            }
        }
        Ok(())
    }

    /// Insert or overwrite. Returns true when a live entry was replaced.
    pub fn set(&self, order_uid: &str, value: String) -> bool {
        let now = Instant::now();
        self.entries
            .insert(order_uid.to_string(), self.entry_at(value, now))
            .is_some_and(|prev| !prev.is_expired(now))
    }

    /// `None` on miss or expiry. Never errors.
    pub fn get(&self, order_uid: &str) -> Option<String> {
        let now = Instant::now();
        match self.entries.get(order_uid) {
            None => return None,
            Some(e) if !e.is_expired(now) => return Some(e.value.clone()),
            Some(_) => {}
        }
        // Re-check under the write lock: a concurrent add may have refreshed it.
        self.entries.remove_if(order_uid, |_, e| e.is_expired(now));
        None
    }

    /// Number of entries held, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        if self.default_ttl.is_none() {
            return 0;
        }
        let now = Instant::now();
        let mut removed = 0usize;
        self.entries.retain(|_, e| {
            let keep = !e.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }
}

/// Periodically purge expired entries until `shutdown` flips to true.
pub fn spawn_janitor(
    cache: Arc<OrderCache>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = every.as_secs(), "cache janitor started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let removed = cache.purge_expired();
                    if removed > 0 {
                        debug!(removed, remaining = cache.len(), "expired cache entries purged");
                    }
                }
            }
        }

        info!("cache janitor stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn add_conflicts_while_live_and_succeeds_after_expiry() {
        let cache = OrderCache::new(Some(Duration::from_secs(10)));
        cache.add("a", "v1".into()).unwrap();
        assert_eq!(
            cache.add("a", "v2".into()),
            Err(CacheError::AlreadyExists("a".into()))
        );
        assert_eq!(cache.get("a").as_deref(), Some("v1"));

        tokio::time::advance(Duration::from_secs(10)).await;
        cache.add("a", "v2".into()).unwrap();
        assert_eq!(cache.get("a").as_deref(), Some("v2"));
    }

    #[tokio::test(start_paused = true)]
    async fn get_evicts_expired_entry_lazily() {
        let cache = OrderCache::new(Some(Duration::from_millis(500)));
        cache.add("a", "v".into()).unwrap();
        tokio::time::advance(Duration::from_millis(499)).await;
        assert!(cache.get("a").is_some());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn no_default_ttl_never_expires() {
        let cache = OrderCache::new(None);
        cache.add("a", "v".into()).unwrap();
        tokio::time::advance(Duration::from_secs(86_400 * 365)).await;
        assert_eq!(cache.get("a").as_deref(), Some("v"));
        assert_eq!(cache.purge_expired(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn set_overwrites_and_reports_live_replacement() {
        let cache = OrderCache::new(Some(Duration::from_secs(5)));
        assert!(!cache.set("a", "v1".into()));
        assert!(cache.set("a", "v2".into()));
        assert_eq!(cache.get("a").as_deref(), Some("v2"));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(!cache.set("a", "v3".into()), "expired entry is not a live replacement");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_removes_only_expired() {
        let cache = OrderCache::new(Some(Duration::from_secs(5)));
        cache.add("old", "v".into()).unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        cache.add("new", "v".into()).unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.get("old").is_none());
        assert!(cache.get("new").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn janitor_sweeps_and_stops_on_shutdown() {
        let cache = Arc::new(OrderCache::new(Some(Duration::from_secs(1))));
        cache.add("a", "v".into()).unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = spawn_janitor(Arc::clone(&cache), Duration::from_secs(2), rx);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(cache.len(), 0, "janitor should have purged the expired entry");

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_for_one_key_admit_exactly_one() {
        let cache = Arc::new(OrderCache::new(None));
        let mut handles = Vec::new();
        for i in 0..32 {
            let c = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { c.add("same", format!("v{i}")).is_ok() }));
        }
        let mut admitted = 0;
        for h in handles {
            if h.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(cache.len(), 1);
    }
}
