//! Read side: look an order up by id. Cache only; the store is never
//! consulted on the request path.

use std::sync::Arc;

use tracing::debug;

use crate::cache::OrderCache;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    NotFound,
}

#[derive(Clone)]
pub struct OrderQuery {
    cache: Arc<OrderCache>,
}

impl OrderQuery {
    pub fn new(cache: Arc<OrderCache>) -> Self {
        Self { cache }
    }

    /// Callers reject blank ids before getting here; a blank id is simply a miss.
    pub fn lookup(&self, order_uid: &str) -> Lookup {
        match self.cache.get(order_uid) {
            Some(rendered) => {
                debug!(order_uid, "order lookup hit");
                Lookup::Found(rendered)
            }
            None => {
                debug!(order_uid, "order lookup miss");
                Lookup::NotFound
            }
        }
    }

    pub fn cache(&self) -> &Arc<OrderCache> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_reflects_cache_contents() {
        let cache = Arc::new(OrderCache::new(None));
        cache.add("abc", "{\"order_uid\":\"abc\"}".to_string()).unwrap();
        let q = OrderQuery::new(Arc::clone(&cache));

        assert_eq!(q.lookup("abc"), Lookup::Found("{\"order_uid\":\"abc\"}".to_string()));
        assert_eq!(q.lookup("nope"), Lookup::NotFound);
        assert_eq!(q.lookup(""), Lookup::NotFound);
    }
}
