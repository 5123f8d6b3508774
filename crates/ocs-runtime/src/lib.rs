//! Order cache runtime: the expiring cache, message feeds, the ingestion
//! loop, startup warm-up, the read-side query and store bootstrap.
//!
//! Nothing here binds listeners or reads config files; `ocs-daemon` wires
//! these pieces together.

pub mod bootstrap;
pub mod cache;
pub mod feed;
pub mod ingest;
pub mod query;
pub mod warm;

pub use cache::{spawn_janitor, CacheError, OrderCache};
pub use feed::{connect_nats, ChannelFeed, NatsFeed, OrderFeed};
pub use ingest::{IngestError, IngestMetrics, IngestMetricsSnapshot, IngestOutcome, OrderIngestor};
pub use query::{Lookup, OrderQuery};
pub use warm::{warm_cache, WarmReport};
