//! ocs-daemon entry point.
//!
//! Boot order: config, store (connect + migrate), cache warm-up, janitor,
//! NATS subscription and ingestion task, then the HTTP listener. Warm-up
//! failure aborts startup. Ctrl-C stops the listener, then the ingestion
//! task and janitor via the shared shutdown channel.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use ocs_daemon::{routes, state};
use ocs_db::OrderStore;
use ocs_runtime::{
    bootstrap, connect_nats, spawn_janitor, warm_cache, NatsFeed, OrderCache, OrderIngestor,
};
use tokio::sync::watch;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let paths = ocs_config::config_paths_from_env();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let (loaded, cfg) = ocs_config::load_service_config(&path_refs)?;
    info!(config_hash = %loaded.config_hash, paths = ?paths, "config loaded");
    for pointer in ocs_config::report_unused_keys(&loaded.config_json).unused_leaf_pointers {
        warn!(pointer = %pointer, "config key is not used by the service");
    }

    let pg = bootstrap::open_order_store(&cfg).await?;
    ocs_db::migrate(pg.pool()).await?;
    let store: Arc<dyn OrderStore> = Arc::new(pg);

    let cache = Arc::new(OrderCache::new(cfg.cache.default_ttl()));
    let warm = warm_cache(store.as_ref(), &cache)
        .await
        .context("cache warm-up from store failed")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let janitor = match (cache.default_ttl(), cfg.cache.cleanup_interval()) {
        (Some(_), Some(every)) => Some(spawn_janitor(Arc::clone(&cache), every, shutdown_rx.clone())),
        _ => None,
    };

    let nats = connect_nats(&cfg.nats.url).await?;
    let feed = NatsFeed::subscribe(&nats, &cfg.nats.subject).await?;
    let ingestor = OrderIngestor::new(Arc::clone(&store), Arc::clone(&cache), cfg.ingest.duplicate_policy);
    let metrics = ingestor.metrics();
    let ingest_task = tokio::spawn(ingestor.run(feed, shutdown_rx));

    let shared = Arc::new(
        state::AppState::new(Arc::clone(&cache), metrics)
            .with_config_hash(loaded.config_hash.clone())
            .with_warm_report(warm),
    );

    let app = routes::build_router(shared).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let addr: SocketAddr = cfg
        .http
        .addr
        .parse()
        .with_context(|| format!("invalid http.addr '{}'", cfg.http.addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr} failed"))?;
    info!("ocs-daemon listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = ingest_task.await {
        warn!(error = %e, "ingestion task ended abnormally");
    }
    if let Some(janitor) = janitor {
        if let Err(e) = janitor.await {
            warn!(error = %e, "cache janitor ended abnormally");
        }
    }

    info!("ocs-daemon stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler failed; shutting down");
        return;
    }
    info!("shutdown signal received");
}
