//! Axum router and all HTTP handlers for ocs-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers, so scenario tests in `tests/` drive the bare router.
//!
//! Every lookup goes through `OrderQuery`, which reads the cache only.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use ocs_runtime::Lookup;
use tracing::{info, warn};

use crate::{
    api_types::{ErrorResponse, HealthResponse, LookupForm, OrderResponse, StatusResponse},
    html,
    state::AppState,
};

/// Body of the 400 returned when the form carries no identifier.
pub const EMPTY_ORDER_ID: &str = "empty value in orderId";

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/postform", post(postform))
        .route("/v1/orders/:order_uid", get(order_json))
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

pub(crate) async fn index() -> Html<&'static str> {
    Html(html::FORM_PAGE)
}

// ---------------------------------------------------------------------------
// POST /postform
// ---------------------------------------------------------------------------

pub(crate) async fn postform(State(st): State<Arc<AppState>>, Form(form): Form<LookupForm>) -> Response {
    // blank ids are refused, others are looked up exactly as sent
    let order_uid = form.order_id.as_str();
    if order_uid.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, EMPTY_ORDER_ID).into_response();
    }

    match st.query.lookup(order_uid) {
        Lookup::Found(rendered) => {
            info!(order_uid, "form lookup hit");
            (StatusCode::OK, Html(html::order_page(order_uid, &rendered))).into_response()
        }
        Lookup::NotFound => {
            info!(order_uid, "form lookup miss");
            (StatusCode::NOT_FOUND, Html(html::not_found_page(order_uid))).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/orders/:order_uid
// ---------------------------------------------------------------------------

pub(crate) async fn order_json(State(st): State<Arc<AppState>>, Path(order_uid): Path<String>) -> Response {
    let order_uid = order_uid.as_str();
    if order_uid.trim().is_empty() {
        return error_json(StatusCode::BAD_REQUEST, EMPTY_ORDER_ID.to_string());
    }

    match st.query.lookup(order_uid) {
        Lookup::Found(rendered) => {
            let order = serde_json::from_str(&rendered).unwrap_or_else(|e| {
                warn!(order_uid, error = %e, "cached order is not JSON; returning it as a string");
                serde_json::Value::String(rendered)
            });
            (
                StatusCode::OK,
                Json(OrderResponse {
                    order_uid: order_uid.to_string(),
                    order,
                }),
            )
                .into_response()
        }
        Lookup::NotFound => error_json(StatusCode::NOT_FOUND, format!("order not found: {order_uid}")),
    }
}

fn error_json(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let cache = st.cache();
    (
        StatusCode::OK,
        Json(StatusResponse {
            daemon_uptime_secs: st.uptime_secs(),
            cache_entries: cache.len(),
            cache_default_ttl_secs: cache.default_ttl().map(|d| d.as_secs()),
            config_hash: st.config_hash.clone(),
            warm: st.warm,
            ingest: st.metrics.snapshot(),
        }),
    )
}
