//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the public Axum router with all handlers
//! - Wire up middleware (tracing, limits, timeout, request ID)
//!
//! Serving is done by `lifecycle::listeners`, which binds the configured
//! transports and hands each of them this router.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::classify::Dispatcher;
use crate::config::LimitsConfig;
use crate::http::appraisal::{create_appraisal, get_appraisal};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::store::AppraisalStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub appraisals: AppraisalStore,
    /// Without a trailing slash.
    pub base_url: Arc<str>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, appraisals: AppraisalStore, base_url: &str) -> Self {
        Self {
            dispatcher,
            appraisals,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub generation: u64,
    pub items: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let snapshot = state.dispatcher.catalog().current();
    Json(HealthStatus {
        status: if snapshot.generation() == 0 { "starting" } else { "ok" },
        generation: snapshot.generation(),
        items: snapshot.len(),
    })
}

/// Build the public router with all middleware layers.
#[allow(deprecated)]
pub fn build_public_router(state: AppState, limits: &LimitsConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(set_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id_layer())
        .layer(TimeoutLayer::new(Duration::from_secs(limits.request_timeout_secs)));

    Router::new()
        .route("/appraisal", post(create_appraisal))
        .route("/appraisal/{id}", get(get_appraisal))
        .route("/health", get(health))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limits.max_body_bytes))
        .layer(middleware)
}
