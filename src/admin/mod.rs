//! Management API, served on management listeners only.

pub mod auth;
pub mod handlers;

use std::sync::{Arc, OnceLock};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use crate::catalog::{HotSwapController, RefreshTrigger};
use crate::lifecycle::ListenerInfo;

use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by the management handlers.
#[derive(Clone)]
pub struct AdminState {
    pub catalog: Arc<HotSwapController>,
    pub triggers: mpsc::UnboundedSender<RefreshTrigger>,
    /// Filled in once the listeners are up.
    pub listeners: Arc<OnceLock<Vec<ListenerInfo>>>,
    /// Empty disables authentication.
    pub api_key: String,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/catalog/refresh", post(refresh_catalog))
        .route("/admin/listeners", get(get_listeners))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
