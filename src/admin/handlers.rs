use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::catalog::{RefreshPhase, RefreshTrigger};
use crate::lifecycle::ListenerInfo;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub generation: u64,
    pub items: usize,
    /// Seconds since epoch the current generation was built.
    pub built_at: u64,
    pub phase: RefreshPhase,
    /// Retired generations still pinned by in-flight requests.
    pub retiring: Vec<u64>,
}

#[derive(Debug, Serialize)]
pub struct RefreshAccepted {
    pub requested: bool,
    pub current_generation: u64,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let snapshot = state.catalog.current();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        generation: snapshot.generation(),
        items: snapshot.len(),
        built_at: snapshot.created_unix(),
        phase: state.catalog.phase(),
        retiring: state.catalog.retiring(),
    })
}

pub async fn refresh_catalog(
    State(state): State<AdminState>,
) -> Result<(StatusCode, Json<RefreshAccepted>), (StatusCode, &'static str)> {
    state
        .triggers
        .send(RefreshTrigger::Manual)
        .map_err(|_| (StatusCode::SERVICE_UNAVAILABLE, "Catalog refresher is not running"))?;

    tracing::info!("Manual catalog refresh requested");
    Ok((
        StatusCode::ACCEPTED,
        Json(RefreshAccepted {
            requested: true,
            current_generation: state.catalog.generation(),
        }),
    ))
}

pub async fn get_listeners(State(state): State<AdminState>) -> Json<Vec<ListenerInfo>> {
    Json(state.listeners.get().cloned().unwrap_or_default())
}
