use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::classify::DispatchResult;
use crate::http::request::{appraisal_text, request_id};
use crate::http::server::AppState;
use crate::store::StoredAppraisal;

/// A stored appraisal plus its public link.
#[derive(Debug, Serialize)]
pub struct AppraisalResponse {
    #[serde(flatten)]
    pub appraisal: StoredAppraisal,
    pub url: String,
}

impl AppraisalResponse {
    fn new(appraisal: StoredAppraisal, base_url: &str) -> Self {
        let url = format!("{}/appraisal/{}", base_url, appraisal.id);
        Self { appraisal, url }
    }
}

pub async fn create_appraisal(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let text = match appraisal_text(&headers, &body) {
        Ok(text) => text,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    // Classification scans the whole catalog; keep it off the async workers.
    let dispatcher = state.dispatcher.clone();
    let classified = tokio::task::spawn_blocking(move || {
        let result = dispatcher.classify(&text);
        (result, text)
    })
    .await;
    let (result, text) = match classified {
        Ok(done) => done,
        Err(e) => {
            tracing::error!(request_id = %request_id(&headers), error = %e, "Classification task failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Classification failed").into_response();
        }
    };
    tracing::debug!(
        request_id = %request_id(&headers),
        recognizer = result.recognizer().unwrap_or("none"),
        generation = result.generation(),
        "Appraisal classified"
    );

    let appraisal = match result {
        DispatchResult::Recognized {
            items,
            recognizer,
            generation,
        } => state.appraisals.insert(
            Some(recognizer.to_string()),
            generation,
            items.items,
            items.unparsed_lines,
            text,
        ),
        DispatchResult::Unrecognized { generation } => {
            state
                .appraisals
                .insert(None, generation, Vec::new(), Vec::new(), text)
        }
    };

    (
        StatusCode::CREATED,
        Json(AppraisalResponse::new(appraisal, &state.base_url)),
    )
        .into_response()
}

pub async fn get_appraisal(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.appraisals.get(&id) {
        Some(appraisal) => Json(AppraisalResponse::new(appraisal, &state.base_url)).into_response(),
        None => (StatusCode::NOT_FOUND, "Appraisal not found").into_response(),
    }
}
