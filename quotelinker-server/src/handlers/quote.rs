//! `/api/submit-quote`: the single submission endpoint plus its diagnostics.
//!
//! OPTIONS never reaches these handlers; the CORS layer answers it.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quotelinker_core::{DraftRecord, LeadRecord};
use serde_json::json;

use super::ApiResponse;
use crate::error::SubmissionError;
use crate::router::AppState;

pub const SUBMITTED_MESSAGE: &str = "Quote request submitted successfully";

/// POST /api/submit-quote
pub async fn submit_quote(
    State(state): State<AppState>,
    payload: Result<Json<DraftRecord>, JsonRejection>,
) -> Result<Json<ApiResponse<LeadRecord>>, SubmissionError> {
    let Json(draft) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Unreadable quote submission");
        SubmissionError::MalformedBody(rejection.body_text())
    })?;

    let record = state.orchestrator.submit(&draft).await?;
    Ok(Json(ApiResponse::ok(SUBMITTED_MESSAGE, record)))
}

/// GET /api/submit-quote
///
/// Probes the datastore and reports which optional integrations are live.
pub async fn diagnostics(State(state): State<AppState>) -> Response {
    match state.store.count().await {
        Ok(_) => Json(json!({
            "success": true,
            "message": "API is working",
            "config": state.integrations,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Datastore probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "Datastore unavailable",
                    "config": state.integrations,
                })),
            )
                .into_response()
        }
    }
}
