use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use quotelinker_core::LeadRecord;
use serde::Serialize;
use uuid::Uuid;

use super::ApiResponse;
use crate::router::AppState;

pub async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::ok("QuoteLinker quote API", "OK"))
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leads: Option<Vec<LeadSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

/// What the probe reveals about a stored lead. Contact details stay out.
#[derive(Debug, Serialize)]
pub struct LeadSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<&LeadRecord> for LeadSummary {
    fn from(record: &LeadRecord) -> Self {
        Self {
            id: record.id,
            created_at: record.created_at,
        }
    }
}

/// GET /api/test: read at most one lead back from the datastore.
pub async fn datastore_probe(State(state): State<AppState>) -> (StatusCode, Json<ProbeResponse>) {
    match state.store.recent(1).await {
        Ok(leads) => (
            StatusCode::OK,
            Json(ProbeResponse {
                success: true,
                message: Some("Datastore connection working"),
                leads: Some(leads.iter().map(LeadSummary::from).collect()),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Datastore probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ProbeResponse {
                    success: false,
                    message: None,
                    leads: None,
                    error: Some("Datastore unavailable"),
                }),
            )
        }
    }
}
