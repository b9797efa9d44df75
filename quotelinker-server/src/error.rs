use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quotelinker_core::field::REQUIRED;
use quotelinker_core::{ErrorMap, Field};
use serde::Serialize;
use thiserror::Error;

/// Why a quote submission was not recorded.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("{}", describe_fields(.0))]
    Validation(ErrorMap),

    /// Details are logged server-side; the client only sees the summary.
    #[error("Failed to record quote request")]
    Persistence(#[source] anyhow::Error),
}

impl SubmissionError {
    pub fn status(&self) -> StatusCode {
        match self {
            SubmissionError::MalformedBody(_) | SubmissionError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            SubmissionError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Per-field messages keyed by wire name; empty unless a validation error.
    pub fn fields(&self) -> BTreeMap<String, String> {
        match self {
            SubmissionError::Validation(errors) => errors
                .iter()
                .map(|(field, msg)| (field.wire_name().to_string(), msg.clone()))
                .collect(),
            _ => BTreeMap::new(),
        }
    }
}

/// `Missing required fields: a, b; Invalid fields: c`
fn describe_fields(errors: &ErrorMap) -> String {
    let (missing, invalid): (Vec<_>, Vec<_>) = errors
        .iter()
        .partition(|(_, msg)| msg.as_str() == REQUIRED);

    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("Missing required fields: {}", join(&missing)));
    }
    if !invalid.is_empty() {
        parts.push(format!("Invalid fields: {}", join(&invalid)));
    }
    parts.join("; ")
}

fn join(entries: &[(&Field, &String)]) -> String {
    entries
        .iter()
        .map(|(field, _)| field.wire_name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    fields: BTreeMap<String, String>,
}

impl IntoResponse for SubmissionError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            fields: self.fields(),
        };
        (self.status(), Json(body)).into_response()
    }
}
