//! Submission seam between the wizard and whoever records the lead.
//!
//! The wizard only knows [`QuoteSubmitter`]. In the browser-facing flow that
//! is [`HttpSubmitter`], which issues the single `POST /api/submit-quote` of a
//! form session; the server implements the same trait in-process on its
//! orchestrator.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::draft::DraftRecord;
use crate::lead::LeadRecord;

pub const SUBMIT_PATH: &str = "/api/submit-quote";

/// Banner text shown when the failure carries nothing more useful.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// What the client learns about a recorded lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub lead_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<&LeadRecord> for SubmitReceipt {
    fn from(record: &LeadRecord) -> Self {
        Self {
            lead_id: record.id,
            created_at: record.created_at,
        }
    }
}

/// A submission that was not recorded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SubmitFailure {
    /// HTTP status, when the failure came from a response at all
    pub status: Option<u16>,
    pub message: String,
    /// Per-field messages keyed by wire name
    pub fields: BTreeMap<String, String>,
}

impl SubmitFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }
}

#[async_trait]
pub trait QuoteSubmitter: Send + Sync {
    async fn submit(&self, draft: &DraftRecord) -> Result<SubmitReceipt, SubmitFailure>;
}

/// Response envelope of `POST /api/submit-quote`.
#[derive(Debug, Deserialize)]
struct SubmitEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<LeadRecord>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

pub struct HttpSubmitter {
    client: Client,
    endpoint: Url,
}

impl HttpSubmitter {
    /// `base_url` is the site origin, e.g. `https://quotelinker.com`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join(SUBMIT_PATH))
            .with_context(|| format!("Invalid quote API base URL: {base_url}"))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl QuoteSubmitter for HttpSubmitter {
    async fn submit(&self, draft: &DraftRecord) -> Result<SubmitReceipt, SubmitFailure> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(draft)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Quote submission did not reach the server: {e}");
                SubmitFailure::transport(GENERIC_FAILURE)
            })?;

        let status = response.status();
        let envelope: SubmitEnvelope = response.json().await.map_err(|e| {
            tracing::warn!("Unreadable quote submission response ({status}): {e}");
            SubmitFailure {
                status: Some(status.as_u16()),
                message: GENERIC_FAILURE.to_string(),
                fields: BTreeMap::new(),
            }
        })?;

        match envelope {
            SubmitEnvelope {
                success: true,
                data: Some(record),
                ..
            } if status.is_success() => Ok(SubmitReceipt::from(&record)),
            SubmitEnvelope { error, fields, .. } => {
                // Request-shape errors are worth showing verbatim; anything
                // else gets the generic banner.
                let message = match error {
                    Some(e) if status.is_client_error() => e,
                    _ => GENERIC_FAILURE.to_string(),
                };
                Err(SubmitFailure {
                    status: Some(status.as_u16()),
                    message,
                    fields,
                })
            }
        }
    }
}
