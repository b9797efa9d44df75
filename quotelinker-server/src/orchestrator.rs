//! Server side of a quote submission.
//!
//! validate and normalize -> persist (fatal on failure) -> side effects
//! (best-effort). The response is decided by the persist step alone.

use std::sync::Arc;

use async_trait::async_trait;
use quotelinker_core::{
    normalize, DraftRecord, LeadRecord, QuoteSubmitter, SubmitFailure, SubmitReceipt,
};

use crate::effects::SideEffects;
use crate::error::SubmissionError;
use crate::store::LeadStore;

#[derive(Clone)]
pub struct SubmissionOrchestrator {
    store: Arc<dyn LeadStore>,
    effects: SideEffects,
}

impl SubmissionOrchestrator {
    pub fn new(store: Arc<dyn LeadStore>, effects: SideEffects) -> Self {
        Self { store, effects }
    }

    pub async fn submit(&self, draft: &DraftRecord) -> Result<LeadRecord, SubmissionError> {
        let funnel = draft.attribution.funnel_type;

        let lead = normalize(draft).map_err(|errors| {
            tracing::info!(
                funnel = %funnel,
                fields = ?errors.keys().map(|f| f.wire_name()).collect::<Vec<_>>(),
                "Quote submission rejected"
            );
            SubmissionError::Validation(errors)
        })?;

        let record = self.store.insert(&lead).await.map_err(|e| {
            tracing::error!(funnel = %funnel, error = %format!("{e:#}"), "Failed to persist lead");
            SubmissionError::Persistence(e)
        })?;

        tracing::info!(lead_id = %record.id, funnel = %funnel, source = %record.lead.source, "Lead recorded");

        self.effects.dispatch(&record).await;

        Ok(record)
    }
}

#[async_trait]
impl QuoteSubmitter for SubmissionOrchestrator {
    async fn submit(&self, draft: &DraftRecord) -> Result<SubmitReceipt, SubmitFailure> {
        SubmissionOrchestrator::submit(self, draft)
            .await
            .map(|record| SubmitReceipt::from(&record))
            .map_err(|e| SubmitFailure {
                status: Some(e.status().as_u16()),
                message: e.to_string(),
                fields: e.fields(),
            })
    }
}
