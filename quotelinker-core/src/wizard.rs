//! Step State Machine
//!
//! One [`QuoteWizard`] per form session. Steps 0..N-1 are local transitions
//! only; the final step's `advance` hands the complete draft to a
//! [`QuoteSubmitter`] exactly once per attempt.
//!
//! ```text
//!   step 0 ──advance──► step 1 ──advance──► step 2 ──advance──► Submitted
//!      ▲                  │  ▲                │  │
//!      └────retreat───────┘  └───retreat──────┘  └─(failure)─► step 2 + banner
//! ```

use thiserror::Error;

use crate::client::{QuoteSubmitter, SubmitFailure, SubmitReceipt};
use crate::draft::{Attribution, DraftRecord, ErrorMap};
use crate::field::Field;
use crate::funnel::{FunnelSpec, FunnelType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Moved forward to `step`
    Advanced { step: usize },
    /// The current or an earlier step has failing fields; the wizard is now
    /// on the earliest such step and nothing was submitted
    Blocked { fields: Vec<Field> },
    /// The final step was submitted and recorded
    Submitted(SubmitReceipt),
    /// The final step was submitted and refused; the form stays editable
    SubmissionFailed(SubmitFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("quote request was already submitted")]
    AlreadySubmitted,
}

pub struct QuoteWizard {
    funnel: &'static FunnelSpec,
    step: usize,
    draft: DraftRecord,
    errors: ErrorMap,
    banner: Option<String>,
    receipt: Option<SubmitReceipt>,
}

impl QuoteWizard {
    /// Fresh session on step 0. Attribution is fixed for the whole session.
    pub fn new(attribution: Attribution) -> Self {
        let funnel = attribution.funnel_type.spec();
        Self {
            funnel,
            step: 0,
            draft: DraftRecord::new(attribution),
            errors: ErrorMap::new(),
            banner: None,
            receipt: None,
        }
    }

    pub fn for_landing_url(landing_url: &str, funnel: FunnelType) -> Self {
        Self::new(Attribution::from_landing_url(landing_url, funnel))
    }

    pub fn funnel(&self) -> &'static FunnelSpec {
        self.funnel
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn step_count(&self) -> usize {
        self.funnel.step_count()
    }

    pub fn is_final_step(&self) -> bool {
        self.step + 1 == self.step_count()
    }

    pub fn title(&self) -> &'static str {
        self.funnel.steps[self.step].title
    }

    pub fn draft(&self) -> &DraftRecord {
        &self.draft
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// Submission-level error shown near the submit control.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn receipt(&self) -> Option<&SubmitReceipt> {
        self.receipt.as_ref()
    }

    pub fn is_submitted(&self) -> bool {
        self.receipt.is_some()
    }

    /// Merge one value and re-validate that field alone.
    ///
    /// Fields the funnel does not collect are stored and treated as optional.
    pub fn update_field(&mut self, field: Field, value: impl Into<String>) -> Result<(), WizardError> {
        if self.is_submitted() {
            return Err(WizardError::AlreadySubmitted);
        }

        self.draft.set(field, value);
        let raw = self.draft.get(field);
        let verdict = match self.funnel.rule(field) {
            Some(rule) => rule.check(raw),
            None if raw.trim().is_empty() => None,
            None => crate::field::validate(field, raw),
        };

        match verdict {
            Some(msg) => {
                self.errors.insert(field, msg.to_string());
            }
            None => {
                self.errors.remove(&field);
            }
        }
        Ok(())
    }

    /// Gate forward navigation on the fields of this and every earlier step.
    ///
    /// A failure on an earlier step moves the wizard back to it. On the
    /// final step a passing check submits the draft instead of moving past
    /// the end.
    pub async fn advance(&mut self, submitter: &dyn QuoteSubmitter) -> Result<Transition, WizardError> {
        if self.is_submitted() {
            return Err(WizardError::AlreadySubmitted);
        }

        let failing = self.failing_through(self.step);
        if !failing.is_empty() {
            // Send the visitor back to the first step that needs attention.
            if let Some(earliest) = failing.keys().filter_map(|f| self.funnel.step_of(*f)).min() {
                self.step = self.step.min(earliest);
            }
            let fields = failing.keys().copied().collect();
            self.errors = failing;
            return Ok(Transition::Blocked { fields });
        }
        self.errors.clear();

        if !self.is_final_step() {
            self.step += 1;
            tracing::debug!(step = self.step, funnel = %self.funnel.funnel, "Quote wizard advanced");
            return Ok(Transition::Advanced { step: self.step });
        }

        self.banner = None;
        match submitter.submit(&self.draft).await {
            Ok(receipt) => {
                tracing::info!(lead_id = %receipt.lead_id, funnel = %self.funnel.funnel, "Quote submitted");
                self.receipt = Some(receipt.clone());
                Ok(Transition::Submitted(receipt))
            }
            Err(failure) => {
                tracing::warn!(status = ?failure.status, "Quote submission failed: {}", failure.message);
                for (name, msg) in &failure.fields {
                    if let Some(field) = Field::parse(name) {
                        self.errors.insert(field, msg.clone());
                    }
                }
                self.banner = Some(failure.message.clone());
                Ok(Transition::SubmissionFailed(failure))
            }
        }
    }

    /// Rules of steps `0..=last`, plus any supplied field the funnel does not
    /// collect. Earlier steps are re-checked because `update_field` accepts
    /// edits to any field.
    fn failing_through(&self, last: usize) -> ErrorMap {
        let mut errors: ErrorMap = self.funnel.steps[..=last]
            .iter()
            .flat_map(|step| step.validate(&self.draft))
            .collect();

        for field in Field::ALL {
            let raw = self.draft.get(field);
            if self.funnel.rule(field).is_none() && !raw.trim().is_empty() {
                if let Some(msg) = crate::field::validate(field, raw) {
                    errors.insert(field, msg.to_string());
                }
            }
        }
        errors
    }

    /// Step back without re-validating. Stops at the first step.
    pub fn retreat(&mut self) -> Result<usize, WizardError> {
        if self.is_submitted() {
            return Err(WizardError::AlreadySubmitted);
        }
        self.step = self.step.saturating_sub(1);
        self.banner = None;
        Ok(self.step)
    }
}
