//! QuoteLinker quote funnel domain.
//!
//! Everything a quote form needs that does not touch the network on its own:
//!
//! - [`field`]: per-field validation rules (`validate(field, raw)`)
//! - [`funnel`]: the declarative step/field table for each product funnel
//! - [`draft`]: the in-progress draft record and attribution tags
//! - [`wizard`]: the multi-step state machine driving a single form session
//! - [`lead`]: server-side re-validation and normalization into a lead
//! - [`client`]: the submission seam, plus the HTTP client that crosses it
//!
//! The server crate (`quotelinker-server`) owns persistence and the
//! notification fan-out; it implements [`client::QuoteSubmitter`] in-process.

pub mod client;
pub mod draft;
pub mod field;
pub mod funnel;
pub mod lead;
pub mod wizard;

pub use client::{HttpSubmitter, QuoteSubmitter, SubmitFailure, SubmitReceipt};
pub use draft::{Attribution, DraftRecord, ErrorMap};
pub use field::{validate, validate_named, Field};
pub use funnel::{FieldRule, FunnelSpec, FunnelType, StepSpec};
pub use lead::{normalize, LeadRecord, NewLead, STATUS_NEW};
pub use wizard::{QuoteWizard, Transition, WizardError};
