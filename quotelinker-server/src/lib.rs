//! QuoteLinker quote API.
//!
//! Accepts the single quote submission of a wizard session, re-validates it,
//! records one lead in Postgres and fans out notifications. See
//! [`orchestrator::SubmissionOrchestrator`] for the ordering and failure rules.

pub mod config;
pub mod effects;
pub mod error;
pub mod handlers;
pub mod orchestrator;
pub mod router;
pub mod store;

pub use config::ServerConfig;
pub use effects::{DispatchMode, SideEffect, SideEffects};
pub use error::SubmissionError;
pub use orchestrator::SubmissionOrchestrator;
pub use router::{build_router, AppState};
pub use store::{LeadStore, MemoryLeadStore, PgLeadStore};
