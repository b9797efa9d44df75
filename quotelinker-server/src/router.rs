//! Router construction for the quote API.

use std::path::Path;
use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::Integrations;
use crate::handlers;
use crate::orchestrator::SubmissionOrchestrator;
use crate::store::LeadStore;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: SubmissionOrchestrator,
    pub store: Arc<dyn LeadStore>,
    pub integrations: Integrations,
}

/// Build the full axum router. When `static_dir` is given, unmatched paths
/// are served from it (the landing pages); otherwise they get a JSON 404.
pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let api = Router::new()
        .route(
            "/api/submit-quote",
            get(handlers::quote::diagnostics).post(handlers::quote::submit_quote),
        )
        .route("/api/test", get(handlers::health::datastore_probe))
        .route("/api/health", get(handlers::health::health))
        .route("/api/funnels", get(handlers::funnels::list_funnels))
        .route("/api/funnels/:funnel", get(handlers::funnels::get_funnel));

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api.fallback(handlers::not_found),
    };

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    )
    .with_state(state)
}
