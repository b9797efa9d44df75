//! HTTP-level tests for the quote API.
//!
//! The router runs against the in-memory lead store and recording side
//! effects, so no database or third-party service is needed.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use quotelinker_core::{
    Attribution, Field, FunnelType, HttpSubmitter, LeadRecord, NewLead, QuoteWizard, Transition,
};
use quotelinker_server::config::Integrations;
use quotelinker_server::{
    build_router, AppState, DispatchMode, LeadStore, MemoryLeadStore, SideEffect, SideEffects,
    SubmissionOrchestrator,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

// ── Test collaborators ─────────────────────────────────────────

type Calls = Arc<Mutex<Vec<(&'static str, Uuid)>>>;

/// Records each invocation into a shared call log.
struct Recorder {
    name: &'static str,
    calls: Calls,
    fail: bool,
}

#[async_trait]
impl SideEffect for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, lead: &LeadRecord) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push((self.name, lead.id));
        if self.fail {
            anyhow::bail!("{} is down", self.name);
        }
        Ok(())
    }
}

struct BrokenStore;

#[async_trait]
impl LeadStore for BrokenStore {
    async fn insert(&self, _lead: &NewLead) -> anyhow::Result<LeadRecord> {
        anyhow::bail!("password authentication failed for user \"app\"")
    }

    async fn recent(&self, _limit: i64) -> anyhow::Result<Vec<LeadRecord>> {
        anyhow::bail!("connection refused")
    }

    async fn count(&self) -> anyhow::Result<i64> {
        anyhow::bail!("connection refused")
    }
}

const EFFECTS: [&str; 4] = [
    "admin_notification",
    "applicant_confirmation",
    "crm_webhook",
    "analytics_event",
];

fn recording_effects(calls: &Calls, failing: &[&str]) -> SideEffects {
    EFFECTS.iter().fold(
        SideEffects::new(Duration::from_secs(1), DispatchMode::Inline),
        |effects, name| {
            effects.with(Recorder {
                name: *name,
                calls: calls.clone(),
                fail: failing.contains(name),
            })
        },
    )
}

struct TestApp {
    router: axum::Router,
    store: Arc<MemoryLeadStore>,
    calls: Calls,
}

fn build_test_app(failing: &[&str]) -> TestApp {
    let store = Arc::new(MemoryLeadStore::new());
    let calls = Calls::default();
    let state = AppState {
        orchestrator: SubmissionOrchestrator::new(store.clone(), recording_effects(&calls, failing)),
        store: store.clone(),
        integrations: Integrations {
            has_resend_key: true,
            has_zapier_webhook: true,
            ..Integrations::default()
        },
    };
    TestApp {
        router: build_router(state, None),
        store,
        calls,
    }
}

fn broken_app(calls: &Calls) -> axum::Router {
    let store: Arc<dyn LeadStore> = Arc::new(BrokenStore);
    let state = AppState {
        orchestrator: SubmissionOrchestrator::new(store.clone(), recording_effects(calls, &[])),
        store,
        integrations: Integrations::default(),
    };
    build_router(state, None)
}

fn jane() -> Value {
    json!({
        "firstName": "Jane",
        "lastName": "Doe",
        "email": "jane@example.com",
        "phone": "5551234567",
        "age": "35",
        "gender": "female",
        "healthStatus": "good",
        "tobaccoUse": "never",
        "coverageAmount": "250000",
        "termLength": "20",
        "funnelType": "term_life",
    })
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ORIGIN, "https://quotelinker.com")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }))
}

// ── Submission ─────────────────────────────────────────────────

#[tokio::test]
async fn test_valid_submission_is_recorded_once() {
    let app = build_test_app(&[]);

    let resp = app
        .router
        .clone()
        .oneshot(post_json("/api/submit-quote", jane().to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Quote request submitted successfully");
    assert_eq!(body["data"]["phone"], "5551234567");
    assert_eq!(body["data"]["coverage_amount"], 250000);
    assert_eq!(body["data"]["term_length"], 20);
    assert_eq!(body["data"]["status"], "new");

    let stored = app.store.all().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(body["data"]["id"], stored[0].id.to_string());

    let calls = app.calls.lock().unwrap();
    let names: Vec<_> = calls.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, EFFECTS);
    assert!(calls.iter().all(|(_, id)| *id == stored[0].id));
}

#[tokio::test]
async fn test_plain_form_body_defaults_funnel_and_normalizes() {
    let app = build_test_app(&[]);
    let body = json!({
        "firstName": "Jane",
        "lastName": "Doe",
        "email": "Jane@Example.com",
        "phone": "5551234567",
        "age": "35",
        "gender": "female",
        "healthStatus": "good",
        "tobaccoUse": "no",
        "coverageAmount": "250000",
        "termLength": "20",
    });

    let resp = app
        .router
        .clone()
        .oneshot(post_json("/api/submit-quote", body.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "jane@example.com");
    assert_eq!(body["data"]["tobacco_use"], "no");
    assert_eq!(body["data"]["coverage_amount"], json!(250000));
    assert_eq!(body["data"]["term_length"], json!(20));
    assert_eq!(body["data"]["funnel_type"], "term_life");
    assert_eq!(body["data"]["insurance_type"], "Term Life");

    let stored = app.store.all().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].lead.email, "jane@example.com");
    assert_eq!(stored[0].lead.coverage_amount, Some(250_000));
    assert_eq!(stored[0].lead.term_length, Some(20));
    assert_eq!(stored[0].lead.funnel_type, FunnelType::TermLife);
}

#[tokio::test]
async fn test_null_and_numeric_attribution_is_accepted() {
    let app = build_test_app(&[]);
    let mut draft = jane();
    draft["funnelType"] = Value::Null;
    draft["utm_campaign"] = json!(2025);

    let resp = app
        .router
        .oneshot(post_json("/api/submit-quote", draft.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["funnel_type"], "term_life");
    assert_eq!(body["data"]["utm_campaign"], "2025");
    assert_eq!(app.store.all().await.len(), 1);
}

#[tokio::test]
async fn test_missing_required_field_is_rejected_without_a_write() {
    let app = build_test_app(&[]);
    let mut draft = jane();
    draft.as_object_mut().unwrap().remove("coverageAmount");

    let resp = app
        .router
        .clone()
        .oneshot(post_json("/api/submit-quote", draft.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("coverageAmount"));
    assert_eq!(body["fields"]["coverageAmount"], "This field is required.");
    assert_eq!(body["fields"].as_object().unwrap().len(), 1);

    assert_eq!(app.store.count().await.unwrap(), 0);
    assert!(app.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_fields_are_all_named() {
    let app = build_test_app(&[]);
    let mut draft = jane();
    draft["email"] = json!("jane@");
    draft["age"] = json!(17);
    draft["coverageAmount"] = json!(50000);

    let resp = app
        .router
        .oneshot(post_json("/api/submit-quote", draft.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    let fields = body["fields"].as_object().unwrap();
    let mut names: Vec<_> = fields.keys().cloned().collect();
    names.sort();
    assert_eq!(names, vec!["age", "coverageAmount", "email"]);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid fields:"));
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let app = build_test_app(&[]);

    let resp = app
        .router
        .clone()
        .oneshot(post_json("/api/submit-quote", "{\"firstName\": ".to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Malformed request body"));
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_funnel_is_a_bad_request() {
    let app = build_test_app(&[]);
    let mut draft = jane();
    draft["funnelType"] = json!("pet_insurance");

    let resp = app
        .router
        .oneshot(post_json("/api/submit-quote", draft.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_failing_side_effects_still_succeed() {
    let app = build_test_app(&["admin_notification", "crm_webhook"]);

    let resp = app
        .router
        .clone()
        .oneshot(post_json("/api/submit-quote", jane().to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(app.store.count().await.unwrap(), 1);
    assert_eq!(app.calls.lock().unwrap().len(), EFFECTS.len());
}

#[tokio::test]
async fn test_persistence_failure_is_500_and_runs_no_effects() {
    let calls = Calls::default();
    let router = broken_app(&calls);

    let resp = router
        .oneshot(post_json("/api/submit-quote", jane().to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Failed to record quote request");
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_stdi_submission_uses_its_own_table() {
    let app = build_test_app(&[]);
    let draft = json!({
        "firstName": "Sam",
        "lastName": "Lee",
        "email": "Sam.Lee@Example.com",
        "phone": "555.987.6543",
        "age": 41,
        "gender": "male",
        "healthStatus": "fair",
        "occupation": "Electrician",
        "annualIncome": "$72,000",
        "funnelType": "stdi",
        "utm_source": "google",
    });

    let resp = app
        .router
        .oneshot(post_json("/api/submit-quote", draft.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["email"], "sam.lee@example.com");
    assert_eq!(body["data"]["annual_income"], 72000);
    assert_eq!(body["data"]["tobacco_use"], "not_provided");
    assert_eq!(body["data"]["funnel_type"], "stdi");
    assert_eq!(body["data"]["source"], "stdi");
    assert_eq!(body["data"]["utm_source"], "google");
}

// ── CORS and diagnostics ───────────────────────────────────────

#[tokio::test]
async fn test_cors_preflight() {
    let app = build_test_app(&[]);

    let resp = app
        .router
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/submit-quote")
                .header(header::ORIGIN, "https://quotelinker.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    let methods = headers
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap();
    for method in ["GET", "POST", "OPTIONS"] {
        assert!(methods.contains(method), "{method} missing from {methods}");
    }
    let allowed = headers
        .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
        .unwrap()
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("content-type"));
    assert!(allowed.contains("authorization"));
}

#[tokio::test]
async fn test_bare_options_is_answered_by_cors_layer() {
    let app = build_test_app(&[]);

    let resp = app
        .router
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/submit-quote")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_diagnostics_reports_integrations() {
    let app = build_test_app(&[]);

    let resp = app.router.oneshot(get("/api/submit-quote")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["config"]["hasResendKey"], true);
    assert_eq!(body["config"]["hasZapierWebhook"], true);
    assert_eq!(body["config"]["hasSupportEmail"], false);
}

#[tokio::test]
async fn test_diagnostics_when_datastore_is_down() {
    let router = broken_app(&Calls::default());

    let resp = router.oneshot(get("/api/submit-quote")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["config"].is_object());
}

#[tokio::test]
async fn test_datastore_probe_returns_latest_lead() {
    let app = build_test_app(&[]);
    for _ in 0..2 {
        let resp = app
            .router
            .clone()
            .oneshot(post_json("/api/submit-quote", jane().to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app.router.oneshot(get("/api/test")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    let leads = body["leads"].as_array().unwrap();
    assert_eq!(leads.len(), 1);

    let latest = leads[0].as_object().unwrap();
    let mut keys: Vec<&str> = latest.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["created_at", "id"]);
    let stored = app.store.all().await;
    assert!(stored.iter().any(|r| latest["id"] == r.id.to_string()));
}

#[tokio::test]
async fn test_health_and_funnels() {
    let app = build_test_app(&[]);

    let resp = app.router.clone().oneshot(get("/api/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .router
        .clone()
        .oneshot(get("/api/funnels/whole-life"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["funnel"], "whole_life");
    assert_eq!(body["data"]["steps"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"]["steps"][0]["fields"][0]["field"], "firstName");

    let resp = app.router.clone().oneshot(get("/api/funnels")).await.unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), FunnelType::all().len());

    let resp = app.router.oneshot(get("/api/funnels/pet")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unmatched_path_without_static_dir_is_json_404() {
    let app = build_test_app(&[]);

    let resp = app.router.oneshot(get("/term-life")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["success"], false);
}

// ── Wizard over real HTTP ──────────────────────────────────────

#[tokio::test]
async fn test_wizard_submits_over_http() {
    let app = build_test_app(&[]);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let submitter = HttpSubmitter::new(&format!("http://{addr}")).unwrap();
    let mut wizard = QuoteWizard::for_landing_url(
        "https://quotelinker.com/term-life?utm_source=facebook&utm_campaign=spring",
        FunnelType::TermLife,
    );

    // Step 1 with a bad email stays put.
    for (field, value) in [
        (Field::FirstName, "Jane"),
        (Field::LastName, "Doe"),
        (Field::Email, "jane@"),
        (Field::Phone, "555-123-4567"),
    ] {
        wizard.update_field(field, value).unwrap();
    }
    let blocked = wizard.advance(&submitter).await.unwrap();
    assert!(matches!(blocked, Transition::Blocked { .. }));
    assert_eq!(wizard.step(), 0);

    wizard.update_field(Field::Email, "jane@example.com").unwrap();
    assert_eq!(wizard.advance(&submitter).await.unwrap(), Transition::Advanced { step: 1 });

    for (field, value) in [
        (Field::Age, "35"),
        (Field::Gender, "female"),
        (Field::HealthStatus, "good"),
        (Field::TobaccoUse, "never"),
    ] {
        wizard.update_field(field, value).unwrap();
    }
    assert_eq!(wizard.advance(&submitter).await.unwrap(), Transition::Advanced { step: 2 });

    wizard.update_field(Field::CoverageAmount, "250000").unwrap();
    wizard.update_field(Field::TermLength, "20").unwrap();
    let transition = wizard.advance(&submitter).await.unwrap();

    let Transition::Submitted(receipt) = transition else {
        panic!("expected submission, got {transition:?}");
    };
    let stored = app.store.all().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, receipt.lead_id);
    assert_eq!(stored[0].lead.utm_source.as_deref(), Some("facebook"));
    assert_eq!(stored[0].lead.utm_campaign.as_deref(), Some("spring"));
    assert!(wizard.is_submitted());
}

#[tokio::test]
async fn test_wizard_surfaces_server_rejection() {
    let calls = Calls::default();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = broken_app(&calls);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let submitter = HttpSubmitter::new(&format!("http://{addr}")).unwrap();
    let mut wizard = QuoteWizard::new(Attribution::for_funnel(FunnelType::WholeLife));
    for (field, value) in [
        (Field::FirstName, "Jane"),
        (Field::LastName, "Doe"),
        (Field::Email, "jane@example.com"),
        (Field::Phone, "5551234567"),
        (Field::Age, "60"),
        (Field::Gender, "female"),
        (Field::HealthStatus, "good"),
        (Field::TobaccoUse, "never"),
        (Field::CoverageAmount, "100000"),
    ] {
        wizard.update_field(field, value).unwrap();
    }
    for _ in 0..2 {
        wizard.advance(&submitter).await.unwrap();
    }
    assert!(wizard.is_final_step());

    let transition = wizard.advance(&submitter).await.unwrap();

    assert!(matches!(transition, Transition::SubmissionFailed(_)));
    assert!(!wizard.is_submitted());
    assert!(wizard.banner().is_some());
    assert!(calls.lock().unwrap().is_empty());
}
