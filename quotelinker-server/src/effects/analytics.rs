//! `quote_submitted` event via the GA4 Measurement Protocol.

use async_trait::async_trait;
use quotelinker_core::LeadRecord;
use serde_json::{json, Map, Value};
use url::Url;

use super::{ensure_success, SideEffect};
use crate::config::AnalyticsConfig;

pub const GA4_COLLECT_URL: &str = "https://www.google-analytics.com/mp/collect";
pub const EVENT_NAME: &str = "quote_submitted";
pub const CLIENT_ID: &str = "server_api";

pub struct AnalyticsEvent {
    client: reqwest::Client,
    endpoint: Url,
}

impl AnalyticsEvent {
    pub fn new(client: reqwest::Client, config: &AnalyticsConfig) -> Result<Self, url::ParseError> {
        let endpoint = Url::parse_with_params(
            GA4_COLLECT_URL,
            &[
                ("measurement_id", config.measurement_id.as_str()),
                ("api_secret", config.api_secret.as_str()),
            ],
        )?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl SideEffect for AnalyticsEvent {
    fn name(&self) -> &'static str {
        "analytics_event"
    }

    async fn run(&self, lead: &LeadRecord) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&event_body(lead))
            .send()
            .await?;
        ensure_success("ga4", response).await?;
        Ok(())
    }
}

pub fn event_body(record: &LeadRecord) -> Value {
    let lead = &record.lead;
    let mut params = Map::new();
    params.insert("funnel_type".into(), json!(lead.funnel_type.slug()));
    params.insert("source".into(), json!(lead.source));
    params.insert("insurance_type".into(), json!(lead.insurance_type));
    if let Some(amount) = lead.coverage_amount {
        params.insert("coverage_amount".into(), json!(amount));
    }
    if let Some(years) = lead.term_length {
        params.insert("term_length".into(), json!(years));
    }
    for (key, value) in [
        ("utm_source", &lead.utm_source),
        ("utm_medium", &lead.utm_medium),
        ("utm_campaign", &lead.utm_campaign),
        ("utm_term", &lead.utm_term),
        ("utm_content", &lead.utm_content),
    ] {
        if let Some(value) = value {
            params.insert(key.into(), json!(value));
        }
    }

    json!({
        "client_id": CLIENT_ID,
        "events": [{ "name": EVENT_NAME, "params": params }],
    })
}
