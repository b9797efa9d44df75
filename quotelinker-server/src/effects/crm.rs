//! Lead forward to the CRM through a Zapier catch hook.

use async_trait::async_trait;
use quotelinker_core::LeadRecord;
use serde_json::{json, Value};
use url::Url;

use super::{ensure_success, NotifyError, SideEffect};

pub struct CrmWebhook {
    client: reqwest::Client,
    url: Url,
}

impl CrmWebhook {
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }

    async fn forward(&self, lead: &LeadRecord) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&webhook_payload(lead))
            .send()
            .await?;
        ensure_success("crm webhook", response).await?;
        Ok(())
    }
}

#[async_trait]
impl SideEffect for CrmWebhook {
    fn name(&self) -> &'static str {
        "crm_webhook"
    }

    async fn run(&self, lead: &LeadRecord) -> anyhow::Result<()> {
        self.forward(lead).await?;
        Ok(())
    }
}

/// `{"leads": {...}}` with camelCase keys, the shape the Zap maps into the CRM.
pub fn webhook_payload(record: &LeadRecord) -> Value {
    let lead = &record.lead;
    json!({
        "leads": {
            "leadId": record.id,
            "firstName": lead.first_name,
            "lastName": lead.last_name,
            "email": lead.email,
            "phone": lead.phone,
            "dateOfBirth": lead.date_of_birth,
            "age": lead.age,
            "gender": lead.gender,
            "height": lead.height,
            "weight": lead.weight,
            "healthStatus": lead.health_status,
            "tobaccoUse": lead.tobacco_use,
            "insuranceType": lead.insurance_type,
            "coverageAmount": lead.coverage_amount,
            "termLength": lead.term_length,
            "occupation": lead.occupation,
            "annualIncome": lead.annual_income,
            "source": lead.source,
            "funnelType": lead.funnel_type.slug(),
            "utmSource": lead.utm_source,
            "utmMedium": lead.utm_medium,
            "utmCampaign": lead.utm_campaign,
            "utmTerm": lead.utm_term,
            "utmContent": lead.utm_content,
            "status": record.status,
            "createdAt": record.created_at,
        }
    })
}
