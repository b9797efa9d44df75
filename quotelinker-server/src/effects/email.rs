//! Notification emails sent through the Resend HTTP API.

use std::sync::Arc;

use async_trait::async_trait;
use handlebars::{Handlebars, RenderError, TemplateError};
use quotelinker_core::LeadRecord;
use serde::Serialize;
use uuid::Uuid;

use super::{ensure_success, NotifyError, SideEffect};

pub const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

pub const ADMIN_SUBJECT: &str = "New Quote Request";
pub const APPLICANT_SUBJECT: &str = "Your Quote Request Has Been Received";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl ResendMailer {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            endpoint: RESEND_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await?;
        ensure_success("resend", response).await?;
        Ok(())
    }
}

/// "New Quote Request" to the configured admin inbox.
pub struct AdminNotification {
    mailer: Arc<dyn Mailer>,
    templates: EmailTemplates,
    from: String,
    to: String,
}

impl AdminNotification {
    pub fn new(mailer: Arc<dyn Mailer>, templates: EmailTemplates, from: String, to: String) -> Self {
        Self {
            mailer,
            templates,
            from,
            to,
        }
    }
}

#[async_trait]
impl SideEffect for AdminNotification {
    fn name(&self) -> &'static str {
        "admin_notification"
    }

    async fn run(&self, lead: &LeadRecord) -> anyhow::Result<()> {
        let message = self.templates.admin_message(&self.from, &self.to, lead)?;
        self.mailer.send(&message).await?;
        Ok(())
    }
}

/// Confirmation to the applicant. Skipped when the lead has no email.
pub struct ApplicantConfirmation {
    mailer: Arc<dyn Mailer>,
    templates: EmailTemplates,
    from: String,
    contact: String,
}

impl ApplicantConfirmation {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        templates: EmailTemplates,
        from: String,
        contact: String,
    ) -> Self {
        Self {
            mailer,
            templates,
            from,
            contact,
        }
    }
}

#[async_trait]
impl SideEffect for ApplicantConfirmation {
    fn name(&self) -> &'static str {
        "applicant_confirmation"
    }

    async fn run(&self, lead: &LeadRecord) -> anyhow::Result<()> {
        if lead.lead.email.trim().is_empty() {
            tracing::debug!(lead_id = %lead.id, "No applicant email; confirmation skipped");
            return Ok(());
        }
        let message = self.templates.applicant_message(&self.from, &self.contact, lead)?;
        self.mailer.send(&message).await?;
        Ok(())
    }
}

const ADMIN_TEMPLATE: &str = "admin_notification";
const APPLICANT_TEMPLATE: &str = "applicant_confirmation";

const ADMIN_HTML: &str = r#"<h2>New Quote Request Received</h2>
{{#each rows}}
<p><strong>{{label}}:</strong> {{value}}</p>
{{/each}}
<p><strong>Lead ID:</strong> {{lead_id}}</p>
"#;

const APPLICANT_HTML: &str = r#"<h2>Thank You for Your Quote Request</h2>
<p>Dear {{first_name}},</p>
<p>We have received your quote request and will be in touch shortly with personalized options for your coverage.</p>
<p>Here's a summary of your request:</p>
<ul>
<li>Insurance Type: {{insurance_type}}</li>
<li>Coverage Amount: {{coverage}}</li>
<li>Term Length: {{term}}</li>
</ul>
<p>If you have any questions, please contact us at {{contact}}.</p>
<p>Best regards,<br>The QuoteLinker Team</p>
"#;

/// The two notification bodies, compiled once and shared by both effects.
///
/// `{{…}}` expressions are HTML-escaped by the engine, so lead text is safe
/// to interpolate.
#[derive(Clone)]
pub struct EmailTemplates {
    handlebars: Arc<Handlebars<'static>>,
}

#[derive(Serialize)]
struct Row {
    label: &'static str,
    value: String,
}

#[derive(Serialize)]
struct AdminContext {
    rows: Vec<Row>,
    lead_id: Uuid,
}

#[derive(Serialize)]
struct ApplicantContext<'a> {
    first_name: &'a str,
    insurance_type: &'a str,
    coverage: String,
    term: String,
    contact: &'a str,
}

impl EmailTemplates {
    pub fn new() -> Result<Self, TemplateError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_template_string(ADMIN_TEMPLATE, ADMIN_HTML)?;
        handlebars.register_template_string(APPLICANT_TEMPLATE, APPLICANT_HTML)?;
        Ok(Self {
            handlebars: Arc::new(handlebars),
        })
    }

    pub fn admin_message(
        &self,
        from: &str,
        to: &str,
        record: &LeadRecord,
    ) -> Result<EmailMessage, RenderError> {
        let lead = &record.lead;
        let rows = [
            ("Name", format!("{} {}", lead.first_name, lead.last_name)),
            ("Email", lead.email.clone()),
            ("Phone", lead.phone.clone()),
            ("Date of Birth", or_blank(&lead.date_of_birth)),
            ("Age", lead.age.map(|a| a.to_string()).unwrap_or_default()),
            ("Gender", or_blank(&lead.gender)),
            ("Health Status", or_blank(&lead.health_status)),
            ("Tobacco Use", lead.tobacco_use.clone()),
            ("Insurance Type", lead.insurance_type.clone()),
            ("Coverage Amount", coverage(lead.coverage_amount)),
            ("Term Length", term(lead.term_length)),
            ("Occupation", lead.occupation.clone()),
            ("Annual Income", dollars(lead.annual_income)),
            ("Source", lead.source.clone()),
        ];
        let context = AdminContext {
            rows: rows
                .into_iter()
                .map(|(label, value)| Row { label, value })
                .collect(),
            lead_id: record.id,
        };

        Ok(EmailMessage {
            from: from.to_string(),
            to: to.to_string(),
            subject: ADMIN_SUBJECT.to_string(),
            html: self.handlebars.render(ADMIN_TEMPLATE, &context)?,
        })
    }

    pub fn applicant_message(
        &self,
        from: &str,
        contact: &str,
        record: &LeadRecord,
    ) -> Result<EmailMessage, RenderError> {
        let lead = &record.lead;
        let context = ApplicantContext {
            first_name: &lead.first_name,
            insurance_type: &lead.insurance_type,
            coverage: coverage(lead.coverage_amount),
            term: term(lead.term_length),
            contact,
        };

        Ok(EmailMessage {
            from: from.to_string(),
            to: lead.email.clone(),
            subject: APPLICANT_SUBJECT.to_string(),
            html: self.handlebars.render(APPLICANT_TEMPLATE, &context)?,
        })
    }
}

fn or_blank(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn coverage(amount: Option<i64>) -> String {
    amount.map(dollars).unwrap_or_else(|| "Not specified".to_string())
}

fn term(years: Option<i32>) -> String {
    years
        .map(|y| format!("{y} years"))
        .unwrap_or_else(|| "Not specified".to_string())
}

/// `250000` -> `$250,000`
fn dollars(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}
