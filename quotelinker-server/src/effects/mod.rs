//! Best-effort side effects fired after a lead is persisted.
//!
//! Every integration (emails, CRM webhook, analytics) is a [`SideEffect`] in
//! an ordered list. [`SideEffects::dispatch`] runs each one under the same
//! timeout and logs the outcome. Nothing here can fail a submission.

pub mod analytics;
pub mod crm;
pub mod email;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures::future::join_all;
use quotelinker_core::LeadRecord;
use thiserror::Error;
use tokio_util::task::TaskTracker;

use crate::config::ServerConfig;

pub use analytics::AnalyticsEvent;
pub use crm::CrmWebhook;
pub use email::{
    AdminNotification, ApplicantConfirmation, EmailMessage, EmailTemplates, Mailer, ResendMailer,
};

#[async_trait]
pub trait SideEffect: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    async fn run(&self, lead: &LeadRecord) -> anyhow::Result<()>;
}

/// Error from an outbound integration call.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} rejected the request with status {status}: {body}")]
    Rejected {
        service: &'static str,
        status: u16,
        body: String,
    },
}

/// Turn a non-2xx response into [`NotifyError::Rejected`].
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(NotifyError::Rejected {
        service,
        status: status.as_u16(),
        body,
    })
}

/// When side effects run relative to the HTTP response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// Spawned on the runtime; the response never waits on third parties.
    #[default]
    Detached,
    /// Awaited before the response is sent.
    Inline,
}

impl DispatchMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detached" | "background" => Some(Self::Detached),
            "inline" => Some(Self::Inline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectStatus {
    Completed,
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectOutcome {
    pub name: &'static str,
    pub status: EffectStatus,
}

#[derive(Clone)]
pub struct SideEffects {
    tasks: Vec<Arc<dyn SideEffect>>,
    timeout: Duration,
    mode: DispatchMode,
    /// Detached runs still in flight; shared by every clone.
    in_flight: TaskTracker,
}

impl SideEffects {
    pub fn new(timeout: Duration, mode: DispatchMode) -> Self {
        Self {
            tasks: Vec::new(),
            timeout,
            mode,
            in_flight: TaskTracker::new(),
        }
    }

    /// Append a task. Tasks are started in the order they were added.
    pub fn with(mut self, task: impl SideEffect + 'static) -> Self {
        self.tasks.push(Arc::new(task));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Build the production task list. An integration whose credentials are
    /// missing is left out and logged once here.
    pub fn from_config(config: &ServerConfig, client: reqwest::Client) -> anyhow::Result<Self> {
        let mut effects = Self::new(config.outbound_timeout, config.dispatch);

        match &config.email {
            Some(email) => {
                let templates = EmailTemplates::new().context("Failed to compile email templates")?;
                let mailer: Arc<dyn Mailer> =
                    Arc::new(ResendMailer::new(client.clone(), email.api_key.clone()));

                match &email.admin_to {
                    Some(to) => {
                        effects = effects.with(AdminNotification::new(
                            mailer.clone(),
                            templates.clone(),
                            email.from.clone(),
                            to.clone(),
                        ));
                    }
                    None => tracing::warn!("EMAIL_TO not set; admin notification disabled"),
                }

                let contact = email
                    .support_address
                    .clone()
                    .unwrap_or_else(|| email.from.clone());
                effects = effects.with(ApplicantConfirmation::new(
                    mailer,
                    templates,
                    email.from.clone(),
                    contact,
                ));
            }
            None => tracing::warn!("RESEND_API_KEY or EMAIL_FROM not set; emails disabled"),
        }

        match &config.crm_webhook_url {
            Some(url) => effects = effects.with(CrmWebhook::new(client.clone(), url.clone())),
            None => tracing::warn!("ZAPIER_WEBHOOK_URL not set; CRM forward disabled"),
        }

        match &config.analytics {
            Some(analytics) => match AnalyticsEvent::new(client, analytics) {
                Ok(event) => effects = effects.with(event),
                Err(e) => tracing::warn!(error = %e, "Invalid GA4 settings; analytics disabled"),
            },
            None => tracing::warn!("GA4_MEASUREMENT_ID or GA4_API_SECRET not set; analytics disabled"),
        }

        tracing::info!(effects = ?effects.names(), mode = ?effects.mode, "Side effects configured");
        Ok(effects)
    }

    /// Fire every task for a persisted lead.
    ///
    /// Inline mode returns the outcomes; detached mode spawns the work and
    /// returns an empty list immediately. Spawned runs are tracked until
    /// [`drain`](Self::drain) is awaited.
    pub async fn dispatch(&self, lead: &LeadRecord) -> Vec<EffectOutcome> {
        if self.tasks.is_empty() {
            return Vec::new();
        }
        match self.mode {
            DispatchMode::Inline => run_all(&self.tasks, lead, self.timeout).await,
            DispatchMode::Detached => {
                let tasks = self.tasks.clone();
                let lead = lead.clone();
                let timeout = self.timeout;
                self.in_flight.spawn(async move {
                    run_all(&tasks, &lead, timeout).await;
                });
                Vec::new()
            }
        }
    }

    /// Stop accepting detached runs and wait for those in flight. Called once
    /// the server has stopped taking requests.
    pub async fn drain(&self) {
        self.in_flight.close();
        if !self.in_flight.is_empty() {
            tracing::info!(pending = self.in_flight.len(), "Waiting for side effects to finish");
        }
        self.in_flight.wait().await;
    }
}

async fn run_all(
    tasks: &[Arc<dyn SideEffect>],
    lead: &LeadRecord,
    timeout: Duration,
) -> Vec<EffectOutcome> {
    join_all(tasks.iter().map(|task| run_guarded(task.as_ref(), lead, timeout))).await
}

async fn run_guarded(task: &dyn SideEffect, lead: &LeadRecord, timeout: Duration) -> EffectOutcome {
    let name = task.name();
    let status = match tokio::time::timeout(timeout, task.run(lead)).await {
        Ok(Ok(())) => {
            tracing::debug!(effect = name, lead_id = %lead.id, "Side effect completed");
            EffectStatus::Completed
        }
        Ok(Err(e)) => {
            let message = format!("{e:#}");
            tracing::warn!(effect = name, lead_id = %lead.id, error = %message, "Side effect failed");
            EffectStatus::Failed(message)
        }
        Err(_) => {
            tracing::warn!(
                effect = name,
                lead_id = %lead.id,
                timeout_ms = timeout.as_millis() as u64,
                "Side effect timed out"
            );
            EffectStatus::TimedOut
        }
    };
    EffectOutcome { name, status }
}
