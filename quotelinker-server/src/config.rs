//! Environment-driven configuration.
//!
//! Reads (optionally from `.env`):
//!   DATABASE_URL                     Postgres connection string (required)
//!   DATABASE_POOL_SIZE               max pooled connections (default: 10)
//!   QUOTELINKER_BIND_ADDR            listen address (default: 0.0.0.0:3000)
//!   QUOTELINKER_STATIC_DIR           static page directory served as fallback
//!   QUOTELINKER_OUTBOUND_TIMEOUT_MS  per side-effect timeout (default: 5000)
//!   QUOTELINKER_SIDE_EFFECTS         `detached` (default) or `inline`
//!   RESEND_API_KEY, EMAIL_FROM       enable applicant confirmation email
//!   EMAIL_TO                         additionally enable the admin notification
//!   SUPPORT_EMAIL                    contact address quoted in confirmations
//!   ZAPIER_WEBHOOK_URL               enable the CRM webhook forward
//!   GA4_MEASUREMENT_ID, GA4_API_SECRET  enable the analytics event
//!
//! A missing optional credential disables that one integration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::effects::DispatchMode;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_POOL_SIZE: u32 = 10;
pub const DEFAULT_OUTBOUND_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: String,
    pub from: String,
    /// Admin inbox; `None` disables the admin notification only
    pub admin_to: Option<String>,
    pub support_address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub measurement_id: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database: DatabaseConfig,
    pub static_dir: Option<PathBuf>,
    pub outbound_timeout: Duration,
    pub dispatch: DispatchMode,
    pub email: Option<EmailConfig>,
    pub crm_webhook_url: Option<Url>,
    pub analytics: Option<AnalyticsConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database = DatabaseConfig {
            url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            max_connections: parse_or("DATABASE_POOL_SIZE", get("DATABASE_POOL_SIZE"), DEFAULT_POOL_SIZE)?,
        };

        let outbound_timeout = Duration::from_millis(parse_or(
            "QUOTELINKER_OUTBOUND_TIMEOUT_MS",
            get("QUOTELINKER_OUTBOUND_TIMEOUT_MS"),
            DEFAULT_OUTBOUND_TIMEOUT_MS,
        )?);

        let dispatch = match get("QUOTELINKER_SIDE_EFFECTS") {
            None => DispatchMode::default(),
            Some(raw) => DispatchMode::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "QUOTELINKER_SIDE_EFFECTS",
                value: raw.clone(),
                reason: "expected 'detached' or 'inline'".to_string(),
            })?,
        };

        let email = match (get("RESEND_API_KEY"), get("EMAIL_FROM")) {
            (Some(api_key), Some(from)) => Some(EmailConfig {
                api_key,
                from,
                admin_to: get("EMAIL_TO"),
                support_address: get("SUPPORT_EMAIL"),
            }),
            _ => None,
        };

        let crm_webhook_url = get("ZAPIER_WEBHOOK_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| ConfigError::Invalid {
                    key: "ZAPIER_WEBHOOK_URL",
                    value: raw.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let analytics = match (get("GA4_MEASUREMENT_ID"), get("GA4_API_SECRET")) {
            (Some(measurement_id), Some(api_secret)) => Some(AnalyticsConfig {
                measurement_id,
                api_secret,
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr: get("QUOTELINKER_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database,
            static_dir: get("QUOTELINKER_STATIC_DIR").map(PathBuf::from),
            outbound_timeout,
            dispatch,
            email,
            crm_webhook_url,
            analytics,
        })
    }

    /// Which optional integrations are live, for startup logs and diagnostics.
    pub fn integrations(&self) -> Integrations {
        Integrations {
            has_resend_key: self.email.is_some(),
            has_admin_email: self.email.as_ref().is_some_and(|e| e.admin_to.is_some()),
            has_support_email: self
                .email
                .as_ref()
                .is_some_and(|e| e.support_address.is_some()),
            has_zapier_webhook: self.crm_webhook_url.is_some(),
            has_analytics: self.analytics.is_some(),
        }
    }
}

/// Presence flags reported by `GET /api/submit-quote`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Integrations {
    pub has_resend_key: bool,
    pub has_zapier_webhook: bool,
    pub has_admin_email: bool,
    pub has_support_email: bool,
    pub has_analytics: bool,
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

/// Hide the password component before a connection string reaches the logs.
pub fn mask_database_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if parsed.password().is_some() => {
            let mut masked = parsed.clone();
            let _ = masked.set_password(Some("***"));
            masked.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => "***".to_string(),
    }
}
