//! Lead records and server-side normalization.
//!
//! `normalize` is the authoritative gate between a submitted [`DraftRecord`]
//! and a row in the `leads` table. It re-runs every rule of the submission's
//! funnel (client validation is never trusted) and then coerces the raw
//! strings into their stored types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::draft::{DraftRecord, ErrorMap};
use crate::field::{parse_whole_number, phone_digits, Field};
use crate::funnel::FunnelType;

/// Status every lead is created with. Downstream CRM workflows own later values.
pub const STATUS_NEW: &str = "new";

pub const OCCUPATION_FALLBACK: &str = "Not Provided";
pub const TOBACCO_FALLBACK: &str = "not_provided";
pub const ANNUAL_INCOME_FALLBACK: i64 = 0;

pub const INVALID_TERM_LENGTH: &str = "Please select a valid term length";

/// A validated, normalized lead that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLead {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub tobacco_use: String,
    pub health_status: Option<String>,
    pub insurance_type: String,
    pub coverage_amount: Option<i64>,
    pub term_length: Option<i32>,
    pub occupation: String,
    pub annual_income: i64,
    pub source: String,
    pub funnel_type: FunnelType,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
}

/// The durable lead row: a [`NewLead`] plus what the datastore assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub lead: NewLead,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl LeadRecord {
    pub fn new(id: Uuid, lead: NewLead, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            lead,
            status: STATUS_NEW.to_string(),
            created_at,
        }
    }
}

/// Re-validate and normalize a submitted draft.
///
/// Every failing field is reported, not just the first one.
pub fn normalize(draft: &DraftRecord) -> Result<NewLead, ErrorMap> {
    let funnel = draft.attribution.funnel_type;
    let mut errors = funnel.spec().validate(draft);

    // Fields outside the funnel's table are still checked when supplied.
    for field in Field::ALL {
        if funnel.spec().rule(field).is_none() && !draft.get(field).trim().is_empty() {
            if let Some(msg) = crate::field::validate(field, draft.get(field)) {
                errors.insert(field, msg.to_string());
            }
        }
    }

    let term_length = match text(draft.get(Field::TermLength)) {
        None => None,
        Some(raw) => match parse_whole_number(&raw).and_then(|n| i32::try_from(n).ok()) {
            Some(years) if years > 0 => Some(years),
            _ => {
                errors
                    .entry(Field::TermLength)
                    .or_insert_with(|| INVALID_TERM_LENGTH.to_string());
                None
            }
        },
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    let attribution = &draft.attribution;
    Ok(NewLead {
        first_name: draft.first_name.trim().to_string(),
        last_name: draft.last_name.trim().to_string(),
        email: draft.email.trim().to_lowercase(),
        phone: phone_digits(&draft.phone),
        date_of_birth: text(&draft.date_of_birth),
        age: whole(&draft.age).and_then(|n| i32::try_from(n).ok()),
        gender: text(&draft.gender).map(|g| g.to_lowercase()),
        height: text(&draft.height),
        weight: text(&draft.weight),
        tobacco_use: text(&draft.tobacco_use)
            .map(|t| t.to_lowercase())
            .unwrap_or_else(|| TOBACCO_FALLBACK.to_string()),
        health_status: text(&draft.health_status).map(|h| h.to_lowercase()),
        insurance_type: text(&draft.insurance_type)
            .unwrap_or_else(|| funnel.insurance_type().to_string()),
        coverage_amount: whole(&draft.coverage_amount),
        term_length,
        occupation: text(&draft.occupation).unwrap_or_else(|| OCCUPATION_FALLBACK.to_string()),
        annual_income: whole(&draft.annual_income).unwrap_or(ANNUAL_INCOME_FALLBACK),
        source: text(&attribution.source).unwrap_or_else(|| funnel.slug().to_string()),
        funnel_type: funnel,
        utm_source: attribution.utm_source.as_deref().and_then(text),
        utm_medium: attribution.utm_medium.as_deref().and_then(text),
        utm_campaign: attribution.utm_campaign.as_deref().and_then(text),
        utm_term: attribution.utm_term.as_deref().and_then(text),
        utm_content: attribution.utm_content.as_deref().and_then(text),
    })
}

fn text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn whole(raw: &str) -> Option<i64> {
    text(raw).and_then(|t| parse_whole_number(&t))
}
