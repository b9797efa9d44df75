//! Draft record and attribution metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::field::Field;
use crate::funnel::FunnelType;

/// Field -> message. Empty means valid.
pub type ErrorMap = BTreeMap<Field, String>;

/// Traffic-source tags captured when the form loads. Not user-editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attribution {
    #[serde(rename = "funnelType")]
    pub funnel_type: FunnelType,
    /// Free-form source tag, e.g. the form or landing page name
    #[serde(deserialize_with = "lenient_string")]
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_tag")]
    pub utm_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_tag")]
    pub utm_medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_tag")]
    pub utm_campaign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_tag")]
    pub utm_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_tag")]
    pub utm_content: Option<String>,
}

impl Attribution {
    pub fn for_funnel(funnel_type: FunnelType) -> Self {
        Self {
            funnel_type,
            ..Self::default()
        }
    }

    /// Read `utm_*` and `source` query parameters from the landing URL.
    ///
    /// An unparseable URL yields bare attribution for the funnel.
    pub fn from_landing_url(landing_url: &str, funnel_type: FunnelType) -> Self {
        let mut attribution = Self::for_funnel(funnel_type);
        let Ok(url) = Url::parse(landing_url) else {
            tracing::debug!("Landing URL is not absolute, skipping attribution: {landing_url}");
            return attribution;
        };

        for (key, value) in url.query_pairs() {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "utm_source" => &mut attribution.utm_source,
                "utm_medium" => &mut attribution.utm_medium,
                "utm_campaign" => &mut attribution.utm_campaign,
                "utm_term" => &mut attribution.utm_term,
                "utm_content" => &mut attribution.utm_content,
                "source" => {
                    attribution.source = value.to_string();
                    continue;
                }
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        attribution
    }
}

/// In-progress form data, and the JSON body of a quote submission.
///
/// Every user field is kept as the raw string the visitor typed. Absent keys
/// deserialize as empty and numbers are accepted where strings are expected,
/// so the server can report missing fields itself instead of failing the
/// parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub first_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub last_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub phone: String,
    #[serde(deserialize_with = "lenient_string")]
    pub date_of_birth: String,
    #[serde(deserialize_with = "lenient_string")]
    pub age: String,
    #[serde(deserialize_with = "lenient_string")]
    pub gender: String,
    #[serde(deserialize_with = "lenient_string")]
    pub height: String,
    #[serde(deserialize_with = "lenient_string")]
    pub weight: String,
    #[serde(deserialize_with = "lenient_string")]
    pub tobacco_use: String,
    #[serde(deserialize_with = "lenient_string")]
    pub health_status: String,
    #[serde(deserialize_with = "lenient_string")]
    pub insurance_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub coverage_amount: String,
    #[serde(deserialize_with = "lenient_string")]
    pub term_length: String,
    #[serde(deserialize_with = "lenient_string")]
    pub occupation: String,
    #[serde(deserialize_with = "lenient_string")]
    pub annual_income: String,
    #[serde(flatten)]
    pub attribution: Attribution,
}

impl DraftRecord {
    pub fn new(attribution: Attribution) -> Self {
        Self {
            attribution,
            ..Self::default()
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::Email => &self.email,
            Field::Phone => &self.phone,
            Field::DateOfBirth => &self.date_of_birth,
            Field::Age => &self.age,
            Field::Gender => &self.gender,
            Field::Height => &self.height,
            Field::Weight => &self.weight,
            Field::TobaccoUse => &self.tobacco_use,
            Field::HealthStatus => &self.health_status,
            Field::InsuranceType => &self.insurance_type,
            Field::CoverageAmount => &self.coverage_amount,
            Field::TermLength => &self.term_length,
            Field::Occupation => &self.occupation,
            Field::AnnualIncome => &self.annual_income,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::FirstName => &mut self.first_name,
            Field::LastName => &mut self.last_name,
            Field::Email => &mut self.email,
            Field::Phone => &mut self.phone,
            Field::DateOfBirth => &mut self.date_of_birth,
            Field::Age => &mut self.age,
            Field::Gender => &mut self.gender,
            Field::Height => &mut self.height,
            Field::Weight => &mut self.weight,
            Field::TobaccoUse => &mut self.tobacco_use,
            Field::HealthStatus => &mut self.health_status,
            Field::InsuranceType => &mut self.insurance_type,
            Field::CoverageAmount => &mut self.coverage_amount,
            Field::TermLength => &mut self.term_length,
            Field::Occupation => &mut self.occupation,
            Field::AnnualIncome => &mut self.annual_income,
        };
        *slot = value.into();
    }

    /// Builder-style [`set`](Self::set), handy for fixtures.
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }
}

/// Accept a string, number or bool; `null` and absent become empty.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(Value::Bool(true)) => "yes".to_string(),
        Some(Value::Bool(false)) => "no".to_string(),
        Some(other) => other.to_string(),
    })
}

/// [`lenient_string`] for optional tags: blank and `null` become `None`.
fn lenient_tag<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let tag = lenient_string(deserializer)?;
    Ok((!tag.trim().is_empty()).then_some(tag))
}
