//! Field Validator
//!
//! Pure per-field rules. A field is validated in isolation from every other
//! field; there are no cross-field rules.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_EMAIL: &str = "Please enter a valid email address";
pub const INVALID_PHONE: &str = "Please enter a valid phone number";
pub const AGE_OUT_OF_RANGE: &str = "Age must be between 18 and 85";
pub const COVERAGE_TOO_LOW: &str = "Coverage amount must be at least $100,000";
pub const INVALID_INCOME: &str = "Please enter a valid annual income";

pub const MIN_AGE: i64 = 18;
pub const MAX_AGE: i64 = 85;
pub const MIN_COVERAGE: i64 = 100_000;
pub const PHONE_DIGITS: usize = 10;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Every user-editable field a quote form can collect.
///
/// The serde name is the camelCase JSON key used on the wire and in
/// validation error maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Phone,
    DateOfBirth,
    Age,
    Gender,
    Height,
    Weight,
    TobaccoUse,
    HealthStatus,
    InsuranceType,
    CoverageAmount,
    TermLength,
    Occupation,
    AnnualIncome,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::FirstName,
        Field::LastName,
        Field::Email,
        Field::Phone,
        Field::DateOfBirth,
        Field::Age,
        Field::Gender,
        Field::Height,
        Field::Weight,
        Field::TobaccoUse,
        Field::HealthStatus,
        Field::InsuranceType,
        Field::CoverageAmount,
        Field::TermLength,
        Field::Occupation,
        Field::AnnualIncome,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            Field::FirstName => "firstName",
            Field::LastName => "lastName",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::DateOfBirth => "dateOfBirth",
            Field::Age => "age",
            Field::Gender => "gender",
            Field::Height => "height",
            Field::Weight => "weight",
            Field::TobaccoUse => "tobaccoUse",
            Field::HealthStatus => "healthStatus",
            Field::InsuranceType => "insuranceType",
            Field::CoverageAmount => "coverageAmount",
            Field::TermLength => "termLength",
            Field::Occupation => "occupation",
            Field::AnnualIncome => "annualIncome",
        }
    }

    /// Resolve a wire name. Snake-case column names are accepted too, so
    /// `coverage_amount` and `coverageAmount` both resolve.
    pub fn parse(name: &str) -> Option<Field> {
        let key = name.trim().replace('_', "").to_ascii_lowercase();
        Field::ALL
            .into_iter()
            .find(|f| f.wire_name().to_ascii_lowercase() == key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Validate one required field.
///
/// Returns `None` when the value is acceptable, otherwise the message to show
/// next to the field.
pub fn validate(field: Field, raw: &str) -> Option<&'static str> {
    let value = raw.trim();
    if value.is_empty() {
        return Some(REQUIRED);
    }

    match field {
        Field::Email if !EMAIL_RE.is_match(value) => Some(INVALID_EMAIL),
        Field::Phone if phone_digits(value).len() != PHONE_DIGITS => Some(INVALID_PHONE),
        Field::Age => match parse_whole_number(value) {
            Some(age) if (MIN_AGE..=MAX_AGE).contains(&age) => None,
            _ => Some(AGE_OUT_OF_RANGE),
        },
        Field::CoverageAmount => match parse_whole_number(value) {
            Some(amount) if amount >= MIN_COVERAGE => None,
            _ => Some(COVERAGE_TOO_LOW),
        },
        Field::AnnualIncome => match parse_whole_number(value) {
            Some(income) if income >= 0 => None,
            _ => Some(INVALID_INCOME),
        },
        _ => None,
    }
}

/// Validate by wire name. Names outside [`Field`] only get the presence check.
pub fn validate_named(name: &str, raw: &str) -> Option<&'static str> {
    match Field::parse(name) {
        Some(field) => validate(field, raw),
        None if raw.trim().is_empty() => Some(REQUIRED),
        None => None,
    }
}

/// Digit-only projection of a phone number: `(555) 123-4567` -> `5551234567`.
pub fn phone_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Parse a whole number, tolerating currency formatting (`$250,000`).
pub fn parse_whole_number(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ','))
        .collect();
    cleaned.parse().ok()
}
