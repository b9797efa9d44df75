//! Funnel table
//!
//! Every product page runs the same three-step wizard; what differs is which
//! fields each step collects and which of them are required. That difference
//! lives here as data rather than as per-page form code.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::draft::{DraftRecord, ErrorMap};
use crate::field::{validate, Field};

/// The product page a submission originated from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "Option<String>")]
pub enum FunnelType {
    #[default]
    TermLife,
    WholeLife,
    PermanentLife,
    /// Short-term disability income
    Stdi,
    SupplementalHealth,
}

impl FunnelType {
    pub fn all() -> &'static [FunnelType] {
        &[
            FunnelType::TermLife,
            FunnelType::WholeLife,
            FunnelType::PermanentLife,
            FunnelType::Stdi,
            FunnelType::SupplementalHealth,
        ]
    }

    pub fn slug(self) -> &'static str {
        match self {
            FunnelType::TermLife => "term_life",
            FunnelType::WholeLife => "whole_life",
            FunnelType::PermanentLife => "permanent_life",
            FunnelType::Stdi => "stdi",
            FunnelType::SupplementalHealth => "supplemental_health",
        }
    }

    /// Insurance type recorded when the submission does not name one.
    pub fn insurance_type(self) -> &'static str {
        match self {
            FunnelType::TermLife => "Term Life",
            FunnelType::WholeLife => "Whole Life",
            FunnelType::PermanentLife => "Permanent Life",
            FunnelType::Stdi => "Short-Term Disability",
            FunnelType::SupplementalHealth => "Supplemental Health",
        }
    }

    /// Lenient lookup: page paths (`term-life`), slugs and a few aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "termlife" | "term" | "quote" => Some(FunnelType::TermLife),
            "wholelife" | "whole" => Some(FunnelType::WholeLife),
            "permanentlife" | "permanent" => Some(FunnelType::PermanentLife),
            "stdi" | "disability" | "shorttermdisability" => Some(FunnelType::Stdi),
            "supplementalhealth" | "supplemental" => Some(FunnelType::SupplementalHealth),
            _ => None,
        }
    }

    pub fn spec(self) -> &'static FunnelSpec {
        match self {
            FunnelType::TermLife => &TERM_LIFE,
            FunnelType::WholeLife => &WHOLE_LIFE,
            FunnelType::PermanentLife => &PERMANENT_LIFE,
            FunnelType::Stdi => &STDI,
            FunnelType::SupplementalHealth => &SUPPLEMENTAL_HEALTH,
        }
    }
}

/// `null`, blank and absent all mean the default funnel.
impl TryFrom<Option<String>> for FunnelType {
    type Error = String;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        match value {
            Some(value) if !value.trim().is_empty() => {
                FunnelType::parse(&value).ok_or_else(|| format!("unknown funnel type '{value}'"))
            }
            _ => Ok(FunnelType::default()),
        }
    }
}

impl fmt::Display for FunnelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// One field as collected by a particular funnel step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldRule {
    pub field: Field,
    pub required: bool,
}

impl FieldRule {
    pub const fn required(field: Field) -> Self {
        Self {
            field,
            required: true,
        }
    }

    pub const fn optional(field: Field) -> Self {
        Self {
            field,
            required: false,
        }
    }

    /// Optional fields are only checked once the visitor has typed something.
    pub fn check(&self, raw: &str) -> Option<&'static str> {
        if !self.required && raw.trim().is_empty() {
            return None;
        }
        validate(self.field, raw)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StepSpec {
    pub title: &'static str,
    pub fields: &'static [FieldRule],
}

impl StepSpec {
    /// Run every rule of this step against the draft.
    pub fn validate(&self, draft: &DraftRecord) -> ErrorMap {
        self.fields
            .iter()
            .filter_map(|rule| {
                rule.check(draft.get(rule.field))
                    .map(|msg| (rule.field, msg.to_string()))
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct FunnelSpec {
    pub funnel: FunnelType,
    pub steps: &'static [StepSpec],
}

impl FunnelSpec {
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step(&self, index: usize) -> Option<&StepSpec> {
        self.steps.get(index)
    }

    pub fn rules(&self) -> impl Iterator<Item = &FieldRule> {
        self.steps.iter().flat_map(|s| s.fields.iter())
    }

    pub fn rule(&self, field: Field) -> Option<&FieldRule> {
        self.rules().find(|r| r.field == field)
    }

    /// Index of the step that collects `field`, if this funnel collects it.
    pub fn step_of(&self, field: Field) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| s.fields.iter().any(|r| r.field == field))
    }

    /// Authoritative whole-record check: every step's rules at once.
    pub fn validate(&self, draft: &DraftRecord) -> ErrorMap {
        self.steps.iter().flat_map(|s| s.validate(draft)).collect()
    }
}

use Field::*;

const CONTACT: StepSpec = StepSpec {
    title: "Personal Information",
    fields: &[
        FieldRule::required(FirstName),
        FieldRule::required(LastName),
        FieldRule::required(Email),
        FieldRule::required(Phone),
    ],
};

const HEALTH: StepSpec = StepSpec {
    title: "Health Information",
    fields: &[
        FieldRule::required(Age),
        FieldRule::required(Gender),
        FieldRule::required(HealthStatus),
        FieldRule::required(TobaccoUse),
    ],
};

const PERMANENT_COVERAGE: StepSpec = StepSpec {
    title: "Coverage Preferences",
    fields: &[
        FieldRule::required(CoverageAmount),
        FieldRule::optional(TermLength),
        FieldRule::optional(Occupation),
        FieldRule::optional(AnnualIncome),
    ],
};

static TERM_LIFE: FunnelSpec = FunnelSpec {
    funnel: FunnelType::TermLife,
    steps: &[
        CONTACT,
        HEALTH,
        StepSpec {
            title: "Coverage Preferences",
            fields: &[
                FieldRule::required(CoverageAmount),
                FieldRule::required(TermLength),
                FieldRule::optional(Occupation),
                FieldRule::optional(AnnualIncome),
            ],
        },
    ],
};

static WHOLE_LIFE: FunnelSpec = FunnelSpec {
    funnel: FunnelType::WholeLife,
    steps: &[CONTACT, HEALTH, PERMANENT_COVERAGE],
};

static PERMANENT_LIFE: FunnelSpec = FunnelSpec {
    funnel: FunnelType::PermanentLife,
    steps: &[CONTACT, HEALTH, PERMANENT_COVERAGE],
};

static STDI: FunnelSpec = FunnelSpec {
    funnel: FunnelType::Stdi,
    steps: &[
        CONTACT,
        StepSpec {
            title: "Health Information",
            fields: &[
                FieldRule::required(Age),
                FieldRule::required(Gender),
                FieldRule::required(HealthStatus),
                FieldRule::optional(TobaccoUse),
            ],
        },
        StepSpec {
            title: "Income Protection",
            fields: &[
                FieldRule::required(Occupation),
                FieldRule::required(AnnualIncome),
                FieldRule::optional(CoverageAmount),
            ],
        },
    ],
};

static SUPPLEMENTAL_HEALTH: FunnelSpec = FunnelSpec {
    funnel: FunnelType::SupplementalHealth,
    steps: &[
        CONTACT,
        StepSpec {
            title: "Health Information",
            fields: &[
                FieldRule::required(Age),
                FieldRule::required(Gender),
                FieldRule::required(HealthStatus),
                FieldRule::required(TobaccoUse),
                FieldRule::optional(Height),
                FieldRule::optional(Weight),
            ],
        },
        StepSpec {
            title: "Coverage Preferences",
            fields: &[
                FieldRule::required(CoverageAmount),
                FieldRule::optional(Occupation),
            ],
        },
    ],
};
