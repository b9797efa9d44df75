//! Lead persistence.
//!
//! The orchestrator only ever inserts. `recent` and `count` exist for the
//! diagnostic endpoints. `PgLeadStore` is the production backend;
//! `MemoryLeadStore` backs tests and local runs without a database.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quotelinker_core::{FunnelType, LeadRecord, NewLead};
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../migrations/0001_create_leads.sql");

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Insert one lead. The store assigns `created_at` and the initial status.
    async fn insert(&self, lead: &NewLead) -> Result<LeadRecord>;

    /// Most recent leads first.
    async fn recent(&self, limit: i64) -> Result<Vec<LeadRecord>>;

    async fn count(&self) -> Result<i64>;
}

// ============================================================================
// Postgres
// ============================================================================

pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `leads` table and indexes if they do not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .context("Failed to apply leads schema")?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct LeadRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    date_of_birth: Option<String>,
    age: Option<i32>,
    gender: Option<String>,
    height: Option<String>,
    weight: Option<String>,
    tobacco_use: String,
    health_status: Option<String>,
    insurance_type: String,
    coverage_amount: Option<i64>,
    term_length: Option<i32>,
    occupation: String,
    annual_income: i64,
    source: String,
    funnel_type: String,
    utm_source: Option<String>,
    utm_medium: Option<String>,
    utm_campaign: Option<String>,
    utm_term: Option<String>,
    utm_content: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<LeadRow> for LeadRecord {
    fn from(row: LeadRow) -> Self {
        LeadRecord {
            id: row.id,
            lead: NewLead {
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
                phone: row.phone,
                date_of_birth: row.date_of_birth,
                age: row.age,
                gender: row.gender,
                height: row.height,
                weight: row.weight,
                tobacco_use: row.tobacco_use,
                health_status: row.health_status,
                insurance_type: row.insurance_type,
                coverage_amount: row.coverage_amount,
                term_length: row.term_length,
                occupation: row.occupation,
                annual_income: row.annual_income,
                source: row.source,
                funnel_type: FunnelType::parse(&row.funnel_type).unwrap_or_default(),
                utm_source: row.utm_source,
                utm_medium: row.utm_medium,
                utm_campaign: row.utm_campaign,
                utm_term: row.utm_term,
                utm_content: row.utm_content,
            },
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn insert(&self, lead: &NewLead) -> Result<LeadRecord> {
        let id = Uuid::new_v4();

        let (status, created_at) = sqlx::query_as::<_, (String, DateTime<Utc>)>(
            r#"
            INSERT INTO leads (
                id, first_name, last_name, email, phone,
                date_of_birth, age, gender, height, weight,
                tobacco_use, health_status, insurance_type, coverage_amount, term_length,
                occupation, annual_income, source, funnel_type,
                utm_source, utm_medium, utm_campaign, utm_term, utm_content
            ) VALUES (
                $1, $2, $3, $4, $5,
                $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15,
                $16, $17, $18, $19,
                $20, $21, $22, $23, $24
            )
            RETURNING status, created_at
            "#,
        )
        .bind(id)
        .bind(&lead.first_name)
        .bind(&lead.last_name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.date_of_birth)
        .bind(lead.age)
        .bind(&lead.gender)
        .bind(&lead.height)
        .bind(&lead.weight)
        .bind(&lead.tobacco_use)
        .bind(&lead.health_status)
        .bind(&lead.insurance_type)
        .bind(lead.coverage_amount)
        .bind(lead.term_length)
        .bind(&lead.occupation)
        .bind(lead.annual_income)
        .bind(&lead.source)
        .bind(lead.funnel_type.slug())
        .bind(&lead.utm_source)
        .bind(&lead.utm_medium)
        .bind(&lead.utm_campaign)
        .bind(&lead.utm_term)
        .bind(&lead.utm_content)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert lead")?;

        Ok(LeadRecord {
            id,
            lead: lead.clone(),
            status,
            created_at,
        })
    }

    async fn recent(&self, limit: i64) -> Result<Vec<LeadRecord>> {
        let rows = sqlx::query_as::<_, LeadRow>(
            r#"SELECT * FROM leads ORDER BY created_at DESC LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query leads")?;

        Ok(rows.into_iter().map(LeadRecord::from).collect())
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(r#"SELECT count(*) FROM leads"#)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count leads")
    }
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Default)]
pub struct MemoryLeadStore {
    leads: RwLock<Vec<LeadRecord>>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<LeadRecord> {
        self.leads.read().await.clone()
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn insert(&self, lead: &NewLead) -> Result<LeadRecord> {
        let record = LeadRecord::new(Uuid::new_v4(), lead.clone(), Utc::now());
        self.leads.write().await.push(record.clone());
        Ok(record)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<LeadRecord>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .leads
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.leads.read().await.len() as i64)
    }
}
