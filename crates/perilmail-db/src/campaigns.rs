//! Read/write operations for the `campaigns` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Input record for recording a generated campaign.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub id: String,
    pub person_id: Option<Uuid>,
    pub event_kind: String,
    pub event_id: String,
    pub subject: String,
    pub body: String,
    pub risk_level: String,
    pub distance_km: Option<f64>,
    pub target_count: i32,
}

/// A campaign row joined with its triggering earthquake and sample recipient.
///
/// The joins are LEFT JOINs: weather campaigns have no earthquake columns and
/// campaigns recorded without a person leave the person columns NULL.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignListRow {
    pub id: String,
    pub event_kind: String,
    pub event_id: String,
    pub subject: String,
    pub body: String,
    pub risk_level: String,
    pub distance_km: Option<f64>,
    pub target_count: i32,
    pub created_at: DateTime<Utc>,
    pub magnitude: Option<f64>,
    pub place: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Insert a campaign record.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails, including unique violations on
/// a duplicate campaign id.
pub async fn insert_campaign(pool: &PgPool, campaign: &NewCampaign) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO campaigns \
             (id, person_id, event_kind, event_id, subject, body, risk_level, \
              distance_km, target_count) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(&campaign.id)
    .bind(campaign.person_id)
    .bind(&campaign.event_kind)
    .bind(&campaign.event_id)
    .bind(&campaign.subject)
    .bind(&campaign.body)
    .bind(&campaign.risk_level)
    .bind(campaign.distance_km)
    .bind(campaign.target_count)
    .execute(pool)
    .await?;

    Ok(())
}

/// List campaigns newest-first, enriched with earthquake and person context.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_campaigns(pool: &PgPool, limit: i64) -> Result<Vec<CampaignListRow>, sqlx::Error> {
    sqlx::query_as::<_, CampaignListRow>(
        "SELECT c.id, c.event_kind, c.event_id, c.subject, c.body, c.risk_level, \
                c.distance_km, c.target_count, c.created_at, \
                e.magnitude, e.place, e.occurred_at, \
                p.first_name, p.last_name, p.city, p.state \
         FROM campaigns c \
         LEFT JOIN earthquakes e \
                ON c.event_kind = 'earthquake' AND e.external_id = c.event_id \
         LEFT JOIN persons p ON p.id = c.person_id \
         ORDER BY c.created_at DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
