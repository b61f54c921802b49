//! Read/write operations for the `email_events` table and delivery stats.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

/// Input record for an email delivery event, from dispatch or the webhook.
#[derive(Debug, Clone)]
pub struct NewEmailEvent {
    pub campaign_id: String,
    pub person_ref: String,
    pub event_type: String,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
    pub url: Option<String>,
    pub provider_message_id: Option<String>,
}

/// Window and scope for a stats query.
#[derive(Debug, Clone)]
pub struct StatsFilter {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub campaign_id: Option<String>,
}

/// Event totals folded into the lifecycle buckets used for reporting.
///
/// Providers spell the same event differently across webhook versions
/// (`open` vs `opened`, `bounce` vs `bounced`), so folding happens here
/// rather than in SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounts {
    pub sent: i64,
    pub delivered: i64,
    pub opened: i64,
    pub clicked: i64,
    pub bounced: i64,
    pub dropped: i64,
    pub spam_reports: i64,
    pub unsubscribed: i64,
    pub other: i64,
}

impl EventCounts {
    /// Fold `count` occurrences of `event_type` into the matching bucket.
    pub fn add(&mut self, event_type: &str, count: i64) {
        match event_type {
            "sent" | "processed" => self.sent += count,
            "delivered" => self.delivered += count,
            "open" | "opened" => self.opened += count,
            "click" | "clicked" => self.clicked += count,
            "bounce" | "bounced" => self.bounced += count,
            "dropped" => self.dropped += count,
            "spam_report" => self.spam_reports += count,
            "unsubscribe" | "unsubscribed" => self.unsubscribed += count,
            _ => self.other += count,
        }
    }

    #[must_use]
    pub fn total(&self) -> i64 {
        self.sent
            + self.delivered
            + self.opened
            + self.clicked
            + self.bounced
            + self.dropped
            + self.spam_reports
            + self.unsubscribed
            + self.other
    }
}

/// Per-campaign event totals.
#[derive(Debug, Clone)]
pub struct CampaignEventCounts {
    pub campaign_id: String,
    pub counts: EventCounts,
}

/// Events per UTC calendar day.
#[derive(Debug, Clone, Copy)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: i64,
}

/// Aggregated delivery stats for a window.
#[derive(Debug, Clone)]
pub struct EmailStats {
    pub total_events: i64,
    pub unique_emails: i64,
    pub counts: EventCounts,
    pub campaigns: Vec<CampaignEventCounts>,
    pub daily: Vec<DailyCount>,
}

/// Insert email events. Events are append-only; there is no conflict target.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn insert_email_events(
    pool: &PgPool,
    events: &[NewEmailEvent],
) -> Result<u64, sqlx::Error> {
    if events.is_empty() {
        return Ok(0);
    }

    let mut campaign_ids: Vec<String> = Vec::with_capacity(events.len());
    let mut person_refs: Vec<String> = Vec::with_capacity(events.len());
    let mut event_types: Vec<String> = Vec::with_capacity(events.len());
    let mut emails: Vec<String> = Vec::with_capacity(events.len());
    let mut occurred_ats: Vec<DateTime<Utc>> = Vec::with_capacity(events.len());
    let mut urls: Vec<Option<String>> = Vec::with_capacity(events.len());
    let mut message_ids: Vec<Option<String>> = Vec::with_capacity(events.len());

    for event in events {
        campaign_ids.push(event.campaign_id.clone());
        person_refs.push(event.person_ref.clone());
        event_types.push(event.event_type.clone());
        emails.push(event.email.clone());
        occurred_ats.push(event.occurred_at);
        urls.push(event.url.clone());
        message_ids.push(event.provider_message_id.clone());
    }

    let rows_affected = sqlx::query(
        "INSERT INTO email_events \
             (campaign_id, person_ref, event_type, email, occurred_at, url, provider_message_id) \
         SELECT * FROM UNNEST(\
              $1::text[], $2::text[], $3::text[], $4::text[], \
              $5::timestamptz[], $6::text[], $7::text[])",
    )
    .bind(&campaign_ids)
    .bind(&person_refs)
    .bind(&event_types)
    .bind(&emails)
    .bind(&occurred_ats)
    .bind(&urls)
    .bind(&message_ids)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected)
}

/// Aggregate delivery stats for a window, optionally scoped to one campaign.
///
/// Runs four grouped queries (totals, per-type, per-campaign-per-type,
/// per-day) and folds the per-type rows into [`EventCounts`] buckets.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if any query fails.
pub async fn campaign_stats(pool: &PgPool, filter: &StatsFilter) -> Result<EmailStats, sqlx::Error> {
    let (total_events, unique_emails): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COUNT(DISTINCT email) \
         FROM email_events \
         WHERE occurred_at BETWEEN $1 AND $2 \
           AND ($3::text IS NULL OR campaign_id = $3)",
    )
    .bind(filter.since)
    .bind(filter.until)
    .bind(filter.campaign_id.as_deref())
    .fetch_one(pool)
    .await?;

    let type_rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT event_type, COUNT(*) \
         FROM email_events \
         WHERE occurred_at BETWEEN $1 AND $2 \
           AND ($3::text IS NULL OR campaign_id = $3) \
         GROUP BY event_type",
    )
    .bind(filter.since)
    .bind(filter.until)
    .bind(filter.campaign_id.as_deref())
    .fetch_all(pool)
    .await?;

    let mut counts = EventCounts::default();
    for (event_type, count) in &type_rows {
        counts.add(event_type, *count);
    }

    let campaign_rows: Vec<(String, String, i64)> = sqlx::query_as(
        "SELECT campaign_id, event_type, COUNT(*) \
         FROM email_events \
         WHERE occurred_at BETWEEN $1 AND $2 \
           AND ($3::text IS NULL OR campaign_id = $3) \
         GROUP BY campaign_id, event_type \
         ORDER BY campaign_id",
    )
    .bind(filter.since)
    .bind(filter.until)
    .bind(filter.campaign_id.as_deref())
    .fetch_all(pool)
    .await?;

    let mut campaigns: Vec<CampaignEventCounts> = Vec::new();
    for (campaign_id, event_type, count) in &campaign_rows {
        if campaigns.last().map(|c| c.campaign_id.as_str()) != Some(campaign_id.as_str()) {
            campaigns.push(CampaignEventCounts {
                campaign_id: campaign_id.clone(),
                counts: EventCounts::default(),
            });
        }
        if let Some(entry) = campaigns.last_mut() {
            entry.counts.add(event_type, *count);
        }
    }

    let daily_rows: Vec<(NaiveDate, i64)> = sqlx::query_as(
        "SELECT (occurred_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) \
         FROM email_events \
         WHERE occurred_at BETWEEN $1 AND $2 \
           AND ($3::text IS NULL OR campaign_id = $3) \
         GROUP BY day \
         ORDER BY day",
    )
    .bind(filter.since)
    .bind(filter.until)
    .bind(filter.campaign_id.as_deref())
    .fetch_all(pool)
    .await?;

    let daily = daily_rows
        .into_iter()
        .map(|(day, count)| DailyCount { day, count })
        .collect();

    Ok(EmailStats {
        total_events,
        unique_emails,
        counts,
        campaigns,
        daily,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_folds_provider_spellings_into_one_bucket() {
        let mut counts = EventCounts::default();
        counts.add("open", 2);
        counts.add("opened", 3);
        counts.add("bounce", 1);
        counts.add("bounced", 1);
        counts.add("processed", 4);
        counts.add("sent", 1);

        assert_eq!(counts.opened, 5);
        assert_eq!(counts.bounced, 2);
        assert_eq!(counts.sent, 5);
    }

    #[test]
    fn add_routes_unknown_types_to_other() {
        let mut counts = EventCounts::default();
        counts.add("group_resubscribe", 2);
        counts.add("deferred", 1);

        assert_eq!(counts.other, 3);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn total_sums_every_bucket() {
        let mut counts = EventCounts::default();
        counts.add("delivered", 10);
        counts.add("click", 2);
        counts.add("spam_report", 1);
        counts.add("dropped", 1);
        counts.add("unsubscribe", 1);

        assert_eq!(counts.total(), 15);
    }
}
