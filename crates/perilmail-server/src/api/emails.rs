//! Email endpoints: model-backed generation, paced bulk dispatch, and
//! delivery stats.

use std::time::Duration;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use perilmail_core::{RiskLevel, TemplateVars, WeatherDetails};
use perilmail_db::{EventCounts, NewEmailEvent, StatsFilter};
use perilmail_gemini::{
    earthquake_prompt, fallback_subject, weather_prompt, EarthquakeFacts, Recipient, WeatherFacts,
};
use perilmail_sendgrid::{
    BulkDispatcher, CampaignContent, CustomArgs, DispatchOptions, DispatchSummary, DispatchTarget,
    SendOutcome, TokioPacer,
};
use serde::{Deserialize, Serialize};

use super::{map_db_error, require_field, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct GenerateEmailRequest {
    target: Option<GenerateTarget>,
    context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateTarget {
    person: PersonInput,
    event: EventInput,
    distance_km: f64,
    risk_level: RiskLevel,
}

#[derive(Debug, Deserialize)]
struct PersonInput {
    first_name: String,
    last_name: String,
    city: String,
    state: String,
    house_value: i64,
    #[serde(default)]
    has_insurance: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum EventInput {
    Earthquake {
        magnitude: Option<f64>,
        place: Option<String>,
        occurred_at: Option<DateTime<Utc>>,
    },
    Weather {
        event_type: String,
        severity: String,
        location: String,
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
        description: Option<String>,
        rainfall_mm: Option<f64>,
        wind_speed_kph: Option<f64>,
        temperature_c: Option<f64>,
        humidity_pct: Option<f64>,
    },
}

#[derive(Debug, Serialize)]
pub(super) struct GenerateEmailData {
    subject: String,
    body: String,
    generated_at: DateTime<Utc>,
}

/// `POST /api/emails/generate` — write one personalized outreach email for a
/// selected target.
pub(super) async fn generate_email(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<GenerateEmailRequest>,
) -> Result<Json<ApiResponse<GenerateEmailData>>, ApiError> {
    let Some(target) = body.target else {
        return Err(ApiError::bad_request(req_id.0, "target is required"));
    };
    let context = match body.context.as_deref().map(str::trim) {
        Some(context) if !context.is_empty() => context.to_owned(),
        _ => return Err(ApiError::bad_request(req_id.0, "context is required")),
    };

    // Fail before any network call when the provider was never configured.
    let Some(gemini) = state.gemini.as_ref() else {
        return Err(ApiError::config(
            req_id.0,
            "GEMINI_API_KEY is not configured; email generation is unavailable",
        ));
    };

    let recipient = Recipient {
        first_name: target.person.first_name,
        last_name: target.person.last_name,
        city: target.person.city,
        state: target.person.state,
        house_value: target.person.house_value,
        has_insurance: target.person.has_insurance,
    };
    let risk_level = target.risk_level.as_str();

    let (prompt, peril) = match target.event {
        EventInput::Earthquake {
            magnitude,
            place,
            occurred_at,
        } => {
            let facts = EarthquakeFacts {
                magnitude,
                place,
                occurred_at,
            };
            (
                earthquake_prompt(&recipient, &facts, target.distance_km, risk_level, &context),
                "Earthquake",
            )
        }
        EventInput::Weather {
            event_type,
            severity,
            location,
            starts_at,
            ends_at,
            description,
            rainfall_mm,
            wind_speed_kph,
            temperature_c,
            humidity_pct,
        } => {
            let facts = WeatherFacts {
                event_type,
                severity,
                location,
                starts_at,
                ends_at,
                description,
                rainfall_mm,
                wind_speed_kph,
                temperature_c,
                humidity_pct,
            };
            (
                weather_prompt(&recipient, &facts, target.distance_km, risk_level, &context),
                "Weather",
            )
        }
    };

    let fallback = fallback_subject(peril, &recipient.city);
    let email = gemini
        .generate_email(&prompt, &fallback)
        .await
        .map_err(|error| {
            tracing::error!(error = %error, "email generation failed");
            ApiError::internal(
                req_id.0.clone(),
                format!("email generation failed: {error}"),
            )
        })?;

    Ok(Json(ApiResponse {
        data: GenerateEmailData {
            subject: email.subject,
            body: email.body,
            generated_at: Utc::now(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct SendEmailsRequest {
    subject: Option<String>,
    body: Option<String>,
    campaign_id: Option<String>,
    #[serde(default)]
    targets: Vec<SendTargetInput>,
    event: Option<SendEventContext>,
    batch_size: Option<usize>,
    delay_between_batches_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SendTargetInput {
    person: SendPersonInput,
    distance_km: f64,
    risk_level: RiskLevel,
}

#[derive(Debug, Deserialize)]
struct SendPersonInput {
    id: Option<String>,
    first_name: String,
    last_name: String,
    email: String,
    city: String,
    state: String,
    house_value: i64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum SendEventContext {
    Earthquake {
        id: String,
        magnitude: Option<f64>,
        place: Option<String>,
    },
    Weather {
        id: String,
        event_type: String,
        severity: String,
        location: String,
        rainfall_mm: Option<f64>,
        wind_speed_kph: Option<f64>,
        temperature_c: Option<f64>,
        humidity_pct: Option<f64>,
    },
}

impl SendEventContext {
    fn correlation(&self) -> (String, &'static str, &'static str) {
        match self {
            Self::Earthquake { id, .. } => (
                id.clone(),
                "earthquake-insurance-campaign",
                "This email was sent as part of an earthquake insurance awareness campaign.",
            ),
            Self::Weather { id, .. } => (
                id.clone(),
                "weather-insurance-campaign",
                "This email was sent as part of a weather insurance awareness campaign.",
            ),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct SendEmailsData {
    campaign_id: String,
    summary: DispatchSummary,
    results: Vec<SendOutcome>,
}

/// `POST /api/emails/send` — render and dispatch one campaign in paced
/// batches, then record a `sent` event per delivered recipient.
pub(super) async fn send_emails(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SendEmailsRequest>,
) -> Result<Json<ApiResponse<SendEmailsData>>, ApiError> {
    let subject = require_field(&req_id, body.subject, "subject")?;
    let body_template = require_field(&req_id, body.body, "body")?;
    let campaign_id = require_field(&req_id, body.campaign_id, "campaign_id")?;
    if body.targets.is_empty() {
        return Err(ApiError::bad_request(
            req_id.0,
            "targets must be a non-empty array",
        ));
    }

    let Some(mailer) = state.mailer.as_ref() else {
        return Err(ApiError::config(
            req_id.0,
            "SENDGRID_API_KEY is not configured; email dispatch is unavailable",
        ));
    };

    let (event_id, email_type, note) = body.event.as_ref().map_or_else(
        || {
            (
                "unknown".to_string(),
                "insurance-campaign",
                "This email was sent as part of an insurance awareness campaign.",
            )
        },
        SendEventContext::correlation,
    );

    let dispatch_targets: Vec<DispatchTarget> = body
        .targets
        .iter()
        .map(|target| {
            let person = &target.person;
            let mut vars = TemplateVars::for_person(
                &person.first_name,
                &person.last_name,
                &person.city,
                &person.state,
                person.house_value,
            )
            .with_target_context(target.distance_km, target.risk_level);

            vars = match &body.event {
                Some(SendEventContext::Earthquake {
                    magnitude, place, ..
                }) => vars.with_earthquake(*magnitude, place.as_deref()),
                Some(SendEventContext::Weather {
                    event_type,
                    severity,
                    location,
                    rainfall_mm,
                    wind_speed_kph,
                    temperature_c,
                    humidity_pct,
                    ..
                }) => vars.with_weather(&WeatherDetails {
                    event_type: event_type.clone(),
                    severity: severity.clone(),
                    location: location.clone(),
                    rainfall_mm: *rainfall_mm,
                    wind_speed_kph: *wind_speed_kph,
                    temperature_c: *temperature_c,
                    humidity_pct: *humidity_pct,
                }),
                None => vars,
            };

            DispatchTarget {
                email: person.email.clone(),
                vars,
                custom_args: CustomArgs {
                    user_id: person.id.clone().unwrap_or_else(|| person.email.clone()),
                    campaign_id: campaign_id.clone(),
                    event_id: event_id.clone(),
                    risk_level: target.risk_level.as_str().to_string(),
                    email_type: email_type.to_string(),
                },
            }
        })
        .collect();

    let defaults = DispatchOptions::default();
    let options = DispatchOptions {
        batch_size: body.batch_size.unwrap_or(defaults.batch_size),
        delay_between_batches: body
            .delay_between_batches_ms
            .map_or(defaults.delay_between_batches, Duration::from_millis),
    };

    let report = BulkDispatcher::new(mailer, TokioPacer)
        .dispatch(
            CampaignContent {
                subject: &subject,
                body: &body_template,
                note,
            },
            &dispatch_targets,
            &options,
        )
        .await;

    // Baseline for delivery stats: one `sent` event per successful send.
    // The messages already left, so a store failure is logged, not returned.
    let recorded_at = Utc::now();
    let sent_events: Vec<NewEmailEvent> = report
        .results
        .iter()
        .zip(body.targets.iter())
        .filter(|(outcome, _)| outcome.success)
        .map(|(outcome, target)| NewEmailEvent {
            campaign_id: campaign_id.clone(),
            person_ref: target
                .person
                .id
                .clone()
                .unwrap_or_else(|| target.person.email.clone()),
            event_type: "sent".to_string(),
            email: outcome.email.clone(),
            occurred_at: recorded_at,
            url: None,
            provider_message_id: outcome.message_id.clone(),
        })
        .collect();

    if !sent_events.is_empty() {
        if let Err(error) = perilmail_db::insert_email_events(&state.pool, &sent_events).await {
            tracing::error!(error = %error, campaign_id = %campaign_id, "failed to record sent events");
        }
    }

    tracing::info!(
        campaign_id = %campaign_id,
        sent = report.summary.sent,
        failed = report.summary.failed,
        "campaign dispatch finished"
    );

    Ok(Json(ApiResponse {
        data: SendEmailsData {
            campaign_id,
            summary: report.summary,
            results: report.results,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct StatsQuery {
    days: Option<i64>,
    campaign_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct EmailStatsData {
    summary: StatsSummary,
    event_types: EventTypeCounts,
    campaigns: Vec<CampaignStatsItem>,
    daily: Vec<DailyCountItem>,
}

#[derive(Debug, Serialize)]
struct StatsSummary {
    total_events: i64,
    unique_emails: i64,
    date_range: DateRange,
}

#[derive(Debug, Serialize)]
struct DateRange {
    since: DateTime<Utc>,
    until: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct EventTypeCounts {
    sent: i64,
    delivered: i64,
    opened: i64,
    clicked: i64,
    bounced: i64,
    dropped: i64,
    spam_reports: i64,
    unsubscribed: i64,
    other: i64,
}

impl From<EventCounts> for EventTypeCounts {
    fn from(counts: EventCounts) -> Self {
        Self {
            sent: counts.sent,
            delivered: counts.delivered,
            opened: counts.opened,
            clicked: counts.clicked,
            bounced: counts.bounced,
            dropped: counts.dropped,
            spam_reports: counts.spam_reports,
            unsubscribed: counts.unsubscribed,
            other: counts.other,
        }
    }
}

#[derive(Debug, Serialize)]
struct CampaignStatsItem {
    campaign_id: String,
    total_sent: i64,
    delivered: i64,
    opened: i64,
    clicked: i64,
    bounced: i64,
    dropped: i64,
    open_rate: f64,
    click_rate: f64,
    delivery_rate: f64,
}

#[derive(Debug, Serialize)]
struct DailyCountItem {
    day: NaiveDate,
    count: i64,
}

/// Percentage rounded to one decimal; `0.0` when the denominator is empty.
fn rate(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        return 0.0;
    }
    let pct = (numerator as f64 / denominator as f64) * 100.0;
    (pct * 10.0).round() / 10.0
}

/// `GET /api/emails/stats` — delivery stats over a trailing window.
pub(super) async fn email_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<ApiResponse<EmailStatsData>>, ApiError> {
    let days = params.days.unwrap_or(30).clamp(1, 365);
    let until = Utc::now();
    let since = until - chrono::Duration::days(days);
    let campaign_id = params
        .campaign_id
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty());

    let filter = StatsFilter {
        since,
        until,
        campaign_id,
    };
    let stats = perilmail_db::campaign_stats(&state.pool, &filter)
        .await
        .map_err(|error| map_db_error(req_id.0.clone(), &error))?;

    let campaigns: Vec<CampaignStatsItem> = stats
        .campaigns
        .iter()
        .map(|campaign| {
            let counts = campaign.counts;
            CampaignStatsItem {
                campaign_id: campaign.campaign_id.clone(),
                total_sent: counts.sent,
                delivered: counts.delivered,
                opened: counts.opened,
                clicked: counts.clicked,
                bounced: counts.bounced,
                dropped: counts.dropped,
                open_rate: rate(counts.opened, counts.delivered),
                click_rate: rate(counts.clicked, counts.delivered),
                delivery_rate: rate(counts.delivered, counts.sent),
            }
        })
        .collect();

    let daily: Vec<DailyCountItem> = stats
        .daily
        .iter()
        .map(|d| DailyCountItem {
            day: d.day,
            count: d.count,
        })
        .collect();

    Ok(Json(ApiResponse {
        data: EmailStatsData {
            summary: StatsSummary {
                total_events: stats.total_events,
                unique_emails: stats.unique_emails,
                date_range: DateRange { since, until },
            },
            event_types: EventTypeCounts::from(stats.counts),
            campaigns,
            daily,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
