//! Target selection endpoints: given a stored event, pick the people worth
//! contacting. Results are derived per request and never persisted.

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use perilmail_core::{
    bounding_box, select_earthquake_targets, select_weather_targets, Candidate,
    EarthquakeCriteria, GeoPoint, RiskLevel, Target, WeatherCriteria,
};
use serde::{Deserialize, Serialize};

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

/// The store-side candidate cap: twice the requested limit, so the exact
/// distance cut still has headroom over the coarse bbox prefilter.
fn store_fetch_limit(limit: usize) -> i64 {
    i64::try_from(limit.saturating_mul(2)).unwrap_or(i64::MAX)
}

fn count_risk(targets: &[Target], level: RiskLevel) -> usize {
    targets.iter().filter(|t| t.risk_level == level).count()
}

#[derive(Debug, Deserialize)]
pub(super) struct EarthquakeTargetsRequest {
    #[serde(default)]
    earthquake_id: String,
    #[serde(flatten)]
    criteria: EarthquakeCriteria,
}

#[derive(Debug, Serialize)]
pub(super) struct EarthquakeTargetsData {
    earthquake: EarthquakeSummary,
    summary: EarthquakeTargetsSummary,
    targets: Vec<EarthquakeTargetRow>,
}

#[derive(Debug, Clone, Serialize)]
struct EarthquakeSummary {
    id: String,
    magnitude: Option<f64>,
    place: Option<String>,
    occurred_at: Option<DateTime<Utc>>,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
struct EarthquakeTargetsSummary {
    total_targets: usize,
    high_risk_targets: usize,
    medium_risk_targets: usize,
    low_risk_targets: usize,
    criteria: EarthquakeCriteria,
}

#[derive(Debug, Serialize)]
struct EarthquakeTargetRow {
    person: Candidate,
    earthquake: EarthquakeSummary,
    distance_km: f64,
    risk_level: RiskLevel,
}

/// `POST /api/targets/earthquakes` — select outreach targets around a stored
/// earthquake.
pub(super) async fn earthquake_targets(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<EarthquakeTargetsRequest>,
) -> Result<Json<ApiResponse<EarthquakeTargetsData>>, ApiError> {
    let event_id = body.earthquake_id.trim();
    if event_id.is_empty() {
        return Err(ApiError::bad_request(req_id.0, "earthquake_id is required"));
    }

    let quake = perilmail_db::find_earthquake(&state.pool, event_id)
        .await
        .map_err(|error| map_db_error(req_id.0.clone(), &error))?
        .ok_or_else(|| ApiError::not_found(req_id.0.clone(), "earthquake not found"))?;

    let (Some(latitude), Some(longitude)) = (quake.latitude, quake.longitude) else {
        return Err(ApiError::bad_request(
            req_id.0,
            "earthquake has no coordinates to target around",
        ));
    };

    let criteria = body.criteria;
    let epicenter = GeoPoint::new(latitude, longitude);
    let bbox = bounding_box(epicenter, criteria.max_distance_km);

    let rows = perilmail_db::find_persons_in_bbox(
        &state.pool,
        &bbox,
        criteria.min_house_value,
        None,
        store_fetch_limit(criteria.limit),
    )
    .await
    .map_err(|error| map_db_error(req_id.0.clone(), &error))?;

    let candidates: Vec<Candidate> = rows.into_iter().map(Candidate::from).collect();
    let selected = select_earthquake_targets(epicenter, quake.magnitude, candidates, &criteria);

    let earthquake = EarthquakeSummary {
        id: quake.external_id,
        magnitude: quake.magnitude,
        place: quake.place,
        occurred_at: quake.occurred_at,
        latitude,
        longitude,
    };

    let summary = EarthquakeTargetsSummary {
        total_targets: selected.len(),
        high_risk_targets: count_risk(&selected, RiskLevel::High),
        medium_risk_targets: count_risk(&selected, RiskLevel::Medium),
        low_risk_targets: count_risk(&selected, RiskLevel::Low),
        criteria,
    };

    let targets: Vec<EarthquakeTargetRow> = selected
        .into_iter()
        .map(|target| EarthquakeTargetRow {
            person: target.candidate,
            earthquake: earthquake.clone(),
            distance_km: target.distance_km,
            risk_level: target.risk_level,
        })
        .collect();

    tracing::info!(
        earthquake_id = %earthquake.id,
        total = summary.total_targets,
        "selected earthquake outreach targets"
    );

    Ok(Json(ApiResponse {
        data: EarthquakeTargetsData {
            earthquake,
            summary,
            targets,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct WeatherTargetsRequest {
    #[serde(default)]
    weather_event_id: String,
    #[serde(flatten)]
    criteria: WeatherCriteria,
}

#[derive(Debug, Serialize)]
pub(super) struct WeatherTargetsData {
    weather_event: WeatherEventSummary,
    summary: WeatherTargetsSummary,
    targets: Vec<WeatherTargetRow>,
}

#[derive(Debug, Clone, Serialize)]
struct WeatherEventSummary {
    id: String,
    event_type: String,
    severity: String,
    location: String,
    latitude: f64,
    longitude: f64,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct WeatherTargetsSummary {
    total_targets: usize,
    criteria: WeatherCriteria,
    risk_distribution: RiskDistribution,
}

#[derive(Debug, Serialize)]
struct RiskDistribution {
    high: usize,
    medium: usize,
    low: usize,
}

#[derive(Debug, Serialize)]
struct WeatherTargetRow {
    person: Candidate,
    weather_event: WeatherEventSummary,
    distance_km: f64,
    risk_level: RiskLevel,
}

/// `POST /api/targets/weather` — select outreach targets around a stored
/// weather event.
pub(super) async fn weather_targets(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<WeatherTargetsRequest>,
) -> Result<Json<ApiResponse<WeatherTargetsData>>, ApiError> {
    let event_id = body.weather_event_id.trim();
    if event_id.is_empty() {
        return Err(ApiError::bad_request(
            req_id.0,
            "weather_event_id is required",
        ));
    }

    let event = perilmail_db::find_weather_event(&state.pool, event_id)
        .await
        .map_err(|error| map_db_error(req_id.0.clone(), &error))?
        .ok_or_else(|| ApiError::not_found(req_id.0.clone(), "weather event not found"))?;

    let (Some(latitude), Some(longitude)) = (event.latitude, event.longitude) else {
        return Err(ApiError::bad_request(
            req_id.0,
            "weather event has no coordinates to target around",
        ));
    };

    let criteria = body.criteria;
    let center = GeoPoint::new(latitude, longitude);
    let bbox = bounding_box(center, criteria.max_distance_km);

    let rows = perilmail_db::find_persons_in_bbox(
        &state.pool,
        &bbox,
        criteria.min_house_value,
        Some(criteria.max_house_value),
        store_fetch_limit(criteria.limit),
    )
    .await
    .map_err(|error| map_db_error(req_id.0.clone(), &error))?;

    let candidates: Vec<Candidate> = rows.into_iter().map(Candidate::from).collect();
    let selected =
        select_weather_targets(center, &event.severity, &event.event_type, candidates, &criteria);

    let weather_event = WeatherEventSummary {
        id: event.external_id,
        event_type: event.event_type,
        severity: event.severity,
        location: event.location,
        latitude,
        longitude,
        starts_at: event.starts_at,
        ends_at: event.ends_at,
    };

    let summary = WeatherTargetsSummary {
        total_targets: selected.len(),
        criteria,
        risk_distribution: RiskDistribution {
            high: count_risk(&selected, RiskLevel::High),
            medium: count_risk(&selected, RiskLevel::Medium),
            low: count_risk(&selected, RiskLevel::Low),
        },
    };

    let targets: Vec<WeatherTargetRow> = selected
        .into_iter()
        .map(|target| WeatherTargetRow {
            person: target.candidate,
            weather_event: weather_event.clone(),
            distance_km: target.distance_km,
            risk_level: target.risk_level,
        })
        .collect();

    tracing::info!(
        weather_event_id = %weather_event.id,
        total = summary.total_targets,
        "selected weather outreach targets"
    );

    Ok(Json(ApiResponse {
        data: WeatherTargetsData {
            weather_event,
            summary,
            targets,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
