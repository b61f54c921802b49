//! Weather event storage and listing endpoints.
//!
//! Unlike earthquakes there is no public feed to pull from; callers push
//! events in and the store keeps them for targeting.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use perilmail_db::{NewWeatherEvent, WeatherEventRow};
use serde::{Deserialize, Serialize};

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct StoreWeatherEventsRequest {
    #[serde(default)]
    events: Vec<WeatherEventInput>,
}

#[derive(Debug, Deserialize)]
struct WeatherEventInput {
    id: String,
    event_type: String,
    severity: String,
    location: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    description: Option<String>,
    rainfall_mm: Option<f64>,
    wind_speed_kph: Option<f64>,
    temperature_c: Option<f64>,
    humidity_pct: Option<f64>,
}

impl From<WeatherEventInput> for NewWeatherEvent {
    fn from(input: WeatherEventInput) -> Self {
        Self {
            external_id: input.id,
            event_type: input.event_type,
            severity: input.severity,
            location: input.location,
            latitude: input.latitude,
            longitude: input.longitude,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            description: input.description,
            rainfall_mm: input.rainfall_mm,
            wind_speed_kph: input.wind_speed_kph,
            temperature_c: input.temperature_c,
            humidity_pct: input.humidity_pct,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct StoreWeatherEventsData {
    count: usize,
    stored: StoredCounts,
}

#[derive(Debug, Serialize)]
struct StoredCounts {
    inserted: u64,
    updated: u64,
}

/// `POST /api/weather-events` — upsert caller-supplied weather events.
pub(super) async fn store_weather_events(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<StoreWeatherEventsRequest>,
) -> Result<Json<ApiResponse<StoreWeatherEventsData>>, ApiError> {
    if body.events.is_empty() {
        return Err(ApiError::bad_request(
            req_id.0,
            "events must be a non-empty array",
        ));
    }

    let records: Vec<NewWeatherEvent> =
        body.events.into_iter().map(NewWeatherEvent::from).collect();
    let (inserted, updated) = perilmail_db::upsert_weather_events(&state.pool, &records)
        .await
        .map_err(|error| map_db_error(req_id.0.clone(), &error))?;

    tracing::info!(count = records.len(), inserted, updated, "stored weather events");

    Ok(Json(ApiResponse {
        data: StoreWeatherEventsData {
            count: records.len(),
            stored: StoredCounts { inserted, updated },
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct ListWeatherEventsQuery {
    hours: Option<i32>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ListWeatherEventsData {
    count: usize,
    events: Vec<WeatherEventItem>,
}

#[derive(Debug, Serialize)]
struct WeatherEventItem {
    id: String,
    event_type: String,
    severity: String,
    location: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    description: Option<String>,
    rainfall_mm: Option<f64>,
    wind_speed_kph: Option<f64>,
    temperature_c: Option<f64>,
    humidity_pct: Option<f64>,
}

impl From<WeatherEventRow> for WeatherEventItem {
    fn from(row: WeatherEventRow) -> Self {
        Self {
            id: row.external_id,
            event_type: row.event_type,
            severity: row.severity,
            location: row.location,
            latitude: row.latitude,
            longitude: row.longitude,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            description: row.description,
            rainfall_mm: row.rainfall_mm,
            wind_speed_kph: row.wind_speed_kph,
            temperature_c: row.temperature_c,
            humidity_pct: row.humidity_pct,
        }
    }
}

/// `GET /api/weather-events` — list stored events newest-first.
pub(super) async fn list_weather_events(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ListWeatherEventsQuery>,
) -> Result<Json<ApiResponse<ListWeatherEventsData>>, ApiError> {
    let hours = params.hours.unwrap_or(168);
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);

    let rows = perilmail_db::list_weather_events(&state.pool, hours, limit)
        .await
        .map_err(|error| map_db_error(req_id.0.clone(), &error))?;

    let events: Vec<WeatherEventItem> = rows.into_iter().map(WeatherEventItem::from).collect();

    Ok(Json(ApiResponse {
        data: ListWeatherEventsData {
            count: events.len(),
            events,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
