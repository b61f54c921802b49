//! Read/write operations for the `weather_events` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Input record for upserting a weather event, keyed by the caller's event id.
#[derive(Debug, Clone)]
pub struct NewWeatherEvent {
    pub external_id: String,
    pub event_type: String,
    pub severity: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub rainfall_mm: Option<f64>,
    pub wind_speed_kph: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
}

/// A row from the `weather_events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WeatherEventRow {
    pub external_id: String,
    pub event_type: String,
    pub severity: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub rainfall_mm: Option<f64>,
    pub wind_speed_kph: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert weather events keyed by `external_id`.
///
/// Returns `(new_count, updated_count)`; re-submitting an event refreshes its
/// fields rather than duplicating it.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn upsert_weather_events(
    pool: &PgPool,
    events: &[NewWeatherEvent],
) -> Result<(u64, u64), sqlx::Error> {
    if events.is_empty() {
        return Ok((0, 0));
    }

    let mut external_ids: Vec<String> = Vec::with_capacity(events.len());
    let mut event_types: Vec<String> = Vec::with_capacity(events.len());
    let mut severities: Vec<String> = Vec::with_capacity(events.len());
    let mut locations: Vec<String> = Vec::with_capacity(events.len());
    let mut latitudes: Vec<Option<f64>> = Vec::with_capacity(events.len());
    let mut longitudes: Vec<Option<f64>> = Vec::with_capacity(events.len());
    let mut starts: Vec<DateTime<Utc>> = Vec::with_capacity(events.len());
    let mut ends: Vec<Option<DateTime<Utc>>> = Vec::with_capacity(events.len());
    let mut descriptions: Vec<Option<String>> = Vec::with_capacity(events.len());
    let mut rainfalls: Vec<Option<f64>> = Vec::with_capacity(events.len());
    let mut wind_speeds: Vec<Option<f64>> = Vec::with_capacity(events.len());
    let mut temperatures: Vec<Option<f64>> = Vec::with_capacity(events.len());
    let mut humidities: Vec<Option<f64>> = Vec::with_capacity(events.len());

    for event in events {
        external_ids.push(event.external_id.clone());
        event_types.push(event.event_type.clone());
        severities.push(event.severity.clone());
        locations.push(event.location.clone());
        latitudes.push(event.latitude);
        longitudes.push(event.longitude);
        starts.push(event.starts_at);
        ends.push(event.ends_at);
        descriptions.push(event.description.clone());
        rainfalls.push(event.rainfall_mm);
        wind_speeds.push(event.wind_speed_kph);
        temperatures.push(event.temperature_c);
        humidities.push(event.humidity_pct);
    }

    let rows: Vec<bool> = sqlx::query_scalar::<_, bool>(
        "INSERT INTO weather_events \
             (external_id, event_type, severity, location, latitude, longitude, \
              starts_at, ends_at, description, rainfall_mm, wind_speed_kph, \
              temperature_c, humidity_pct) \
         SELECT * FROM UNNEST(\
              $1::text[], $2::text[], $3::text[], $4::text[], $5::float8[], $6::float8[], \
              $7::timestamptz[], $8::timestamptz[], $9::text[], $10::float8[], $11::float8[], \
              $12::float8[], $13::float8[]) \
         ON CONFLICT (external_id) DO UPDATE SET \
             event_type     = EXCLUDED.event_type, \
             severity       = EXCLUDED.severity, \
             location       = EXCLUDED.location, \
             latitude       = EXCLUDED.latitude, \
             longitude      = EXCLUDED.longitude, \
             starts_at      = EXCLUDED.starts_at, \
             ends_at        = EXCLUDED.ends_at, \
             description    = EXCLUDED.description, \
             rainfall_mm    = EXCLUDED.rainfall_mm, \
             wind_speed_kph = EXCLUDED.wind_speed_kph, \
             temperature_c  = EXCLUDED.temperature_c, \
             humidity_pct   = EXCLUDED.humidity_pct, \
             updated_at     = NOW() \
         RETURNING (xmax = 0) AS is_new",
    )
    .bind(&external_ids)
    .bind(&event_types)
    .bind(&severities)
    .bind(&locations)
    .bind(&latitudes)
    .bind(&longitudes)
    .bind(&starts)
    .bind(&ends)
    .bind(&descriptions)
    .bind(&rainfalls)
    .bind(&wind_speeds)
    .bind(&temperatures)
    .bind(&humidities)
    .fetch_all(pool)
    .await?;

    let new_count = rows.iter().filter(|&&is_new| is_new).count() as u64;
    let updated_count = rows.len() as u64 - new_count;

    Ok((new_count, updated_count))
}

/// Look up a single weather event by its id.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn find_weather_event(
    pool: &PgPool,
    external_id: &str,
) -> Result<Option<WeatherEventRow>, sqlx::Error> {
    sqlx::query_as::<_, WeatherEventRow>(
        "SELECT external_id, event_type, severity, location, latitude, longitude, \
                starts_at, ends_at, description, rainfall_mm, wind_speed_kph, \
                temperature_c, humidity_pct, created_at, updated_at \
         FROM weather_events \
         WHERE external_id = $1",
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await
}

/// List weather events newest-first. `hours` of `0` returns events of any age.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_weather_events(
    pool: &PgPool,
    hours: i32,
    limit: i64,
) -> Result<Vec<WeatherEventRow>, sqlx::Error> {
    sqlx::query_as::<_, WeatherEventRow>(
        "SELECT external_id, event_type, severity, location, latitude, longitude, \
                starts_at, ends_at, description, rainfall_mm, wind_speed_kph, \
                temperature_c, humidity_pct, created_at, updated_at \
         FROM weather_events \
         WHERE ($1 <= 0 OR starts_at >= NOW() - make_interval(hours => $1)) \
         ORDER BY starts_at DESC \
         LIMIT $2",
    )
    .bind(hours)
    .bind(limit)
    .fetch_all(pool)
    .await
}
