//! Read/write operations for the `earthquakes` table.

use chrono::{DateTime, Utc};
use perilmail_core::BoundingBox;
use sqlx::PgPool;

/// Input record for upserting an earthquake, keyed by the feed's event id.
#[derive(Debug, Clone)]
pub struct NewEarthquake {
    pub external_id: String,
    pub occurred_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub magnitude: Option<f64>,
    pub depth_km: Option<f64>,
    pub place: Option<String>,
    pub url: Option<String>,
}

/// A row from the `earthquakes` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EarthquakeRow {
    pub external_id: String,
    pub occurred_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub magnitude: Option<f64>,
    pub depth_km: Option<f64>,
    pub place: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for listing earthquakes. Zero values disable the corresponding cut.
#[derive(Debug, Clone, Default)]
pub struct EarthquakeFilter {
    pub min_magnitude: f64,
    /// Look-back window; `0` returns events of any age.
    pub hours: i32,
    pub bbox: Option<BoundingBox>,
    pub limit: i64,
}

/// Upsert earthquakes keyed by `external_id`.
///
/// Returns `(new_count, updated_count)`. Re-ingesting the same feed is
/// idempotent: rows keep their `created_at` and only `updated_at` moves.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn upsert_earthquakes(
    pool: &PgPool,
    earthquakes: &[NewEarthquake],
) -> Result<(u64, u64), sqlx::Error> {
    if earthquakes.is_empty() {
        return Ok((0, 0));
    }

    let mut external_ids: Vec<String> = Vec::with_capacity(earthquakes.len());
    let mut occurred_ats: Vec<Option<DateTime<Utc>>> = Vec::with_capacity(earthquakes.len());
    let mut latitudes: Vec<Option<f64>> = Vec::with_capacity(earthquakes.len());
    let mut longitudes: Vec<Option<f64>> = Vec::with_capacity(earthquakes.len());
    let mut magnitudes: Vec<Option<f64>> = Vec::with_capacity(earthquakes.len());
    let mut depths: Vec<Option<f64>> = Vec::with_capacity(earthquakes.len());
    let mut places: Vec<Option<String>> = Vec::with_capacity(earthquakes.len());
    let mut urls: Vec<Option<String>> = Vec::with_capacity(earthquakes.len());

    for quake in earthquakes {
        external_ids.push(quake.external_id.clone());
        occurred_ats.push(quake.occurred_at);
        latitudes.push(quake.latitude);
        longitudes.push(quake.longitude);
        magnitudes.push(quake.magnitude);
        depths.push(quake.depth_km);
        places.push(quake.place.clone());
        urls.push(quake.url.clone());
    }

    let rows: Vec<bool> = sqlx::query_scalar::<_, bool>(
        "INSERT INTO earthquakes \
             (external_id, occurred_at, latitude, longitude, magnitude, depth_km, place, url) \
         SELECT * FROM UNNEST(\
              $1::text[], $2::timestamptz[], $3::float8[], $4::float8[], \
              $5::float8[], $6::float8[], $7::text[], $8::text[]) \
         ON CONFLICT (external_id) DO UPDATE SET \
             occurred_at = EXCLUDED.occurred_at, \
             latitude    = EXCLUDED.latitude, \
             longitude   = EXCLUDED.longitude, \
             magnitude   = EXCLUDED.magnitude, \
             depth_km    = EXCLUDED.depth_km, \
             place       = EXCLUDED.place, \
             url         = EXCLUDED.url, \
             updated_at  = NOW() \
         RETURNING (xmax = 0) AS is_new",
    )
    .bind(&external_ids)
    .bind(&occurred_ats)
    .bind(&latitudes)
    .bind(&longitudes)
    .bind(&magnitudes)
    .bind(&depths)
    .bind(&places)
    .bind(&urls)
    .fetch_all(pool)
    .await?;

    let new_count = rows.iter().filter(|&&is_new| is_new).count() as u64;
    let updated_count = rows.len() as u64 - new_count;

    Ok((new_count, updated_count))
}

/// Look up a single earthquake by its feed id.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn find_earthquake(
    pool: &PgPool,
    external_id: &str,
) -> Result<Option<EarthquakeRow>, sqlx::Error> {
    sqlx::query_as::<_, EarthquakeRow>(
        "SELECT external_id, occurred_at, latitude, longitude, magnitude, depth_km, place, url, \
                created_at, updated_at \
         FROM earthquakes \
         WHERE external_id = $1",
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await
}

/// List earthquakes newest-first, applying the filter's cuts.
///
/// Unknown magnitudes count as `0.0` for the magnitude cut, so they survive
/// the default filter but drop out once a positive threshold is set.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_earthquakes(
    pool: &PgPool,
    filter: &EarthquakeFilter,
) -> Result<Vec<EarthquakeRow>, sqlx::Error> {
    let (min_lat, max_lat, min_lng, max_lng) = match &filter.bbox {
        Some(bbox) => (
            Some(bbox.min_lat),
            Some(bbox.max_lat),
            Some(bbox.min_lng),
            Some(bbox.max_lng),
        ),
        None => (None, None, None, None),
    };

    sqlx::query_as::<_, EarthquakeRow>(
        "SELECT external_id, occurred_at, latitude, longitude, magnitude, depth_km, place, url, \
                created_at, updated_at \
         FROM earthquakes \
         WHERE COALESCE(magnitude, 0) >= $1 \
           AND ($2 <= 0 OR occurred_at >= NOW() - make_interval(hours => $2)) \
           AND ($3::float8 IS NULL OR (latitude BETWEEN $3 AND $4 AND longitude BETWEEN $5 AND $6)) \
         ORDER BY occurred_at DESC NULLS LAST, magnitude DESC NULLS LAST \
         LIMIT $7",
    )
    .bind(filter.min_magnitude)
    .bind(filter.hours)
    .bind(min_lat)
    .bind(max_lat)
    .bind(min_lng)
    .bind(max_lng)
    .bind(filter.limit)
    .fetch_all(pool)
    .await
}
