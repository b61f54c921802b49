//! Read/write operations for the `persons` table.

use chrono::{DateTime, Utc};
use perilmail_core::{BoundingBox, Candidate};
use sqlx::PgPool;
use uuid::Uuid;

/// Input record for inserting a person.
#[derive(Debug, Clone)]
pub struct NewPerson {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    pub house_value: i64,
    pub has_insurance: bool,
    pub homeowner: Option<bool>,
    pub do_not_call: Option<bool>,
}

/// A row from the `persons` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PersonRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    pub house_value: i64,
    pub has_insurance: bool,
    pub homeowner: Option<bool>,
    pub do_not_call: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl From<PersonRow> for Candidate {
    fn from(row: PersonRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            city: row.city,
            state: row.state,
            latitude: row.latitude,
            longitude: row.longitude,
            house_value: row.house_value,
            has_insurance: row.has_insurance,
            homeowner: row.homeowner,
            do_not_call: row.do_not_call,
        }
    }
}

/// Insert persons, updating existing rows on email conflict.
///
/// Returns `(new_count, updated_count)` where:
/// - `new_count`: rows that did not exist before (were inserted)
/// - `updated_count`: rows whose email already existed (were updated)
///
/// Uses a single `INSERT … SELECT * FROM UNNEST(…) ON CONFLICT` so that
/// the entire batch is upserted in one round-trip regardless of batch size.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn insert_persons(pool: &PgPool, persons: &[NewPerson]) -> Result<(u64, u64), sqlx::Error> {
    if persons.is_empty() {
        return Ok((0, 0));
    }

    // Collect each column into a parallel Vec for UNNEST binding.
    let mut first_names: Vec<String> = Vec::with_capacity(persons.len());
    let mut last_names: Vec<String> = Vec::with_capacity(persons.len());
    let mut emails: Vec<String> = Vec::with_capacity(persons.len());
    let mut phones: Vec<Option<String>> = Vec::with_capacity(persons.len());
    let mut cities: Vec<String> = Vec::with_capacity(persons.len());
    let mut states: Vec<String> = Vec::with_capacity(persons.len());
    let mut latitudes: Vec<f64> = Vec::with_capacity(persons.len());
    let mut longitudes: Vec<f64> = Vec::with_capacity(persons.len());
    let mut house_values: Vec<i64> = Vec::with_capacity(persons.len());
    let mut has_insurances: Vec<bool> = Vec::with_capacity(persons.len());
    let mut homeowners: Vec<Option<bool>> = Vec::with_capacity(persons.len());
    let mut do_not_calls: Vec<Option<bool>> = Vec::with_capacity(persons.len());

    for person in persons {
        first_names.push(person.first_name.clone());
        last_names.push(person.last_name.clone());
        emails.push(person.email.clone());
        phones.push(person.phone.clone());
        cities.push(person.city.clone());
        states.push(person.state.clone());
        latitudes.push(person.latitude);
        longitudes.push(person.longitude);
        house_values.push(person.house_value);
        has_insurances.push(person.has_insurance);
        homeowners.push(person.homeowner);
        do_not_calls.push(person.do_not_call);
    }

    let rows: Vec<bool> = sqlx::query_scalar::<_, bool>(
        "INSERT INTO persons \
             (first_name, last_name, email, phone, city, state, \
              latitude, longitude, house_value, has_insurance, homeowner, do_not_call) \
         SELECT * FROM UNNEST(\
              $1::text[], $2::text[], $3::text[], $4::text[], $5::text[], $6::text[], \
              $7::float8[], $8::float8[], $9::int8[], $10::bool[], $11::bool[], $12::bool[]) \
         ON CONFLICT (email) DO UPDATE SET \
             first_name    = EXCLUDED.first_name, \
             last_name     = EXCLUDED.last_name, \
             phone         = EXCLUDED.phone, \
             city          = EXCLUDED.city, \
             state         = EXCLUDED.state, \
             latitude      = EXCLUDED.latitude, \
             longitude     = EXCLUDED.longitude, \
             house_value   = EXCLUDED.house_value, \
             has_insurance = EXCLUDED.has_insurance, \
             homeowner     = EXCLUDED.homeowner, \
             do_not_call   = EXCLUDED.do_not_call \
         RETURNING (xmax = 0) AS is_new",
    )
    .bind(&first_names)
    .bind(&last_names)
    .bind(&emails)
    .bind(&phones)
    .bind(&cities)
    .bind(&states)
    .bind(&latitudes)
    .bind(&longitudes)
    .bind(&house_values)
    .bind(&has_insurances)
    .bind(&homeowners)
    .bind(&do_not_calls)
    .fetch_all(pool)
    .await?;

    let new_count = rows.iter().filter(|&&is_new| is_new).count() as u64;
    let updated_count = rows.len() as u64 - new_count;

    Ok((new_count, updated_count))
}

/// Fetch persons inside a bounding box whose house value clears the given
/// thresholds, most valuable first.
///
/// The box is a coarse prefetch; callers apply the exact distance cut
/// afterwards. `max_house_value` of `None` leaves the upper bound open.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn find_persons_in_bbox(
    pool: &PgPool,
    bbox: &BoundingBox,
    min_house_value: i64,
    max_house_value: Option<i64>,
    limit: i64,
) -> Result<Vec<PersonRow>, sqlx::Error> {
    sqlx::query_as::<_, PersonRow>(
        "SELECT id, first_name, last_name, email, phone, city, state, \
                latitude, longitude, house_value, has_insurance, homeowner, do_not_call, \
                created_at \
         FROM persons \
         WHERE latitude BETWEEN $1 AND $2 \
           AND longitude BETWEEN $3 AND $4 \
           AND house_value >= $5 \
           AND ($6::int8 IS NULL OR house_value <= $6) \
         ORDER BY house_value DESC \
         LIMIT $7",
    )
    .bind(bbox.min_lat)
    .bind(bbox.max_lat)
    .bind(bbox.min_lng)
    .bind(bbox.max_lng)
    .bind(min_house_value)
    .bind(max_house_value)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Count all persons.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn count_persons(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM persons")
        .fetch_one(pool)
        .await
}

/// Delete every person row. Used by the seeder's reset path.
///
/// Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn delete_all_persons(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let rows_affected = sqlx::query("DELETE FROM persons")
        .execute(pool)
        .await?
        .rows_affected();

    Ok(rows_affected)
}
