//! Synthetic person generation for development and load testing.
//!
//! Locations skew towards seismically active metros so that a freshly seeded
//! database produces useful targeting results for real USGS feeds.

use rand::Rng;
use sqlx::PgPool;

use crate::persons::{insert_persons, NewPerson};
use crate::DbError;

const INSERT_CHUNK_SIZE: usize = 500;

struct SeedLocation {
    city: &'static str,
    state: &'static str,
    latitude: f64,
    longitude: f64,
    weight: u32,
}

#[rustfmt::skip]
const LOCATIONS: &[SeedLocation] = &[
    // California
    SeedLocation { city: "Los Angeles", state: "CA", latitude: 34.0522, longitude: -118.2437, weight: 15 },
    SeedLocation { city: "San Francisco", state: "CA", latitude: 37.7749, longitude: -122.4194, weight: 12 },
    SeedLocation { city: "San Diego", state: "CA", latitude: 32.7157, longitude: -117.1611, weight: 10 },
    SeedLocation { city: "San Jose", state: "CA", latitude: 37.3382, longitude: -121.8863, weight: 8 },
    SeedLocation { city: "Oakland", state: "CA", latitude: 37.8044, longitude: -122.2712, weight: 6 },
    SeedLocation { city: "Sacramento", state: "CA", latitude: 38.5816, longitude: -121.4944, weight: 5 },
    SeedLocation { city: "Long Beach", state: "CA", latitude: 33.7701, longitude: -118.1937, weight: 4 },
    SeedLocation { city: "Anaheim", state: "CA", latitude: 33.8366, longitude: -117.9143, weight: 4 },
    SeedLocation { city: "Riverside", state: "CA", latitude: 33.9533, longitude: -117.3962, weight: 3 },
    SeedLocation { city: "Fresno", state: "CA", latitude: 36.7378, longitude: -119.7871, weight: 3 },
    SeedLocation { city: "Bakersfield", state: "CA", latitude: 35.3733, longitude: -119.0187, weight: 2 },
    SeedLocation { city: "Irvine", state: "CA", latitude: 33.6846, longitude: -117.8265, weight: 2 },
    SeedLocation { city: "Fremont", state: "CA", latitude: 37.5483, longitude: -121.9886, weight: 2 },
    // Pacific Northwest
    SeedLocation { city: "Seattle", state: "WA", latitude: 47.6062, longitude: -122.3321, weight: 8 },
    SeedLocation { city: "Portland", state: "OR", latitude: 45.5152, longitude: -122.6784, weight: 6 },
    SeedLocation { city: "Tacoma", state: "WA", latitude: 47.2529, longitude: -122.4443, weight: 2 },
    SeedLocation { city: "Eugene", state: "OR", latitude: 44.0521, longitude: -123.0868, weight: 2 },
    // Alaska
    SeedLocation { city: "Anchorage", state: "AK", latitude: 61.2181, longitude: -149.9003, weight: 3 },
    SeedLocation { city: "Fairbanks", state: "AK", latitude: 64.8378, longitude: -147.7164, weight: 1 },
    SeedLocation { city: "Juneau", state: "AK", latitude: 58.3019, longitude: -134.4197, weight: 1 },
    // New Madrid seismic zone
    SeedLocation { city: "Memphis", state: "TN", latitude: 35.1495, longitude: -90.0490, weight: 4 },
    SeedLocation { city: "St. Louis", state: "MO", latitude: 38.6270, longitude: -90.1994, weight: 3 },
    SeedLocation { city: "Little Rock", state: "AR", latitude: 34.7465, longitude: -92.2896, weight: 2 },
    SeedLocation { city: "Nashville", state: "TN", latitude: 36.1627, longitude: -86.7816, weight: 2 },
    // Eastern US
    SeedLocation { city: "New York", state: "NY", latitude: 40.7128, longitude: -74.0060, weight: 6 },
    SeedLocation { city: "Boston", state: "MA", latitude: 42.3601, longitude: -71.0589, weight: 4 },
    SeedLocation { city: "Philadelphia", state: "PA", latitude: 39.9526, longitude: -75.1652, weight: 3 },
    SeedLocation { city: "Washington", state: "DC", latitude: 38.9072, longitude: -77.0369, weight: 3 },
    SeedLocation { city: "Atlanta", state: "GA", latitude: 33.7490, longitude: -84.3880, weight: 3 },
    SeedLocation { city: "Miami", state: "FL", latitude: 25.7617, longitude: -80.1918, weight: 3 },
    SeedLocation { city: "Charlotte", state: "NC", latitude: 35.2271, longitude: -80.8431, weight: 2 },
    // Central US
    SeedLocation { city: "Chicago", state: "IL", latitude: 41.8781, longitude: -87.6298, weight: 4 },
    SeedLocation { city: "Detroit", state: "MI", latitude: 42.3314, longitude: -83.0458, weight: 3 },
    SeedLocation { city: "Kansas City", state: "MO", latitude: 39.0997, longitude: -94.5786, weight: 2 },
    SeedLocation { city: "Minneapolis", state: "MN", latitude: 44.9778, longitude: -93.2650, weight: 2 },
    // Texas
    SeedLocation { city: "Houston", state: "TX", latitude: 29.7604, longitude: -95.3698, weight: 4 },
    SeedLocation { city: "Dallas", state: "TX", latitude: 32.7767, longitude: -96.7970, weight: 4 },
    SeedLocation { city: "San Antonio", state: "TX", latitude: 29.4241, longitude: -98.4936, weight: 3 },
    SeedLocation { city: "Austin", state: "TX", latitude: 30.2672, longitude: -97.7431, weight: 3 },
    // Mountain West
    SeedLocation { city: "Denver", state: "CO", latitude: 39.7392, longitude: -104.9903, weight: 3 },
    SeedLocation { city: "Salt Lake City", state: "UT", latitude: 40.7608, longitude: -111.8910, weight: 2 },
    SeedLocation { city: "Phoenix", state: "AZ", latitude: 33.4484, longitude: -112.0740, weight: 3 },
    SeedLocation { city: "Las Vegas", state: "NV", latitude: 36.1699, longitude: -115.1398, weight: 2 },
    SeedLocation { city: "Reno", state: "NV", latitude: 39.5296, longitude: -119.8138, weight: 1 },
    SeedLocation { city: "Boise", state: "ID", latitude: 43.6150, longitude: -116.2023, weight: 1 },
    // Hawaii
    SeedLocation { city: "Honolulu", state: "HI", latitude: 21.3099, longitude: -157.8581, weight: 2 },
    SeedLocation { city: "Hilo", state: "HI", latitude: 19.7297, longitude: -155.0900, weight: 1 },
];

const FIRST_NAMES: &[&str] = &[
    "John", "Jane", "Michael", "Sarah", "David", "Emily", "Robert", "Jessica", "William",
    "Ashley", "James", "Amanda", "Christopher", "Stephanie", "Daniel", "Melissa", "Matthew",
    "Nicole", "Anthony", "Elizabeth", "Mark", "Helen", "Donald", "Maria", "Steven", "Michelle",
    "Paul", "Laura", "Andrew", "Lisa", "Joshua", "Kimberly", "Kenneth", "Deborah", "Kevin",
    "Dorothy", "Brian", "Nancy", "Edward", "Karen", "Ronald", "Betty", "Timothy", "Sandra",
    "Jeffrey", "Donna", "Ryan", "Carol",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White", "Harris", "Sanchez",
    "Clark", "Ramirez", "Lewis", "Robinson", "Walker", "Young", "Allen", "King", "Wright",
    "Scott", "Torres", "Nguyen", "Hill", "Flores", "Green", "Adams", "Nelson", "Baker", "Hall",
    "Rivera", "Campbell", "Mitchell", "Carter", "Roberts", "Kim", "Patel", "Tran", "Chavez",
    "Murphy", "Sullivan", "Cook", "Morgan", "Cooper", "Peterson", "Bailey", "Reed", "Kelly",
    "Howard",
];

const EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "aol.com",
    "icloud.com",
];

const EMAIL_SEPARATORS: &[&str] = &[".", "_", ""];

fn weighted_location(rng: &mut impl Rng) -> &'static SeedLocation {
    let total: u32 = LOCATIONS.iter().map(|l| l.weight).sum();
    let mut roll = rng.random_range(0..total);
    for location in LOCATIONS {
        if roll < location.weight {
            return location;
        }
        roll -= location.weight;
    }
    &LOCATIONS[LOCATIONS.len() - 1]
}

fn pick<'a>(rng: &mut impl Rng, pool: &[&'a str]) -> &'a str {
    pool[rng.random_range(0..pool.len())]
}

/// Generate `count` synthetic persons.
///
/// Emails embed the running index, so every record in one batch is unique
/// and the email-keyed upsert never sees the same key twice.
#[must_use]
pub fn generate_persons(count: usize) -> Vec<NewPerson> {
    let mut rng = rand::rng();
    let mut persons = Vec::with_capacity(count);

    for index in 0..count {
        let location = weighted_location(&mut rng);
        let first_name = pick(&mut rng, FIRST_NAMES);
        let last_name = pick(&mut rng, LAST_NAMES);

        let email = format!(
            "{}{}{}{}@{}",
            first_name.to_lowercase(),
            pick(&mut rng, EMAIL_SEPARATORS),
            last_name.to_lowercase(),
            index,
            pick(&mut rng, EMAIL_DOMAINS),
        );

        let phone = format!(
            "{}{}{}",
            rng.random_range(200..=999),
            rng.random_range(200..=999),
            rng.random_range(1000..=9999),
        );

        let base_value = rng.random_range(200_000..=800_000) as f64;
        let house_value = (base_value * rng.random_range(0.7..=1.3)).round() as i64;

        persons.push(NewPerson {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email,
            phone: Some(phone),
            city: location.city.to_string(),
            state: location.state.to_string(),
            latitude: location.latitude + rng.random_range(-0.05..=0.05),
            longitude: location.longitude + rng.random_range(-0.05..=0.05),
            house_value,
            has_insurance: rng.random_bool(0.4),
            homeowner: Some(rng.random_bool(0.7)),
            // Only a known opt-out is recorded; everyone else stays unknown.
            do_not_call: rng.random_bool(0.2).then_some(true),
        });
    }

    persons
}

/// Generate and insert `count` synthetic persons in chunks.
///
/// Returns `(new_count, updated_count)` totals across all chunks.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails.
pub async fn seed_persons(pool: &PgPool, count: usize) -> Result<(u64, u64), DbError> {
    let persons = generate_persons(count);
    let mut new_total = 0u64;
    let mut updated_total = 0u64;

    for chunk in persons.chunks(INSERT_CHUNK_SIZE) {
        let (new_count, updated_count) = insert_persons(pool, chunk).await?;
        new_total += new_count;
        updated_total += updated_count;
    }

    Ok((new_total, updated_total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_the_requested_count() {
        assert_eq!(generate_persons(0).len(), 0);
        assert_eq!(generate_persons(37).len(), 37);
    }

    #[test]
    fn emails_are_unique_within_a_batch() {
        let persons = generate_persons(200);
        let mut emails: Vec<&str> = persons.iter().map(|p| p.email.as_str()).collect();
        emails.sort_unstable();
        emails.dedup();

        assert_eq!(emails.len(), persons.len());
    }

    #[test]
    fn house_values_stay_in_the_generator_range() {
        // 200k * 0.7 .. 800k * 1.3
        for person in generate_persons(500) {
            assert!(person.house_value >= 140_000, "low: {}", person.house_value);
            assert!(person.house_value <= 1_040_000, "high: {}", person.house_value);
        }
    }

    #[test]
    fn coordinates_stay_near_the_chosen_city() {
        for person in generate_persons(300) {
            let city = LOCATIONS
                .iter()
                .find(|l| l.city == person.city)
                .unwrap_or_else(|| panic!("unknown city {}", person.city));

            assert!((person.latitude - city.latitude).abs() <= 0.05 + f64::EPSILON);
            assert!((person.longitude - city.longitude).abs() <= 0.05 + f64::EPSILON);
        }
    }

    #[test]
    fn do_not_call_is_only_ever_true_or_unknown() {
        assert!(generate_persons(300)
            .iter()
            .all(|p| p.do_not_call != Some(false)));
    }
}
