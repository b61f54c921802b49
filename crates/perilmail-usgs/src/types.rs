//! USGS FDSN event feed types.
//!
//! The feed returns a GeoJSON `FeatureCollection`; [`FeatureCollection`] and
//! friends model just the fields the service needs, and [`FeedEarthquake`]
//! flattens a feature into one record with the coordinate triple unpacked.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// Query for the event feed: a bounding box, a look-back window, and an
/// optional magnitude floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventQuery {
    /// `[min_lng, min_lat, max_lng, max_lat]`, GeoJSON axis order.
    pub bbox: [f64; 4],
    pub hours: i64,
    /// Values `<= 0` leave the magnitude filter off entirely.
    pub min_magnitude: f64,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            // Roughly California; the densest feed region for demos.
            bbox: [-125.0, 32.0, -114.0, 42.0],
            hours: 24,
            min_magnitude: 2.0,
        }
    }
}

/// Top-level GeoJSON envelope returned by the feed.
#[derive(Debug, Deserialize)]
pub(crate) struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Feature {
    pub id: String,
    #[serde(default)]
    pub properties: FeatureProperties,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FeatureProperties {
    pub mag: Option<f64>,
    /// Event time in Unix milliseconds.
    pub time: Option<i64>,
    pub place: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Geometry {
    /// `[longitude, latitude, depth_km]`.
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

/// One earthquake from the feed, flattened out of the GeoJSON envelope.
///
/// Every field except `id` is optional: the feed omits magnitudes for some
/// events and occasionally ships features without geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEarthquake {
    pub id: String,
    pub magnitude: Option<f64>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub place: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub depth_km: Option<f64>,
    pub url: Option<String>,
}

impl From<Feature> for FeedEarthquake {
    fn from(feature: Feature) -> Self {
        let coordinates = feature
            .geometry
            .map(|g| g.coordinates)
            .unwrap_or_default();

        Self {
            id: feature.id,
            magnitude: feature.properties.mag,
            occurred_at: feature
                .properties
                .time
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            place: feature.properties.place,
            longitude: coordinates.first().copied(),
            latitude: coordinates.get(1).copied(),
            depth_km: coordinates.get(2).copied(),
            url: feature.properties.url,
        }
    }
}
