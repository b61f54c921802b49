//! Great-circle distance and degree-box helpers used by the targeting
//! pipeline. Everything here is pure math over WGS84-ish decimal degrees.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers, as used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Rough width of one degree of latitude in kilometers. Good enough for the
/// coarse prefilter box; exact distances are recomputed per candidate.
const KM_PER_DEGREE: f64 = 111.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Degree-aligned box around a point, used to prefilter candidates in SQL
/// before exact distances are computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// Great-circle distance between two points in kilometers (Haversine).
///
/// Pure and symmetric; NaN inputs propagate, callers validate coordinates.
#[must_use]
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Box of `radius_km` around `center`, using the 1° ≈ 111 km approximation on
/// both axes. Over-selects away from the equator, which is fine for a
/// prefilter.
#[must_use]
pub fn bounding_box(center: GeoPoint, radius_km: f64) -> BoundingBox {
    let delta = radius_km / KM_PER_DEGREE;
    BoundingBox {
        min_lat: center.latitude - delta,
        max_lat: center.latitude + delta,
        min_lng: center.longitude - delta,
        max_lng: center.longitude + delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOS_ANGELES: GeoPoint = GeoPoint {
        latitude: 34.0522,
        longitude: -118.2437,
    };
    const SAN_FRANCISCO: GeoPoint = GeoPoint {
        latitude: 37.7749,
        longitude: -122.4194,
    };

    #[test]
    fn distance_to_self_is_zero() {
        assert!(haversine_km(LOS_ANGELES, LOS_ANGELES).abs() < f64::EPSILON);
    }

    #[test]
    fn distance_is_symmetric() {
        let there = haversine_km(LOS_ANGELES, SAN_FRANCISCO);
        let back = haversine_km(SAN_FRANCISCO, LOS_ANGELES);
        assert!((there - back).abs() < 1e-9, "asymmetric: {there} vs {back}");
    }

    #[test]
    fn la_to_sf_is_roughly_559_km() {
        let d = haversine_km(LOS_ANGELES, SAN_FRANCISCO);
        assert!((d - 559.0).abs() < 2.0, "got {d}");
    }

    #[test]
    fn bounding_box_spans_radius_on_both_axes() {
        let bbox = bounding_box(LOS_ANGELES, 111.0);
        assert!((bbox.max_lat - bbox.min_lat - 2.0).abs() < 1e-9);
        assert!((bbox.max_lng - bbox.min_lng - 2.0).abs() < 1e-9);
        assert!(bbox.min_lat < LOS_ANGELES.latitude && LOS_ANGELES.latitude < bbox.max_lat);
    }
}
