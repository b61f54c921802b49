//! Outreach target selection. Callers prefilter candidates with the degree
//! box from [`crate::geo::bounding_box`]; this module applies exact distance,
//! attribute filters, risk classification and the event-specific ordering.
//! Targets are derived per request and never persisted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::{haversine_km, GeoPoint};
use crate::risk::{earthquake_risk, weather_risk, RiskLevel};

/// Width of the proximity band inside which earthquake ordering prefers the
/// more valuable home over the marginally closer one.
const NEAR_BAND_KM: f64 = 5.0;

/// A prospect as loaded from the person store. The `homeowner` and
/// `do_not_call` flags are tri-state: `None` means the enrichment data never
/// said either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub city: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    pub house_value: i64,
    pub has_insurance: bool,
    pub homeowner: Option<bool>,
    pub do_not_call: Option<bool>,
}

/// A candidate that survived selection, with its exact-then-rounded distance
/// and classified risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub candidate: Candidate,
    pub distance_km: f64,
    pub risk_level: RiskLevel,
}

fn default_max_distance_km() -> f64 {
    100.0
}

fn default_min_house_value() -> i64 {
    100_000
}

fn default_max_house_value() -> i64 {
    5_000_000
}

fn default_true() -> bool {
    true
}

fn default_earthquake_limit() -> usize {
    50
}

fn default_weather_limit() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarthquakeCriteria {
    #[serde(default = "default_max_distance_km")]
    pub max_distance_km: f64,
    #[serde(default = "default_min_house_value")]
    pub min_house_value: i64,
    #[serde(default = "default_true")]
    pub require_uninsured: bool,
    #[serde(default)]
    pub require_homeowner: bool,
    #[serde(default)]
    pub exclude_do_not_call: bool,
    #[serde(default = "default_earthquake_limit")]
    pub limit: usize,
}

impl Default for EarthquakeCriteria {
    fn default() -> Self {
        Self {
            max_distance_km: default_max_distance_km(),
            min_house_value: default_min_house_value(),
            require_uninsured: true,
            require_homeowner: false,
            exclude_do_not_call: false,
            limit: default_earthquake_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherCriteria {
    #[serde(default = "default_max_distance_km")]
    pub max_distance_km: f64,
    #[serde(default = "default_min_house_value")]
    pub min_house_value: i64,
    #[serde(default = "default_max_house_value")]
    pub max_house_value: i64,
    #[serde(default = "default_true")]
    pub require_uninsured: bool,
    #[serde(default = "default_true")]
    pub require_homeowner: bool,
    #[serde(default = "default_true")]
    pub exclude_do_not_call: bool,
    #[serde(default = "default_weather_limit")]
    pub limit: usize,
}

impl Default for WeatherCriteria {
    fn default() -> Self {
        Self {
            max_distance_km: default_max_distance_km(),
            min_house_value: default_min_house_value(),
            max_house_value: default_max_house_value(),
            require_uninsured: true,
            require_homeowner: true,
            exclude_do_not_call: true,
            limit: default_weather_limit(),
        }
    }
}

struct AttributeFilters {
    min_house_value: i64,
    max_house_value: Option<i64>,
    require_uninsured: bool,
    require_homeowner: bool,
    exclude_do_not_call: bool,
}

impl AttributeFilters {
    fn allows(&self, candidate: &Candidate) -> bool {
        if candidate.house_value < self.min_house_value {
            return false;
        }
        if let Some(max) = self.max_house_value {
            if candidate.house_value > max {
                return false;
            }
        }
        if self.require_uninsured && candidate.has_insurance {
            return false;
        }
        // Tri-state flags: only a known-false homeowner and a known-true DNC
        // disqualify; unknown passes through.
        if self.require_homeowner && candidate.homeowner == Some(false) {
            return false;
        }
        if self.exclude_do_not_call && candidate.do_not_call == Some(true) {
            return false;
        }
        true
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn distance_band(distance_km: f64) -> i64 {
    (distance_km / NEAR_BAND_KM).floor() as i64
}

/// Select and order outreach targets around an earthquake epicenter.
///
/// A missing magnitude classifies like zero. The full list is sorted before
/// it is truncated to `limit`, so the cut keeps the globally best targets:
/// closest first, except that homes within the same 5 km proximity band are
/// ranked by house value, highest first.
#[must_use]
pub fn select_earthquake_targets(
    epicenter: GeoPoint,
    magnitude: Option<f64>,
    candidates: Vec<Candidate>,
    criteria: &EarthquakeCriteria,
) -> Vec<Target> {
    let magnitude = magnitude.unwrap_or(0.0);
    let filters = AttributeFilters {
        min_house_value: criteria.min_house_value,
        max_house_value: None,
        require_uninsured: criteria.require_uninsured,
        require_homeowner: criteria.require_homeowner,
        exclude_do_not_call: criteria.exclude_do_not_call,
    };

    let mut targets: Vec<Target> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let point = GeoPoint::new(candidate.latitude, candidate.longitude);
            let distance = haversine_km(epicenter, point);
            if distance > criteria.max_distance_km || !filters.allows(&candidate) {
                return None;
            }
            let risk_level = earthquake_risk(distance, magnitude, candidate.house_value);
            Some(Target {
                distance_km: round_tenth(distance),
                risk_level,
                candidate,
            })
        })
        .collect();

    targets.sort_by(|a, b| {
        distance_band(a.distance_km)
            .cmp(&distance_band(b.distance_km))
            .then_with(|| b.candidate.house_value.cmp(&a.candidate.house_value))
            .then_with(|| a.distance_km.total_cmp(&b.distance_km))
    });
    targets.truncate(criteria.limit);
    targets
}

/// Select and order outreach targets around a severe weather event.
///
/// Severity and event type are event-level attributes shared by every
/// candidate. Ordering is risk tier descending, then distance ascending;
/// as with earthquakes, sorting happens before the `limit` cut.
#[must_use]
pub fn select_weather_targets(
    center: GeoPoint,
    severity: &str,
    event_type: &str,
    candidates: Vec<Candidate>,
    criteria: &WeatherCriteria,
) -> Vec<Target> {
    let filters = AttributeFilters {
        min_house_value: criteria.min_house_value,
        max_house_value: Some(criteria.max_house_value),
        require_uninsured: criteria.require_uninsured,
        require_homeowner: criteria.require_homeowner,
        exclude_do_not_call: criteria.exclude_do_not_call,
    };

    let mut targets: Vec<Target> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let point = GeoPoint::new(candidate.latitude, candidate.longitude);
            let distance = haversine_km(center, point);
            if distance > criteria.max_distance_km || !filters.allows(&candidate) {
                return None;
            }
            let risk_level = weather_risk(distance, severity, event_type, candidate.house_value);
            Some(Target {
                distance_km: round_tenth(distance),
                risk_level,
                candidate,
            })
        })
        .collect();

    targets.sort_by(|a, b| {
        b.risk_level
            .cmp(&a.risk_level)
            .then_with(|| a.distance_km.total_cmp(&b.distance_km))
    });
    targets.truncate(criteria.limit);
    targets
}
