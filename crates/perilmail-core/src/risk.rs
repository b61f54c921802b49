//! Risk classification for outreach prioritization. Two strategies share one
//! ordinal [`RiskLevel`]: a threshold rule for earthquakes and an additive
//! score for severe weather.

use serde::{Deserialize, Serialize};

/// Outreach risk tier. Ordinal: `High > Medium > Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a prospect against an earthquake.
///
/// Value floors apply regardless of distance: a $1M+ home is always High and
/// a $500k+ home at least Medium, so far-but-valuable homes still rank for
/// outreach. Within 50 km a M3.0+ shake or a $500k home is High; within
/// 100 km a M2.0+ shake or a $200k home is Medium. Monotonic in each
/// argument.
#[must_use]
pub fn earthquake_risk(distance_km: f64, magnitude: f64, house_value: i64) -> RiskLevel {
    if house_value >= 1_000_000
        || (distance_km <= 50.0 && (magnitude >= 3.0 || house_value >= 500_000))
    {
        RiskLevel::High
    } else if house_value >= 500_000
        || (distance_km <= 100.0 && (magnitude >= 2.0 || house_value >= 200_000))
    {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Classify a prospect against a severe weather event.
///
/// Additive score: proximity (≤10 km +3, ≤25 km +2, ≤50 km +1), severity
/// (severe +3, heavy +2, moderate +1), event type (cyclone/flood +3,
/// storm +2, rain +1) and house value (≥$1M +2, ≥$500k +1). Score ≥7 is
/// High, ≥4 Medium, otherwise Low. Unrecognized severity or type strings
/// contribute nothing.
#[must_use]
pub fn weather_risk(
    distance_km: f64,
    severity: &str,
    event_type: &str,
    house_value: i64,
) -> RiskLevel {
    let mut score: u8 = 0;

    if distance_km <= 10.0 {
        score += 3;
    } else if distance_km <= 25.0 {
        score += 2;
    } else if distance_km <= 50.0 {
        score += 1;
    }

    score += match severity.to_ascii_lowercase().as_str() {
        "severe" => 3,
        "heavy" => 2,
        "moderate" => 1,
        _ => 0,
    };

    score += match event_type.to_ascii_lowercase().as_str() {
        "cyclone" | "flood" => 3,
        "storm" => 2,
        "rain" => 1,
        _ => 0,
    };

    if house_value >= 1_000_000 {
        score += 2;
    } else if house_value >= 500_000 {
        score += 1;
    }

    if score >= 7 {
        RiskLevel::High
    } else if score >= 4 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
