//! `{placeholder}` substitution for outreach subjects and bodies.
//!
//! One vocabulary covers both event kinds; weather tokens are only populated
//! for weather targets and vice versa. Unknown tokens pass through untouched,
//! which makes rendering idempotent once no recognized tokens remain.

use std::collections::HashMap;

use regex::Regex;

use crate::risk::RiskLevel;
use crate::targeting::Target;

/// Weather event attributes used for template substitution.
#[derive(Debug, Clone)]
pub struct WeatherDetails {
    pub event_type: String,
    pub severity: String,
    pub location: String,
    pub rainfall_mm: Option<f64>,
    pub wind_speed_kph: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
}

/// Placeholder values for one recipient.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: HashMap<&'static str, String>,
}

impl TemplateVars {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &'static str, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Person vocabulary: `{first_name}`, `{last_name}`, `{full_name}`,
    /// `{city}`, `{state}` and the thousands-separated `{house_value}`.
    #[must_use]
    pub fn for_person(
        first_name: &str,
        last_name: &str,
        city: &str,
        state: &str,
        house_value: i64,
    ) -> Self {
        let mut vars = Self::new();
        vars.set("first_name", first_name);
        vars.set("last_name", last_name);
        vars.set("full_name", format!("{first_name} {last_name}"));
        vars.set("city", city);
        vars.set("state", state);
        vars.set("house_value", thousands(house_value));
        vars
    }

    /// Adds `{distance_km}` and `{risk_level}`.
    #[must_use]
    pub fn with_target_context(mut self, distance_km: f64, risk_level: RiskLevel) -> Self {
        self.set("distance_km", distance_km.to_string());
        self.set("risk_level", risk_level.as_str());
        self
    }

    /// Full base vocabulary for a selected target.
    #[must_use]
    pub fn for_target(target: &Target) -> Self {
        let person = &target.candidate;
        Self::for_person(
            &person.first_name,
            &person.last_name,
            &person.city,
            &person.state,
            person.house_value,
        )
        .with_target_context(target.distance_km, target.risk_level)
    }

    /// Adds `{magnitude}` and `{event_place}`, with the `Unknown` fallbacks
    /// the feed data forces on us.
    #[must_use]
    pub fn with_earthquake(mut self, magnitude: Option<f64>, place: Option<&str>) -> Self {
        self.set(
            "magnitude",
            magnitude.map_or_else(|| "Unknown".to_string(), |m| m.to_string()),
        );
        self.set("event_place", place.unwrap_or("Unknown location"));
        self
    }

    /// Adds the weather vocabulary. Missing measurements render as `N/A`;
    /// present ones carry their unit suffix.
    #[must_use]
    pub fn with_weather(mut self, details: &WeatherDetails) -> Self {
        self.set("weather_event_type", details.event_type.clone());
        self.set("weather_severity", details.severity.clone());
        self.set("weather_location", details.location.clone());
        self.set("rainfall", measurement(details.rainfall_mm, "mm"));
        self.set("wind_speed", measurement(details.wind_speed_kph, " km/h"));
        self.set("temperature", measurement(details.temperature_c, "°C"));
        self.set("humidity", measurement(details.humidity_pct, "%"));
        self
    }
}

/// Replace every recognized `{placeholder}` with its value; unrecognized
/// tokens are left exactly as written.
#[must_use]
pub fn render(template: &str, vars: &TemplateVars) -> String {
    let token = Regex::new(r"\{([a-z_]+)\}").expect("valid placeholder regex");
    token
        .replace_all(template, |caps: &regex::Captures<'_>| {
            vars.get(&caps[1])
                .map_or_else(|| caps[0].to_string(), ToString::to_string)
        })
        .into_owned()
}

fn thousands(value: i64) -> String {
    let raw = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        format!("-{out}")
    } else {
        out
    }
}

fn measurement(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v}{unit}"))
}
