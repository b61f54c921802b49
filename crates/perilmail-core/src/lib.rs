//! Configuration and the pure domain kernel shared by every perilmail crate:
//! great-circle geometry, risk classification, outreach target selection and
//! email template substitution. Nothing in here performs I/O.

pub mod config;
pub mod geo;
pub mod risk;
pub mod targeting;
pub mod template;

pub use config::{load_config, load_config_from_env, Config, ConfigError, Environment};
pub use geo::{bounding_box, haversine_km, BoundingBox, GeoPoint};
pub use risk::{earthquake_risk, weather_risk, RiskLevel};
pub use targeting::{
    select_earthquake_targets, select_weather_targets, Candidate, EarthquakeCriteria, Target,
    WeatherCriteria,
};
pub use template::{render, TemplateVars, WeatherDetails};
