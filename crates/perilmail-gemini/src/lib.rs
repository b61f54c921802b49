//! Client for the Gemini `generateContent` API.
//!
//! Builds peril-specific outreach prompts, runs the generation call, and
//! parses replies into subject/body pairs with deterministic fallbacks for
//! non-JSON model output.

pub mod client;
pub mod error;
pub mod parse;
pub mod prompt;

pub use client::GeminiClient;
pub use error::GeminiError;
pub use parse::{parse_generated_email, GeneratedEmail};
pub use prompt::{
    earthquake_prompt, fallback_subject, weather_prompt, EarthquakeFacts, Recipient, WeatherFacts,
};
