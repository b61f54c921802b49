//! HTTP client for the USGS FDSN event feed.
//!
//! Wraps `reqwest` with feed-specific query building, typed GeoJSON
//! deserialization, and retry with back-off for transient failures.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Url};

use crate::error::UsgsError;
use crate::retry::retry_with_backoff;
use crate::types::{EventQuery, FeatureCollection, FeedEarthquake};

const DEFAULT_BASE_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/";
const DEFAULT_MAX_RETRIES: u32 = 3;
const BACKOFF_BASE_MS: u64 = 1_000;
/// Look-back windows are clamped to a year; the feed rejects huge ranges anyway.
const MAX_LOOKBACK_HOURS: i64 = 24 * 365;

/// Client for the USGS FDSN event feed.
///
/// Use [`UsgsClient::new`] for production or [`UsgsClient::with_base_url`]
/// to point at a mock server in tests.
pub struct UsgsClient {
    client: Client,
    query_url: Url,
}

impl UsgsClient {
    /// Creates a new client pointed at the production USGS feed.
    ///
    /// # Errors
    ///
    /// Returns [`UsgsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, UsgsError> {
        Self::with_base_url(timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`UsgsError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`UsgsError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, UsgsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Normalise: ensure the base URL ends with exactly one slash so that
        // join("query") appends a path segment rather than replacing the last
        // one.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let query_url = Url::parse(&normalised)
            .and_then(|base| base.join("query"))
            .map_err(|e| UsgsError::InvalidBaseUrl(format!("'{base_url}': {e}")))?;

        Ok(Self { client, query_url })
    }

    /// Fetches earthquakes matching `query`, newest first.
    ///
    /// Transient failures (timeouts, 5xx, 429) are retried with exponential
    /// back-off before the error is surfaced.
    ///
    /// # Errors
    ///
    /// - [`UsgsError::Http`] on network failure or a non-2xx HTTP status.
    /// - [`UsgsError::Deserialize`] if the response is not the expected
    ///   GeoJSON shape.
    pub async fn query_events(&self, query: &EventQuery) -> Result<Vec<FeedEarthquake>, UsgsError> {
        let hours = query.hours.clamp(0, MAX_LOOKBACK_HOURS);
        let starttime = Utc::now() - chrono::Duration::hours(hours);
        let url = self.build_url(query, starttime);

        let body = retry_with_backoff(DEFAULT_MAX_RETRIES, BACKOFF_BASE_MS, || {
            let url = url.clone();
            async move { self.request_text(&url).await }
        })
        .await?;

        let collection: FeatureCollection =
            serde_json::from_str(&body).map_err(|e| UsgsError::Deserialize {
                context: url.to_string(),
                source: e,
            })?;

        Ok(collection
            .features
            .into_iter()
            .map(FeedEarthquake::from)
            .collect())
    }

    /// Builds the full request URL with properly percent-encoded query
    /// parameters.
    ///
    /// The feed expects the bounding box as four separate min/max parameters
    /// and skips the magnitude filter entirely when the floor is zero.
    fn build_url(&self, query: &EventQuery, starttime: DateTime<Utc>) -> Url {
        let [min_lng, min_lat, max_lng, max_lat] = query.bbox;
        let mut url = self.query_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("format", "geojson");
            pairs.append_pair(
                "starttime",
                &starttime.to_rfc3339_opts(SecondsFormat::Millis, true),
            );
            pairs.append_pair("orderby", "time");
            pairs.append_pair("minlatitude", &min_lat.to_string());
            pairs.append_pair("maxlatitude", &max_lat.to_string());
            pairs.append_pair("minlongitude", &min_lng.to_string());
            pairs.append_pair("maxlongitude", &max_lng.to_string());
            if query.min_magnitude > 0.0 {
                pairs.append_pair("minmagnitude", &query.min_magnitude.to_string());
            }
        }
        url
    }

    /// Sends a GET request, asserts a 2xx HTTP status, and returns the body.
    ///
    /// # Errors
    ///
    /// Returns [`UsgsError::Http`] on network failure or a non-2xx status.
    async fn request_text(&self, url: &Url) -> Result<String, UsgsError> {
        let response = self.client.get(url.clone()).send().await?;
        let response = response.error_for_status()?;
        Ok(response.text().await?)
    }
}
