//! Client for the USGS FDSN event feed.
//!
//! Fetches recent earthquakes as GeoJSON, flattens them into
//! [`FeedEarthquake`] records, and retries transient failures with
//! exponential back-off.

pub mod client;
pub mod error;
mod retry;
pub mod types;

pub use client::UsgsClient;
pub use error::UsgsError;
pub use types::{EventQuery, FeedEarthquake};
