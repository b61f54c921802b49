use thiserror::Error;

/// Errors returned by the USGS feed client.
#[derive(Debug, Error)]
pub enum UsgsError {
    /// Network or TLS failure from the underlying HTTP client, or a non-2xx
    /// HTTP status from the feed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The client was constructed with a base URL that does not parse.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The response body could not be deserialized into the expected shape.
    #[error("GeoJSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
