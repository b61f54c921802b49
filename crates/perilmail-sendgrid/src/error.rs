use thiserror::Error;

/// Errors returned by the SendGrid mail client.
#[derive(Debug, Error)]
pub enum SendGridError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The client was constructed with a base URL that does not parse.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Non-2xx status from the API, with the response body attached.
    #[error("SendGrid API error: {status} - {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}
