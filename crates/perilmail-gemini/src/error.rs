use thiserror::Error;

/// Errors returned by the Gemini generation client.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The client was constructed with a base URL that does not parse.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Non-2xx status from the API, with the response body attached.
    #[error("Gemini API error: {status} - {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response body could not be deserialized into the expected shape.
    #[error("could not decode generateContent response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The model refused to answer on safety grounds.
    #[error("content was blocked by safety filters; retry with different input")]
    SafetyBlocked,

    /// Generation hit the output-token ceiling before producing any text.
    #[error("response was truncated at the output token limit")]
    Truncated,

    /// A 2xx response that carries no usable text part.
    #[error("no content in Gemini response")]
    EmptyResponse,
}
