//! HTTP client for the Gemini `generateContent` endpoint.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::GeminiError;
use crate::parse::{parse_generated_email, GeneratedEmail};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
const API_VERSION: &str = "v1beta";
const MODEL: &str = "gemini-2.5-flash";

/// Generation can run tens of seconds at the 4096-token output ceiling.
const REQUEST_TIMEOUT_SECS: u64 = 90;
const CONNECT_TIMEOUT_SECS: u64 = 10;

const TEMPERATURE: f64 = 0.7;
const TOP_K: u32 = 40;
const TOP_P: f64 = 0.95;
const MAX_OUTPUT_TOKENS: u32 = 4096;

/// Every harm category the API accepts, all blocked at medium and above.
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Client for one Gemini model. Cheap to clone; the API key is baked into
/// the endpoint URL as the `key` query parameter.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    generate_url: Url,
}

impl GeminiClient {
    /// Build a client against the production API.
    pub fn new(api_key: &str) -> Result<Self, GeminiError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Build a client against an alternate endpoint, e.g. a local stub.
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, GeminiError> {
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let mut generate_url = Url::parse(&normalized)
            .and_then(|base| base.join(&format!("{API_VERSION}/models/{MODEL}:generateContent")))
            .map_err(|_| GeminiError::InvalidBaseUrl(base_url.to_string()))?;
        generate_url
            .query_pairs_mut()
            .append_pair("key", api_key);

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            generate_url,
        })
    }

    /// Run one `generateContent` call and return the model's text.
    pub async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        tracing::debug!(prompt_chars = prompt.len(), model = MODEL, "requesting generation");

        let request = GenerateContentRequest::for_prompt(prompt);
        let response = self
            .client
            .post(self.generate_url.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Status { status, body });
        }

        let body = response.text().await?;
        let decoded: GenerateContentResponse = serde_json::from_str(&body)?;
        decoded.into_text()
    }

    /// Generate one outreach email and parse the reply, degrading to
    /// `fallback_subject` over the raw text when the model ignores the
    /// JSON format instruction.
    pub async fn generate_email(
        &self,
        prompt: &str,
        fallback_subject: &str,
    ) -> Result<GeneratedEmail, GeminiError> {
        let raw = self.generate(prompt).await?;
        Ok(parse_generated_email(&raw, fallback_subject))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<PromptPart<'a>>,
}

#[derive(Debug, Serialize)]
struct PromptPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_k: u32,
    top_p: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

impl<'a> GenerateContentRequest<'a> {
    fn for_prompt(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![PromptPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Pull out the first text part, mapping the documented stop reasons to
    /// their own errors when there is none.
    fn into_text(self) -> Result<String, GeminiError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(GeminiError::EmptyResponse);
        };
        let text = candidate
            .content
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text);
        match text {
            Some(text) => Ok(text),
            None => match candidate.finish_reason.as_deref() {
                Some("SAFETY") => Err(GeminiError::SafetyBlocked),
                Some("MAX_TOKENS") => Err(GeminiError::Truncated),
                _ => Err(GeminiError::EmptyResponse),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_pins_generation_config_and_safety() {
        let request = GenerateContentRequest::for_prompt("write the email");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["contents"][0]["parts"][0]["text"], "write the email");
        assert_eq!(value["generationConfig"]["temperature"], 0.7);
        assert_eq!(value["generationConfig"]["topK"], 40);
        assert_eq!(value["generationConfig"]["topP"], 0.95);
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 4096);

        let settings = value["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        for setting in settings {
            assert_eq!(setting["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
        }
    }

    #[test]
    fn endpoint_embeds_version_model_and_key() {
        let client = GeminiClient::with_base_url("secret", "http://localhost:999").unwrap();
        let url = client.generate_url.to_string();
        assert_eq!(
            url,
            "http://localhost:999/v1beta/models/gemini-2.5-flash:generateContent?key=secret"
        );
    }

    #[test]
    fn with_base_url_rejects_garbage() {
        let result = GeminiClient::with_base_url("secret", "not a url");
        assert!(matches!(result, Err(GeminiError::InvalidBaseUrl(_))));
    }

    #[test]
    fn first_text_part_wins() {
        let decoded: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "hello"}]}, "finishReason": "STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(decoded.into_text().unwrap(), "hello");
    }

    #[test]
    fn safety_stop_maps_to_its_own_error() {
        let decoded: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]}"#,
        )
        .unwrap();
        assert!(matches!(decoded.into_text(), Err(GeminiError::SafetyBlocked)));
    }

    #[test]
    fn token_ceiling_stop_maps_to_truncated() {
        let decoded: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#).unwrap();
        assert!(matches!(decoded.into_text(), Err(GeminiError::Truncated)));
    }

    #[test]
    fn no_candidates_is_an_empty_response() {
        let decoded: GenerateContentResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(decoded.into_text(), Err(GeminiError::EmptyResponse)));
    }
}
