//! HTTP client for the SendGrid v3 `mail/send` endpoint.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Serialize;

use crate::error::SendGridError;

const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com/";
const SEND_PATH: &str = "v3/mail/send";

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Correlation identifiers attached to every send and echoed back by the
/// event webhook, one value per recognized `unique_args` key.
#[derive(Debug, Clone, Serialize)]
pub struct CustomArgs {
    pub user_id: String,
    pub campaign_id: String,
    pub event_id: String,
    pub risk_level: String,
    pub email_type: String,
}

/// One fully rendered outbound message.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub custom_args: CustomArgs,
}

/// Client for one verified sender identity. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SendGridClient {
    client: Client,
    send_url: Url,
    api_key: String,
    from_email: String,
    from_name: String,
}

impl SendGridClient {
    /// Build a client against the production API.
    pub fn new(api_key: &str, from_email: &str, from_name: &str) -> Result<Self, SendGridError> {
        Self::with_base_url(api_key, from_email, from_name, DEFAULT_BASE_URL)
    }

    /// Build a client against an alternate endpoint, e.g. a local stub.
    pub fn with_base_url(
        api_key: &str,
        from_email: &str,
        from_name: &str,
        base_url: &str,
    ) -> Result<Self, SendGridError> {
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let send_url = Url::parse(&normalized)
            .and_then(|base| base.join(SEND_PATH))
            .map_err(|_| SendGridError::InvalidBaseUrl(base_url.to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            send_url,
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        })
    }

    /// Send one message. Success is any 2xx; the returned id comes from the
    /// `X-Message-Id` response header, `"sent"` when the provider omits it.
    pub async fn send(&self, email: &OutboundEmail) -> Result<String, SendGridError> {
        let request = MailSendRequest {
            personalizations: [Personalization {
                to: [Recipient { email: &email.to }],
                custom_args: &email.custom_args,
            }],
            from: Sender {
                email: &self.from_email,
                name: &self.from_name,
            },
            subject: &email.subject,
            content: [HtmlContent {
                kind: "text/html",
                value: &email.html_body,
            }],
        };

        let response = self
            .client
            .post(self.send_url.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendGridError::Status { status, body });
        }

        // 202 Accepted with an empty body; the queue id rides in a header.
        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("sent")
            .to_string();
        Ok(message_id)
    }
}

#[derive(Debug, Serialize)]
struct MailSendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Sender<'a>,
    subject: &'a str,
    content: [HtmlContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Recipient<'a>; 1],
    custom_args: &'a CustomArgs,
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Sender<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct HtmlContent<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_email() -> OutboundEmail {
        OutboundEmail {
            to: "maria@example.com".to_string(),
            subject: "Protect your home".to_string(),
            html_body: "<div>Dear Maria</div>".to_string(),
            custom_args: CustomArgs {
                user_id: "maria@example.com".to_string(),
                campaign_id: "campaign_1".to_string(),
                event_id: "us7000abcd".to_string(),
                risk_level: "high".to_string(),
                email_type: "earthquake-insurance-campaign".to_string(),
            },
        }
    }

    #[test]
    fn request_body_matches_the_v3_shape() {
        let email = sample_email();
        let request = MailSendRequest {
            personalizations: [Personalization {
                to: [Recipient { email: &email.to }],
                custom_args: &email.custom_args,
            }],
            from: Sender {
                email: "quotes@perilmail.dev",
                name: "Peril Insurance AI",
            },
            subject: &email.subject,
            content: [HtmlContent {
                kind: "text/html",
                value: &email.html_body,
            }],
        };
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value["personalizations"][0]["to"][0]["email"],
            "maria@example.com"
        );
        assert_eq!(
            value["personalizations"][0]["custom_args"]["campaign_id"],
            "campaign_1"
        );
        assert_eq!(
            value["personalizations"][0]["custom_args"]["email_type"],
            "earthquake-insurance-campaign"
        );
        assert_eq!(value["from"]["email"], "quotes@perilmail.dev");
        assert_eq!(value["subject"], "Protect your home");
        assert_eq!(value["content"][0]["type"], "text/html");
        assert_eq!(value["content"][0]["value"], "<div>Dear Maria</div>");
    }

    #[test]
    fn endpoint_joins_the_send_path() {
        let client =
            SendGridClient::with_base_url("key", "from@example.com", "From", "http://localhost:9")
                .unwrap();
        assert_eq!(client.send_url.as_str(), "http://localhost:9/v3/mail/send");
    }

    #[test]
    fn with_base_url_rejects_garbage() {
        let result = SendGridClient::with_base_url("key", "from@example.com", "From", "not a url");
        assert!(matches!(result, Err(SendGridError::InvalidBaseUrl(_))));
    }
}
