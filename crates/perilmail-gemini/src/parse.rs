//! Parsing of model replies into subject/body pairs.
//!
//! The prompt demands bare JSON, but models wrap replies in markdown fences
//! or ignore the format entirely, so parsing never fails: an unusable reply
//! degrades to the caller's fallback subject over the raw text, and missing
//! fields are defaulted individually.

use serde::{Deserialize, Serialize};

/// A generated outreach email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedEmail {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
struct ReplyFields {
    subject: Option<String>,
    body: Option<String>,
}

/// Parse a model reply, degrading field by field instead of failing.
#[must_use]
pub fn parse_generated_email(raw: &str, fallback_subject: &str) -> GeneratedEmail {
    let cleaned = strip_fences(raw);
    let fields: ReplyFields = serde_json::from_str(&cleaned).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "model reply was not the requested JSON shape");
        ReplyFields::default()
    });

    GeneratedEmail {
        subject: fields
            .subject
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| fallback_subject.to_string()),
        body: fields
            .body
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| raw.trim().to_string()),
    }
}

/// Drop markdown code fences wherever they appear in the reply.
fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "Earthquake Insurance Information for Oakland Residents";

    #[test]
    fn parses_a_clean_json_reply() {
        let email = parse_generated_email(
            r#"{"subject": "Act now", "body": "Dear Maria, ..."}"#,
            FALLBACK,
        );
        assert_eq!(email.subject, "Act now");
        assert_eq!(email.body, "Dear Maria, ...");
    }

    #[test]
    fn strips_markdown_fences_before_parsing() {
        let raw = "```json\n{\"subject\": \"Act now\", \"body\": \"Dear Maria\"}\n```";
        let email = parse_generated_email(raw, FALLBACK);
        assert_eq!(email.subject, "Act now");
        assert_eq!(email.body, "Dear Maria");
    }

    #[test]
    fn prose_reply_becomes_the_body_under_the_fallback_subject() {
        let raw = "  Dear Maria,\n\nA magnitude 4.5 earthquake struck nearby...  ";
        let email = parse_generated_email(raw, FALLBACK);
        assert_eq!(email.subject, FALLBACK);
        assert_eq!(
            email.body,
            "Dear Maria,\n\nA magnitude 4.5 earthquake struck nearby..."
        );
    }

    #[test]
    fn missing_fields_are_defaulted_individually() {
        let raw = r#"{"subject": "Act now"}"#;
        let email = parse_generated_email(raw, FALLBACK);
        assert_eq!(email.subject, "Act now");
        assert_eq!(email.body, raw);

        let raw = r#"{"body": "Dear Maria"}"#;
        let email = parse_generated_email(raw, FALLBACK);
        assert_eq!(email.subject, FALLBACK);
        assert_eq!(email.body, "Dear Maria");
    }

    #[test]
    fn blank_fields_count_as_missing() {
        let email = parse_generated_email(r#"{"subject": "", "body": "  "}"#, FALLBACK);
        assert_eq!(email.subject, FALLBACK);
        assert_eq!(email.body, r#"{"subject": "", "body": "  "}"#);
    }
}
