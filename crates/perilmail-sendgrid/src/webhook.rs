//! Types and validation for the SendGrid event webhook.
//!
//! The provider posts a JSON array of loosely shaped events. Validation
//! sorts each into one of three dispositions: persist it, report it as
//! malformed, or skip it as an event type outside the tracked set.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// Event types the ingestion pipeline tracks. Anything else is skipped.
pub const RECOGNIZED_EVENTS: [&str; 10] = [
    "processed",
    "delivered",
    "open",
    "click",
    "bounce",
    "dropped",
    "spam_report",
    "unsubscribe",
    "group_unsubscribe",
    "group_resubscribe",
];

/// One raw webhook event as posted by the provider. Every field is optional;
/// [`validate_event`] decides what is usable.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEvent {
    pub email: Option<String>,
    pub event: Option<String>,
    /// Unix seconds.
    pub timestamp: Option<i64>,
    pub sg_message_id: Option<String>,
    pub url: Option<String>,
    pub unique_args: Option<UniqueArgs>,
}

/// Correlation ids attached at send time, echoed back per event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UniqueArgs {
    pub user_id: Option<String>,
    pub campaign_id: Option<String>,
    pub event_id: Option<String>,
    pub risk_level: Option<String>,
    pub email_type: Option<String>,
}

/// A webhook event that passed validation and is ready to persist.
/// Correlation ids the provider did not echo default to `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEvent {
    pub email: String,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub campaign_id: String,
    pub person_ref: String,
    pub url: Option<String>,
    pub provider_message_id: Option<String>,
}

/// Validation verdict for one provider event.
#[derive(Debug)]
pub enum EventDisposition {
    Valid(ValidEvent),
    Invalid(&'static str),
    Unrecognized(String),
}

/// Validate one provider event, converting its second-resolution timestamp
/// to a UTC instant.
#[must_use]
pub fn validate_event(event: &ProviderEvent) -> EventDisposition {
    let Some(email) = event.email.as_deref().filter(|e| !e.is_empty()) else {
        return EventDisposition::Invalid("missing required fields: email, event, or timestamp");
    };
    let Some(event_type) = event.event.as_deref().filter(|e| !e.is_empty()) else {
        return EventDisposition::Invalid("missing required fields: email, event, or timestamp");
    };
    let Some(timestamp) = event.timestamp else {
        return EventDisposition::Invalid("missing required fields: email, event, or timestamp");
    };

    if !RECOGNIZED_EVENTS.contains(&event_type) {
        return EventDisposition::Unrecognized(event_type.to_string());
    }

    let Some(occurred_at) = timestamp
        .checked_mul(1000)
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
    else {
        return EventDisposition::Invalid("timestamp out of range");
    };

    let args = event.unique_args.clone().unwrap_or_default();
    EventDisposition::Valid(ValidEvent {
        email: email.to_string(),
        event_type: event_type.to_string(),
        occurred_at,
        campaign_id: or_unknown(args.campaign_id),
        person_ref: or_unknown(args.user_id),
        url: event.url.clone(),
        provider_message_id: event.sg_message_id.clone(),
    })
}

fn or_unknown(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_event() -> ProviderEvent {
        ProviderEvent {
            email: Some("maria@example.com".to_string()),
            event: Some("open".to_string()),
            timestamp: Some(1_700_000_000),
            sg_message_id: Some("sg-abc.filter001".to_string()),
            url: None,
            unique_args: Some(UniqueArgs {
                user_id: Some("maria@example.com".to_string()),
                campaign_id: Some("campaign_1".to_string()),
                event_id: Some("us7000abcd".to_string()),
                risk_level: Some("high".to_string()),
                email_type: Some("earthquake-insurance-campaign".to_string()),
            }),
        }
    }

    #[test]
    fn complete_event_validates_with_converted_timestamp() {
        let EventDisposition::Valid(valid) = validate_event(&provider_event()) else {
            panic!("expected a valid event");
        };

        assert_eq!(valid.email, "maria@example.com");
        assert_eq!(valid.event_type, "open");
        assert_eq!(valid.campaign_id, "campaign_1");
        assert_eq!(valid.person_ref, "maria@example.com");
        assert_eq!(valid.provider_message_id.as_deref(), Some("sg-abc.filter001"));
        // 1_700_000_000 s is 2023-11-14T22:13:20Z.
        assert_eq!(
            valid.occurred_at,
            Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap()
        );
    }

    #[test]
    fn each_missing_required_field_is_invalid() {
        let mut no_email = provider_event();
        no_email.email = None;
        assert!(matches!(
            validate_event(&no_email),
            EventDisposition::Invalid(_)
        ));

        let mut blank_event = provider_event();
        blank_event.event = Some(String::new());
        assert!(matches!(
            validate_event(&blank_event),
            EventDisposition::Invalid(_)
        ));

        let mut no_timestamp = provider_event();
        no_timestamp.timestamp = None;
        assert!(matches!(
            validate_event(&no_timestamp),
            EventDisposition::Invalid(_)
        ));
    }

    #[test]
    fn unrecognized_event_types_are_skipped_not_failed() {
        let mut deferred = provider_event();
        deferred.event = Some("deferred".to_string());
        match validate_event(&deferred) {
            EventDisposition::Unrecognized(kind) => assert_eq!(kind, "deferred"),
            other => panic!("expected Unrecognized, got: {other:?}"),
        }
    }

    #[test]
    fn missing_correlation_ids_default_to_unknown() {
        let mut anonymous = provider_event();
        anonymous.unique_args = None;
        let EventDisposition::Valid(valid) = validate_event(&anonymous) else {
            panic!("expected a valid event");
        };
        assert_eq!(valid.campaign_id, "unknown");
        assert_eq!(valid.person_ref, "unknown");
    }

    #[test]
    fn blank_correlation_ids_also_default_to_unknown() {
        let mut blank = provider_event();
        blank.unique_args = Some(UniqueArgs {
            campaign_id: Some(String::new()),
            ..UniqueArgs::default()
        });
        let EventDisposition::Valid(valid) = validate_event(&blank) else {
            panic!("expected a valid event");
        };
        assert_eq!(valid.campaign_id, "unknown");
    }

    #[test]
    fn absurd_timestamps_are_invalid() {
        let mut too_far = provider_event();
        too_far.timestamp = Some(i64::MAX);
        assert!(matches!(
            validate_event(&too_far),
            EventDisposition::Invalid("timestamp out of range")
        ));
    }

    #[test]
    fn provider_payload_deserializes_with_extra_fields() {
        let event: ProviderEvent = serde_json::from_str(
            r#"{
                "email": "maria@example.com",
                "timestamp": 1700000000,
                "event": "click",
                "url": "https://example.com/quote",
                "sg_event_id": "ZGVm",
                "ip": "203.0.113.9",
                "useragent": "Mozilla/5.0",
                "unique_args": { "campaign_id": "campaign_1" }
            }"#,
        )
        .unwrap();

        let EventDisposition::Valid(valid) = validate_event(&event) else {
            panic!("expected a valid event");
        };
        assert_eq!(valid.event_type, "click");
        assert_eq!(valid.url.as_deref(), Some("https://example.com/quote"));
        assert_eq!(valid.campaign_id, "campaign_1");
        assert_eq!(valid.person_ref, "unknown");
    }
}
