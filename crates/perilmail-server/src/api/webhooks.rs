//! SendGrid event webhook ingestion. Mounted on the public router since
//! provider callbacks carry no bearer token.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use perilmail_db::NewEmailEvent;
use perilmail_sendgrid::{validate_event, EventDisposition, ProviderEvent, RECOGNIZED_EVENTS};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
pub(super) struct WebhookReceiptData {
    success: bool,
    processed: usize,
    failed: usize,
    skipped: usize,
    event_types: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

/// `POST /api/webhooks/sendgrid` — ingest a provider event batch.
///
/// Each event is validated and stored independently: malformed events and
/// store failures are reported per index, unrecognized event types are
/// skipped, and neither aborts the batch.
pub(super) async fn receive_events(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<WebhookReceiptData>>, ApiError> {
    let Some(raw_events) = payload.as_array() else {
        return Err(ApiError::bad_request(
            req_id.0,
            "expected a JSON array of events",
        ));
    };

    let mut processed = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;
    let mut event_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut errors: Vec<String> = Vec::new();

    for (index, raw) in raw_events.iter().enumerate() {
        let event: ProviderEvent = match serde_json::from_value(raw.clone()) {
            Ok(event) => event,
            Err(error) => {
                failed += 1;
                errors.push(format!("event {index}: {error}"));
                continue;
            }
        };

        match validate_event(&event) {
            EventDisposition::Valid(valid) => {
                let event_type = valid.event_type.clone();
                let record = NewEmailEvent {
                    campaign_id: valid.campaign_id,
                    person_ref: valid.person_ref,
                    event_type: valid.event_type,
                    email: valid.email,
                    occurred_at: valid.occurred_at,
                    url: valid.url,
                    provider_message_id: valid.provider_message_id,
                };
                match perilmail_db::insert_email_events(&state.pool, &[record]).await {
                    Ok(_) => {
                        processed += 1;
                        *event_types.entry(event_type).or_insert(0) += 1;
                    }
                    Err(error) => {
                        tracing::error!(error = %error, "failed to store webhook event");
                        failed += 1;
                        errors.push(format!("event {index}: failed to store event"));
                    }
                }
            }
            EventDisposition::Invalid(reason) => {
                failed += 1;
                errors.push(format!("event {index}: {reason}"));
            }
            EventDisposition::Unrecognized(kind) => {
                tracing::debug!(event_type = %kind, "skipping unrecognized webhook event type");
                skipped += 1;
            }
        }
    }

    tracing::info!(processed, failed, skipped, "webhook batch ingested");

    Ok(Json(ApiResponse {
        data: WebhookReceiptData {
            success: failed == 0,
            processed,
            failed,
            skipped,
            event_types,
            errors,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct DescribeQuery {
    challenge: Option<String>,
}

/// `GET /api/webhooks/sendgrid` — echo the provider's verification challenge,
/// or describe the endpoint when called without one.
pub(super) async fn describe_webhook(
    Query(params): Query<DescribeQuery>,
) -> Json<serde_json::Value> {
    match params.challenge {
        Some(challenge) => Json(serde_json::json!({ "challenge": challenge })),
        None => Json(serde_json::json!({
            "message": "SendGrid event webhook",
            "supported_events": RECOGNIZED_EVENTS,
        })),
    }
}
