//! Integration tests for `BulkDispatcher`: pacing, ordering, and rendering.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use perilmail_core::{RiskLevel, TemplateVars};
use perilmail_sendgrid::{
    BulkDispatcher, CampaignContent, CustomArgs, DispatchOptions, DispatchTarget, Pacer,
    SendGridClient,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records requested pauses instead of sleeping through them.
#[derive(Clone, Default)]
struct RecordingPacer {
    pauses: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingPacer {
    fn recorded(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&self, duration: Duration) -> BoxFuture<'_, ()> {
        self.pauses.lock().unwrap().push(duration);
        Box::pin(async {})
    }
}

fn test_client(base_url: &str) -> SendGridClient {
    SendGridClient::with_base_url("test-key", "quotes@perilmail.dev", "Peril Insurance AI", base_url)
        .expect("client construction should not fail")
}

fn target(first_name: &str, email: &str) -> DispatchTarget {
    DispatchTarget {
        email: email.to_string(),
        vars: TemplateVars::for_person(first_name, "Tester", "Oakland", "CA", 480_000)
            .with_target_context(12.3, RiskLevel::High),
        custom_args: CustomArgs {
            user_id: email.to_string(),
            campaign_id: "campaign_1".to_string(),
            event_id: "us7000abcd".to_string(),
            risk_level: "high".to_string(),
            email_type: "earthquake-insurance-campaign".to_string(),
        },
    }
}

const CONTENT: CampaignContent<'static> = CampaignContent {
    subject: "Hi {first_name}",
    body: "Dear {first_name}, your {city} home sits {distance_km} km from the epicenter.",
    note: "This email was sent as part of an earthquake insurance awareness campaign.",
};

/// Matches the mail-send request addressed to one recipient.
fn addressed_to(email: &str) -> impl wiremock::Match {
    body_partial_json(serde_json::json!({
        "personalizations": [{ "to": [{ "email": email }] }]
    }))
}

#[tokio::test]
async fn results_keep_input_order_and_record_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(addressed_to("ada@example.com"))
        .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", "id-ada"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(addressed_to("bounce@example.com"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(addressed_to("carol@example.com"))
        .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", "id-carol"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let dispatcher = BulkDispatcher::new(&client, RecordingPacer::default());
    let targets = vec![
        target("Ada", "ada@example.com"),
        target("Bea", "bounce@example.com"),
        target("Carol", "carol@example.com"),
    ];

    let report = dispatcher
        .dispatch(CONTENT, &targets, &DispatchOptions::default())
        .await;

    let emails: Vec<&str> = report.results.iter().map(|r| r.email.as_str()).collect();
    assert_eq!(
        emails,
        vec!["ada@example.com", "bounce@example.com", "carol@example.com"]
    );
    assert!(report.results[0].success);
    assert_eq!(report.results[0].message_id.as_deref(), Some("id-ada"));
    assert!(!report.results[1].success);
    assert!(report.results[1]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("500")));
    assert!(report.results[2].success);

    assert_eq!(report.summary.total_targets, 3);
    assert_eq!(report.summary.sent, 2);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.success_rate, "66.7%");
}

#[tokio::test]
async fn twelve_targets_in_batches_of_five_pause_exactly_twice() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .expect(12)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let pacer = RecordingPacer::default();
    let dispatcher = BulkDispatcher::new(&client, pacer.clone());
    let targets: Vec<DispatchTarget> = (0..12)
        .map(|i| target("Ada", &format!("p{i}@example.com")))
        .collect();

    let report = dispatcher
        .dispatch(CONTENT, &targets, &DispatchOptions::default())
        .await;

    assert_eq!(report.summary.sent, 12);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(
        pacer.recorded(),
        vec![Duration::from_millis(3000), Duration::from_millis(3000)]
    );
}

#[tokio::test]
async fn a_single_batch_never_pauses() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let pacer = RecordingPacer::default();
    let dispatcher = BulkDispatcher::new(&client, pacer.clone());
    let targets = vec![
        target("Ada", "a@example.com"),
        target("Bea", "b@example.com"),
    ];

    dispatcher
        .dispatch(CONTENT, &targets, &DispatchOptions::default())
        .await;

    assert!(pacer.recorded().is_empty());
}

#[tokio::test]
async fn zero_batch_size_is_clamped_to_one() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let pacer = RecordingPacer::default();
    let dispatcher = BulkDispatcher::new(&client, pacer.clone());
    let targets = vec![
        target("Ada", "a@example.com"),
        target("Bea", "b@example.com"),
    ];
    let options = DispatchOptions {
        batch_size: 0,
        delay_between_batches: Duration::from_millis(50),
    };

    let report = dispatcher.dispatch(CONTENT, &targets, &options).await;

    assert_eq!(report.summary.sent, 2);
    assert_eq!(pacer.recorded(), vec![Duration::from_millis(50)]);
}

#[tokio::test]
async fn empty_target_list_reports_a_zeroed_summary() {
    let server = MockServer::start().await;

    let client = test_client(&server.uri());
    let pacer = RecordingPacer::default();
    let dispatcher = BulkDispatcher::new(&client, pacer.clone());

    let report = dispatcher
        .dispatch(CONTENT, &[], &DispatchOptions::default())
        .await;

    assert!(report.results.is_empty());
    assert_eq!(report.summary.total_targets, 0);
    assert_eq!(report.summary.sent, 0);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(report.summary.sent + report.summary.failed, 0);
    assert!(pacer.recorded().is_empty());
}

#[tokio::test]
async fn subject_and_body_are_rendered_per_recipient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let dispatcher = BulkDispatcher::new(&client, RecordingPacer::default());
    let targets = vec![
        target("Ada", "ada@example.com"),
        target("Bea", "bea@example.com"),
    ];

    dispatcher
        .dispatch(CONTENT, &targets, &DispatchOptions::default())
        .await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let first: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(first["subject"], "Hi Ada");
    let html = first["content"][0]["value"].as_str().unwrap();
    assert!(html.contains("Dear Ada, your Oakland home sits 12.3 km from the epicenter."));
    assert!(html.contains("unsubscribe here"));

    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(second["subject"], "Hi Bea");
}
