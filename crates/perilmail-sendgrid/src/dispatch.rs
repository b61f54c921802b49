//! Paced bulk dispatch.
//!
//! Targets are rendered per recipient, sent sequentially in batches, and
//! reported in input order. A pause runs after every batch except the last,
//! through an injected [`Pacer`] so tests observe the pacing instead of
//! sleeping through it.

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use perilmail_core::{render, TemplateVars};
use serde::Serialize;

use crate::client::{CustomArgs, OutboundEmail, SendGridClient};

/// Wall-clock pause between batches.
pub trait Pacer: Send + Sync {
    fn pause(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// Production pacer backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

impl Pacer for TokioPacer {
    fn pause(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Pacing and sizing knobs for one dispatch run. A `batch_size` of zero is
/// treated as one.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub batch_size: usize,
    pub delay_between_batches: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 5,
            delay_between_batches: Duration::from_millis(3000),
        }
    }
}

/// Campaign-wide message content; `{placeholder}` tokens are rendered per
/// recipient.
#[derive(Debug, Clone, Copy)]
pub struct CampaignContent<'a> {
    pub subject: &'a str,
    pub body: &'a str,
    /// Footer line naming the campaign in the HTML shell.
    pub note: &'a str,
}

/// One recipient prepared for dispatch: where to send, the placeholder
/// values to render with, and the correlation ids to attach.
#[derive(Debug, Clone)]
pub struct DispatchTarget {
    pub email: String,
    pub vars: TemplateVars,
    pub custom_args: CustomArgs,
}

/// Per-recipient outcome, reported in input order.
#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
    pub email: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate numbers for one dispatch run.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSummary {
    pub total_targets: usize,
    pub sent: usize,
    pub failed: usize,
    /// Percentage with one decimal, e.g. `"87.5%"`.
    pub success_rate: String,
    pub total_time_ms: u64,
    /// Whole milliseconds, e.g. `"612ms"`.
    pub avg_ms_per_email: String,
}

impl DispatchSummary {
    fn from_outcomes(outcomes: &[SendOutcome], total_time_ms: u64) -> Self {
        let total_targets = outcomes.len();
        let sent = outcomes.iter().filter(|o| o.success).count();
        let failed = total_targets - sent;

        let (success_rate, avg_ms_per_email) = if total_targets == 0 {
            ("0.0%".to_string(), "0ms".to_string())
        } else {
            (
                format!("{:.1}%", (sent as f64 / total_targets as f64) * 100.0),
                format!("{:.0}ms", total_time_ms as f64 / total_targets as f64),
            )
        };

        Self {
            total_targets,
            sent,
            failed,
            success_rate,
            total_time_ms,
            avg_ms_per_email,
        }
    }
}

/// Everything the caller needs to report on one run.
#[derive(Debug)]
pub struct DispatchReport {
    pub results: Vec<SendOutcome>,
    pub summary: DispatchSummary,
}

/// Sends one campaign's emails in paced batches.
pub struct BulkDispatcher<'a, P: Pacer> {
    client: &'a SendGridClient,
    pacer: P,
}

impl<'a, P: Pacer> BulkDispatcher<'a, P> {
    pub fn new(client: &'a SendGridClient, pacer: P) -> Self {
        Self { client, pacer }
    }

    /// Render, batch, and send every target. Individual send failures are
    /// recorded in the outcome list and never abort the run.
    pub async fn dispatch(
        &self,
        content: CampaignContent<'_>,
        targets: &[DispatchTarget],
        options: &DispatchOptions,
    ) -> DispatchReport {
        let started = Instant::now();
        let batch_size = options.batch_size.max(1);
        let batch_count = targets.len().div_ceil(batch_size);
        let mut results = Vec::with_capacity(targets.len());

        for (index, batch) in targets.chunks(batch_size).enumerate() {
            tracing::debug!(
                batch = index + 1,
                batches = batch_count,
                size = batch.len(),
                "sending batch"
            );

            for target in batch {
                results.push(self.send_one(content, target).await);
            }

            if index + 1 < batch_count {
                self.pacer.pause(options.delay_between_batches).await;
            }
        }

        let total_time_ms =
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let summary = DispatchSummary::from_outcomes(&results, total_time_ms);
        tracing::info!(
            sent = summary.sent,
            failed = summary.failed,
            total = summary.total_targets,
            "dispatch run finished"
        );

        DispatchReport { results, summary }
    }

    async fn send_one(&self, content: CampaignContent<'_>, target: &DispatchTarget) -> SendOutcome {
        let email = OutboundEmail {
            to: target.email.clone(),
            subject: render(content.subject, &target.vars),
            html_body: wrap_html(&render(content.body, &target.vars), content.note),
            custom_args: target.custom_args.clone(),
        };

        match self.client.send(&email).await {
            Ok(message_id) => SendOutcome {
                email: target.email.clone(),
                success: true,
                message_id: Some(message_id),
                error: None,
            },
            Err(err) => {
                tracing::warn!(email = %target.email, error = %err, "send failed");
                SendOutcome {
                    email: target.email.clone(),
                    success: false,
                    message_id: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

/// Wrap a rendered plain-text body in the campaign HTML shell: newlines
/// become `<br>` and the footer carries the campaign note plus the
/// unsubscribe line.
#[must_use]
pub fn wrap_html(body: &str, note: &str) -> String {
    let paragraphs = body.replace('\n', "<br>\n");
    format!(
        r##"<div style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto;">
  {paragraphs}
  <div style="margin-top: 40px; padding-top: 20px; border-top: 1px solid #eee; font-size: 12px; color: #666;">
    <p>{note}</p>
    <p>If you no longer wish to receive these emails, please <a href="#" style="color: #666;">unsubscribe here</a>.</p>
  </div>
</div>"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(email: &str, success: bool) -> SendOutcome {
        SendOutcome {
            email: email.to_string(),
            success,
            message_id: success.then(|| "id".to_string()),
            error: (!success).then(|| "boom".to_string()),
        }
    }

    #[test]
    fn summary_counts_always_reconcile() {
        let outcomes = vec![
            outcome("a@example.com", true),
            outcome("b@example.com", false),
            outcome("c@example.com", true),
            outcome("d@example.com", true),
        ];
        let summary = DispatchSummary::from_outcomes(&outcomes, 2448);

        assert_eq!(summary.total_targets, 4);
        assert_eq!(summary.sent, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.sent + summary.failed, summary.total_targets);
        assert_eq!(summary.success_rate, "75.0%");
        assert_eq!(summary.total_time_ms, 2448);
        assert_eq!(summary.avg_ms_per_email, "612ms");
    }

    #[test]
    fn empty_run_produces_a_zeroed_summary() {
        let summary = DispatchSummary::from_outcomes(&[], 3);
        assert_eq!(summary.total_targets, 0);
        assert_eq!(summary.sent, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.success_rate, "0.0%");
        assert_eq!(summary.avg_ms_per_email, "0ms");
    }

    #[test]
    fn wrap_html_converts_newlines_and_appends_the_footer() {
        let html = wrap_html(
            "Dear Maria,\nStay safe.",
            "This email was sent as part of an earthquake insurance awareness campaign.",
        );
        assert!(html.contains("Dear Maria,<br>\nStay safe."));
        assert!(html.contains("earthquake insurance awareness campaign."));
        assert!(html.contains("unsubscribe here"));
        assert!(html.starts_with("<div style=\"font-family: Arial, sans-serif;"));
    }

    #[test]
    fn failed_outcomes_serialize_without_a_message_id() {
        let value = serde_json::to_value(outcome("a@example.com", false)).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "boom");
        assert!(value.get("message_id").is_none());
    }
}
