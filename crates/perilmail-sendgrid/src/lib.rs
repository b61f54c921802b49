//! SendGrid mail client, paced bulk dispatch, and event-webhook types.

pub mod client;
pub mod dispatch;
pub mod error;
pub mod webhook;

pub use client::{CustomArgs, OutboundEmail, SendGridClient};
pub use dispatch::{
    wrap_html, BulkDispatcher, CampaignContent, DispatchOptions, DispatchReport, DispatchSummary,
    DispatchTarget, Pacer, SendOutcome, TokioPacer,
};
pub use error::SendGridError;
pub use webhook::{
    validate_event, EventDisposition, ProviderEvent, UniqueArgs, ValidEvent, RECOGNIZED_EVENTS,
};
