//! Outbound participant notifications: envelope building, durable stream publish with a
//! synchronous HTTP fallback, and batch fan-out with per-recipient failure isolation.

pub mod attachments;
pub mod dispatcher;
pub mod envelope;
pub mod transport;

pub use attachments::{Attachment, AttachmentLease, AttachmentProvider, FileAttachmentProvider};
pub use dispatcher::{BatchFailure, BatchReport, DeliveryOutcome, NotificationDispatcher};
pub use envelope::{render_body, EnvelopeAttachment, NotificationEnvelope, Priority};
pub use transport::{FallbackTransport, HttpFallback};

use thiserror::Error;

use crate::db::StoreError;
use crate::keystore::KeyStoreError;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("no durable stream configured")]
    StreamNotConfigured,
    #[error("stream publish failed: {0}")]
    Stream(#[from] KeyStoreError),
    #[error("stream publish failed ({stream}); fallback failed ({fallback})")]
    Exhausted { stream: String, fallback: String },
    #[error("email service request failed: {0}")]
    Fallback(#[from] reqwest::Error),
    #[error("Email service failed: {0}")]
    FallbackStatus(u16),
    #[error("invalid email service url: {0}")]
    InvalidEndpoint(String),
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Attachment(String),
    #[error("delivered but failed to record state: {0}")]
    Persist(#[from] StoreError),
    #[error("delivery task aborted: {0}")]
    Aborted(String),
}
