use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;

use super::attachments::AttachmentProvider;
use super::envelope::{render_body, NotificationEnvelope};
use super::transport::{FallbackTransport, HttpFallback};
use super::DeliveryError;
use crate::config::DispatchConfig;
use crate::db::ParticipantStore;
use crate::keystore::DurableStream;
use crate::models::{Event, Participant};

/// Which path accepted an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Queued,
    FallbackSent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub recipient: String,
    pub error: String,
}

/// Aggregate of one batch. `total == sent + skipped + failed` and
/// `sent == queued + fallback_sent` always hold.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub sent: usize,
    pub queued: usize,
    pub fallback_sent: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<BatchFailure>,
}

enum UnitOutcome {
    Sent(DeliveryOutcome),
    Skipped,
    Failed(DeliveryError),
}

struct Inner {
    stream: Arc<dyn DurableStream>,
    fallback: Option<Arc<dyn FallbackTransport>>,
    participants: Arc<dyn ParticipantStore>,
    attachments: Arc<dyn AttachmentProvider>,
    config: DispatchConfig,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    inner: Arc<Inner>,
}

impl NotificationDispatcher {
    pub fn new(
        config: DispatchConfig,
        stream: Arc<dyn DurableStream>,
        participants: Arc<dyn ParticipantStore>,
        attachments: Arc<dyn AttachmentProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                stream,
                fallback: None,
                participants,
                attachments,
                config,
            }),
        }
    }

    /// Builds a dispatcher whose fallback is the configured email service, if any.
    pub fn from_config(
        config: DispatchConfig,
        stream: Arc<dyn DurableStream>,
        participants: Arc<dyn ParticipantStore>,
        attachments: Arc<dyn AttachmentProvider>,
    ) -> Result<Self, DeliveryError> {
        let fallback = match config.fallback_url.as_deref() {
            Some(url) => Some(Arc::new(HttpFallback::new(url, config.fallback_token.clone())?)
                as Arc<dyn FallbackTransport>),
            None => None,
        };
        let dispatcher = Self::new(config, stream, participants, attachments);
        Ok(match fallback {
            Some(fallback) => dispatcher.with_fallback(fallback),
            None => dispatcher,
        })
    }

    pub fn with_fallback(self, fallback: Arc<dyn FallbackTransport>) -> Self {
        let inner = &self.inner;
        Self {
            inner: Arc::new(Inner {
                stream: inner.stream.clone(),
                fallback: Some(fallback),
                participants: inner.participants.clone(),
                attachments: inner.attachments.clone(),
                config: inner.config.clone(),
            }),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    /// Publishes to the durable stream, then tries the fallback once if publishing fails.
    pub async fn dispatch(
        &self,
        envelope: &NotificationEnvelope,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let stream_error = match self.inner.config.stream.as_deref() {
            Some(stream) => {
                let payload = serde_json::to_string(envelope)?;
                match self.inner.stream.publish(stream, &payload).await {
                    Ok(entry_id) => {
                        tracing::info!(envelope_id = %envelope.id, %entry_id, stream, "envelope queued");
                        return Ok(DeliveryOutcome::Queued);
                    }
                    Err(err) => DeliveryError::Stream(err),
                }
            }
            None => DeliveryError::StreamNotConfigured,
        };

        let Some(fallback) = self.inner.fallback.as_ref() else {
            return Err(stream_error);
        };
        tracing::warn!(envelope_id = %envelope.id, error = %stream_error, "stream unavailable, using email service");
        match fallback.deliver(envelope).await {
            Ok(()) => Ok(DeliveryOutcome::FallbackSent),
            Err(fallback_error) => Err(DeliveryError::Exhausted {
                stream: stream_error.to_string(),
                fallback: fallback_error.to_string(),
            }),
        }
    }

    /// Sends the event's QR message to every participant not yet notified.
    ///
    /// Units run as detached tasks, at most `concurrency` at a time. Dropping the returned
    /// future stops new units from starting; units already running still settle their
    /// `qr_sent` flag and release their attachment.
    pub async fn send_batch(
        &self,
        participants: Vec<Participant>,
        event: &Event,
        template: Option<&str>,
    ) -> BatchReport {
        let event = Arc::new(event.clone());
        let template: Option<Arc<str>> = template.map(Arc::from);
        let concurrency = self.inner.config.concurrency.max(1);

        let outcomes: Vec<(String, UnitOutcome)> = stream::iter(participants)
            .map(|participant| {
                let dispatcher = self.clone();
                let event = event.clone();
                let template = template.clone();
                let recipient = participant.email.clone();
                let handle = tokio::spawn(async move {
                    dispatcher.deliver_one(participant, &event, template.as_deref()).await
                });
                async move {
                    let outcome = match handle.await {
                        Ok(outcome) => outcome,
                        Err(err) => UnitOutcome::Failed(DeliveryError::Aborted(err.to_string())),
                    };
                    (recipient, outcome)
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut report = BatchReport {
            total: outcomes.len(),
            ..BatchReport::default()
        };
        for (recipient, outcome) in outcomes {
            match outcome {
                UnitOutcome::Sent(outcome) => {
                    report.sent += 1;
                    match outcome {
                        DeliveryOutcome::Queued => report.queued += 1,
                        DeliveryOutcome::FallbackSent => report.fallback_sent += 1,
                    }
                }
                UnitOutcome::Skipped => report.skipped += 1,
                UnitOutcome::Failed(err) => {
                    report.failed += 1;
                    report.errors.push(BatchFailure {
                        recipient,
                        error: err.to_string(),
                    });
                }
            }
        }
        tracing::info!(
            event_id = %event.id,
            total = report.total,
            sent = report.sent,
            queued = report.queued,
            fallback_sent = report.fallback_sent,
            skipped = report.skipped,
            failed = report.failed,
            "notification batch finished"
        );
        report
    }

    async fn deliver_one(
        &self,
        participant: Participant,
        event: &Event,
        template: Option<&str>,
    ) -> UnitOutcome {
        if participant.qr_sent {
            return UnitOutcome::Skipped;
        }
        let lease = match self.inner.attachments.acquire(&participant).await {
            Ok(lease) => lease,
            Err(err) => {
                tracing::warn!(participant_id = %participant.id, error = %err, "attachment unavailable");
                return UnitOutcome::Failed(err);
            }
        };

        let text = render_body(
            template,
            &participant.name,
            &event.name,
            &self.inner.config.signature,
        );
        let envelope = NotificationEnvelope::new(
            vec![participant.email.clone()],
            self.inner.config.subject.clone(),
            text,
            std::slice::from_ref(&lease.attachment),
        );
        let result = match self.dispatch(&envelope).await {
            Ok(outcome) => self
                .inner
                .participants
                .set_qr_sent(participant.id, true)
                .await
                .map(|()| outcome)
                .map_err(DeliveryError::from),
            Err(err) => Err(err),
        };

        if let Err(err) = self.inner.attachments.release(lease).await {
            tracing::warn!(participant_id = %participant.id, error = %err, "failed to release attachment");
        }

        match result {
            Ok(outcome) => UnitOutcome::Sent(outcome),
            Err(err) => {
                tracing::warn!(participant_id = %participant.id, error = %err, "notification failed");
                UnitOutcome::Failed(err)
            }
        }
    }
}
