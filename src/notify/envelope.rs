use base64::engine::general_purpose::STANDARD as Base64Engine;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::attachments::Attachment;

pub const SCHEMA_VERSION: &str = "1.0";

pub const DEFAULT_TEMPLATE: &str = "Hello {name},\n\nAttached is your QR code for the event: {event}. Please bring it with you to scan for check-in.";

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeAttachment {
    pub filename: String,
    pub mime_type: String,
    /// Base64 (standard alphabet) file content.
    pub content: String,
}

impl From<&Attachment> for EnvelopeAttachment {
    fn from(attachment: &Attachment) -> Self {
        Self {
            filename: attachment.filename.clone(),
            mime_type: attachment.mime_type.clone(),
            content: Base64Engine.encode(&attachment.content),
        }
    }
}

/// Canonical message submitted to the durable stream or the fallback endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEnvelope {
    pub schema_version: String,
    pub id: Uuid,
    pub correlation_id: Uuid,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_vars: Option<Value>,
    #[serde(default)]
    pub attachments: Vec<EnvelopeAttachment>,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl NotificationEnvelope {
    /// Every call mints a new `id` and `correlation_id`; a retried delivery is a new envelope.
    pub fn new(
        to: Vec<String>,
        subject: impl Into<String>,
        text: impl Into<String>,
        attachments: &[Attachment],
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            id: Uuid::new_v4(),
            correlation_id: Uuid::new_v4(),
            to,
            subject: subject.into(),
            text: text.into(),
            template_id: None,
            template_version: None,
            template_vars: None,
            attachments: attachments.iter().map(EnvelopeAttachment::from).collect(),
            priority: Priority::Normal,
            created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Fills `{name}` and `{event}` in `template` (or the default text) and appends the
/// signature block.
pub fn render_body(template: Option<&str>, name: &str, event: &str, signature: &str) -> String {
    let template = template
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_TEMPLATE);
    let body = template.replace("{name}", name).replace("{event}", event);
    format!("{body}\n\n{signature}")
}
