use async_trait::async_trait;
use std::io;
use std::path::PathBuf;

use super::DeliveryError;
use crate::models::Participant;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// Attachment bytes plus whatever local resource backs them until `release`.
#[derive(Debug)]
pub struct AttachmentLease {
    pub attachment: Attachment,
    pub location: Option<PathBuf>,
}

/// Supplies the per-participant attachment. Producing the asset when it does not exist yet
/// is up to the provider.
#[async_trait]
pub trait AttachmentProvider: Send + Sync {
    async fn acquire(&self, participant: &Participant) -> Result<AttachmentLease, DeliveryError>;

    /// Called exactly once per successful `acquire`, after the delivery outcome is persisted.
    async fn release(&self, lease: AttachmentLease) -> io::Result<()>;
}

/// Reads pre-rendered QR images from `<dir>/<participant_id>.png` and removes them once
/// the delivery is settled.
pub struct FileAttachmentProvider {
    dir: PathBuf,
}

impl FileAttachmentProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, participant: &Participant) -> PathBuf {
        self.dir.join(format!("{}.png", participant.id))
    }
}

#[async_trait]
impl AttachmentProvider for FileAttachmentProvider {
    async fn acquire(&self, participant: &Participant) -> Result<AttachmentLease, DeliveryError> {
        let path = self.path_for(participant);
        let content = tokio::fs::read(&path).await.map_err(|err| {
            DeliveryError::Attachment(format!("cannot read QR image for {}: {err}", participant.id))
        })?;
        Ok(AttachmentLease {
            attachment: Attachment {
                filename: format!("{}.png", participant.id),
                mime_type: "image/png".to_string(),
                content,
            },
            location: Some(path),
        })
    }

    async fn release(&self, lease: AttachmentLease) -> io::Result<()> {
        let Some(path) = lease.location else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}
