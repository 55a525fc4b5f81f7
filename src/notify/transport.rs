use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::envelope::NotificationEnvelope;
use super::DeliveryError;

pub const SERVICE_TOKEN_HEADER: &str = "x-service-token";

/// Synchronous delivery path used when the durable stream rejects a publish.
#[async_trait]
pub trait FallbackTransport: Send + Sync {
    async fn deliver(&self, envelope: &NotificationEnvelope) -> Result<(), DeliveryError>;
}

/// POSTs the JSON envelope to `<base>/email/send`. Any 2xx counts as accepted.
pub struct HttpFallback {
    endpoint: Url,
    token: Option<String>,
    client: Client,
}

impl HttpFallback {
    pub fn new(base: &str, token: Option<String>) -> Result<Self, DeliveryError> {
        let endpoint = Url::parse(&format!("{}/email/send", base.trim_end_matches('/')))
            .map_err(|err| DeliveryError::InvalidEndpoint(err.to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(DeliveryError::Fallback)?;
        Ok(Self {
            endpoint,
            token,
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl FallbackTransport for HttpFallback {
    async fn deliver(&self, envelope: &NotificationEnvelope) -> Result<(), DeliveryError> {
        let mut request = self.client.post(self.endpoint.clone()).json(envelope);
        if let Some(token) = &self.token {
            request = request.header(SERVICE_TOKEN_HEADER, token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::FallbackStatus(status.as_u16()));
        }
        tracing::debug!(envelope_id = %envelope.id, %status, "email service accepted envelope");
        Ok(())
    }
}
