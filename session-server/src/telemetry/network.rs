// session-server/src/telemetry/network.rs
use async_trait::async_trait;
use common::models::{ChannelId, SessionEvent};
use common::Config;
use serde_json::{json, Value};
use std::time::Duration;

use super::channel::TelemetryChannel;
use crate::error::ChannelError;

/// Posts session events straight to the telemetry endpoint.
///
/// Browsers often block this request, so failures are routine.
pub struct HttpChannel {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    enabled: bool,
}

impl HttpChannel {
    pub fn new(endpoint: impl Into<String>, project_id: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            project_id: project_id.into(),
            enabled: true,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let mut channel = Self::new(
            config.telemetry.endpoint.clone(),
            config.project_id.clone(),
            Duration::from_millis(config.telemetry.timeout_ms),
        )?;
        channel.enabled = config.telemetry.enabled;
        Ok(channel)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TelemetryChannel for HttpChannel {
    fn id(&self) -> ChannelId {
        ChannelId::DirectNetwork
    }

    fn is_available(&self) -> bool {
        self.enabled
    }

    async fn deliver(&self, event: &SessionEvent) -> Result<String, ChannelError> {
        let payload = network_payload(event, &self.project_id);
        tracing::debug!("Posting session event to {}", self.endpoint);

        let response = self.client.post(&self.endpoint).json(&payload).send().await?;
        let status = response.status();
        let detail = format!("HTTP {}", status);

        if status.is_success() {
            Ok(detail)
        } else {
            Err(ChannelError::Failed(detail))
        }
    }
}

/// Request body for the telemetry endpoint
pub fn network_payload(event: &SessionEvent, project_id: &str) -> Value {
    json!({
        "projectId": project_id,
        "event": "user_authenticated",
        "properties": {
            "address": event.identity.address,
            "chainId": event.identity.chain_id,
            "domain": event.domain,
            "timestamp": event.occurred_at.timestamp_millis(),
            "method": "message_signature",
            "signature_success": !event.signature.is_empty(),
        }
    })
}
