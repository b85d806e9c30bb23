// session-server/src/telemetry/channel.rs
use async_trait::async_trait;
use chrono::SecondsFormat;
use common::models::{ChannelId, SessionEvent};
use serde_json::{json, Value};
use std::sync::Arc;

use super::registry::{Tracker, TrackingRegistry};
use crate::error::ChannelError;

/// One independent way of delivering a session event
#[async_trait]
pub trait TelemetryChannel: Send + Sync {
    fn id(&self) -> ChannelId;

    /// Unavailable channels are reported but never attempted
    fn is_available(&self) -> bool {
        true
    }

    /// Deliver the event, returning a detail line for diagnostics
    async fn deliver(&self, event: &SessionEvent) -> Result<String, ChannelError>;
}

/// Delivers through one of the page registry's tracking handles
pub struct RegistryChannel {
    id: ChannelId,
    event_name: &'static str,
    handle: Option<Arc<dyn Tracker>>,
    project_id: String,
}

impl RegistryChannel {
    pub fn new(id: ChannelId, handle: Option<Arc<dyn Tracker>>, project_id: impl Into<String>) -> Self {
        Self {
            id,
            event_name: Self::event_name_for(id),
            handle,
            project_id: project_id.into(),
        }
    }

    pub fn from_registry(id: ChannelId, registry: &TrackingRegistry, project_id: &str) -> Self {
        Self::new(id, registry.handle(id), project_id)
    }

    /// Event name each handle is called with
    pub fn event_name_for(id: ChannelId) -> &'static str {
        match id {
            ChannelId::RegistryMethod => "session_created",
            ChannelId::RegistryNamespace => "user_signed_message",
            ChannelId::RegistryInternal | ChannelId::DirectNetwork => "user_authenticated",
        }
    }
}

#[async_trait]
impl TelemetryChannel for RegistryChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn is_available(&self) -> bool {
        self.handle.is_some()
    }

    async fn deliver(&self, event: &SessionEvent) -> Result<String, ChannelError> {
        let handle = self.handle.as_ref().ok_or(ChannelError::Unavailable)?;
        let payload = registry_payload(event, &self.project_id);

        handle.track(self.event_name, &payload).await?;
        Ok(format!("tracked {}", self.event_name))
    }
}

/// Session data handed to registry handles
pub fn registry_payload(event: &SessionEvent, project_id: &str) -> Value {
    json!({
        "address": event.identity.address,
        "chainId": event.identity.chain_id,
        "signature": event.signature,
        "message": event.message,
        "timestamp": event.occurred_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        "domain": event.domain,
        "projectId": project_id,
    })
}
