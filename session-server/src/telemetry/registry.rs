// session-server/src/telemetry/registry.rs
use async_trait::async_trait;
use common::models::{ChannelId, RegistryCapabilities};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::ChannelError;

/// A tracking handle exposed by the page's analytics registry
#[async_trait]
pub trait Tracker: Send + Sync {
    async fn track(&self, event: &str, payload: &Value) -> Result<(), ChannelError>;
}

/// The registry's tracking handles, each decided when the registry is built.
///
/// Replaced wholesale when the page announces its handles again.
#[derive(Clone, Default)]
pub struct TrackingRegistry {
    track: Option<Arc<dyn Tracker>>,
    analytics: Option<Arc<dyn Tracker>>,
    internal: Option<Arc<dyn Tracker>>,
}

impl TrackingRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, tracker: Arc<dyn Tracker>) -> Self {
        self.track = Some(tracker);
        self
    }

    pub fn with_analytics(mut self, tracker: Arc<dyn Tracker>) -> Self {
        self.analytics = Some(tracker);
        self
    }

    pub fn with_internal(mut self, tracker: Arc<dyn Tracker>) -> Self {
        self.internal = Some(tracker);
        self
    }

    /// Handle backing a registry channel. The network channel has none.
    pub fn handle(&self, channel: ChannelId) -> Option<Arc<dyn Tracker>> {
        match channel {
            ChannelId::RegistryMethod => self.track.clone(),
            ChannelId::RegistryNamespace => self.analytics.clone(),
            ChannelId::RegistryInternal => self.internal.clone(),
            ChannelId::DirectNetwork => None,
        }
    }

    pub fn capabilities(&self) -> RegistryCapabilities {
        RegistryCapabilities {
            track: self.track.is_some(),
            analytics: self.analytics.is_some(),
            internal: self.internal.is_some(),
        }
    }
}

impl fmt::Debug for TrackingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingRegistry")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}
