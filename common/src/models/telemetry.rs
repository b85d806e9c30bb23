// common/src/models/telemetry.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery channels, declared in dispatch priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    /// `registry.track(...)`
    RegistryMethod,
    /// `registry.analytics.track(...)`
    RegistryNamespace,
    /// The registry's undocumented internal tracker
    RegistryInternal,
    /// POST straight to the telemetry endpoint
    DirectNetwork,
}

impl ChannelId {
    pub const ALL: [ChannelId; 4] = [
        ChannelId::RegistryMethod,
        ChannelId::RegistryNamespace,
        ChannelId::RegistryInternal,
        ChannelId::DirectNetwork,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelId::RegistryMethod => "registry_method",
            ChannelId::RegistryNamespace => "registry_namespace",
            ChannelId::RegistryInternal => "registry_internal",
            ChannelId::DirectNetwork => "direct_network",
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of attempting one channel for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub channel: ChannelId,
    pub delivered: bool,
    pub detail: String,
}

impl DispatchOutcome {
    pub fn delivered(channel: ChannelId, detail: impl Into<String>) -> Self {
        Self {
            channel,
            delivered: true,
            detail: detail.into(),
        }
    }

    pub fn failed(channel: ChannelId, detail: impl Into<String>) -> Self {
        Self {
            channel,
            delivered: false,
            detail: detail.into(),
        }
    }
}
