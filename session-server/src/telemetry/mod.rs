// session-server/src/telemetry/mod.rs
//! Fan-out of session events to every telemetry channel.
//!
//! Each channel is attempted on its own: an error or a panic in one channel
//! becomes an undelivered outcome for that channel and nothing else. Nothing
//! is retried or queued.

pub mod channel;
pub mod network;
pub mod registry;

use common::models::{ChannelId, DispatchOutcome, SessionEvent};
use futures::stream::{FuturesUnordered, Stream};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::error::ChannelError;

pub use channel::{RegistryChannel, TelemetryChannel};
pub use network::HttpChannel;
pub use registry::{Tracker, TrackingRegistry};

/// Ordered set of delivery channels for one dispatch
#[derive(Clone)]
pub struct TelemetryDispatcher {
    channels: Vec<Arc<dyn TelemetryChannel>>,
}

impl TelemetryDispatcher {
    /// Channels are kept in priority order regardless of input order
    pub fn new(mut channels: Vec<Arc<dyn TelemetryChannel>>) -> Self {
        channels.sort_by_key(|c| c.id());
        Self { channels }
    }

    /// The three registry channels plus the network channel
    pub fn standard(registry: &TrackingRegistry, project_id: &str, network: Arc<dyn TelemetryChannel>) -> Self {
        let mut channels: Vec<Arc<dyn TelemetryChannel>> = [
            ChannelId::RegistryMethod,
            ChannelId::RegistryNamespace,
            ChannelId::RegistryInternal,
        ]
        .into_iter()
        .map(|id| Arc::new(RegistryChannel::from_registry(id, registry, project_id)) as Arc<dyn TelemetryChannel>)
        .collect();
        channels.push(network);

        Self::new(channels)
    }

    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.channels.iter().map(|c| c.id()).collect()
    }

    /// Attempt every channel concurrently, yielding outcomes as they complete
    pub fn dispatch_stream(&self, event: SessionEvent) -> impl Stream<Item = DispatchOutcome> + Send + 'static {
        let event = Arc::new(event);
        self.channels
            .iter()
            .cloned()
            .map(|channel| attempt(channel, event.clone()))
            .collect::<FuturesUnordered<_>>()
    }

    /// Attempt every channel and return the outcomes in channel order
    pub async fn dispatch(&self, event: &SessionEvent) -> Vec<DispatchOutcome> {
        let event = Arc::new(event.clone());
        let attempts = self.channels.iter().cloned().map(|channel| attempt(channel, event.clone()));
        futures::future::join_all(attempts).await
    }
}

async fn attempt(channel: Arc<dyn TelemetryChannel>, event: Arc<SessionEvent>) -> DispatchOutcome {
    let id = channel.id();
    if !channel.is_available() {
        tracing::debug!("Telemetry channel {} unavailable, skipping", id);
        return DispatchOutcome::failed(id, ChannelError::Unavailable.to_string());
    }

    match AssertUnwindSafe(channel.deliver(&event)).catch_unwind().await {
        Ok(Ok(detail)) => {
            tracing::info!("Telemetry channel {} delivered: {}", id, detail);
            DispatchOutcome::delivered(id, detail)
        }
        Ok(Err(e)) => {
            tracing::debug!("Telemetry channel {} failed: {}", id, e);
            DispatchOutcome::failed(id, e.to_string())
        }
        Err(panic) => {
            let e = ChannelError::Panicked(panic_message(panic.as_ref()));
            tracing::warn!("Telemetry channel {} {}", id, e);
            DispatchOutcome::failed(id, e.to_string())
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
