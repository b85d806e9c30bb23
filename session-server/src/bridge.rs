// session-server/src/bridge.rs
//! Request/reply calls into the browser over the wallet socket.
//!
//! The wallet and the page registry live in the browser. Calls to them are
//! sent as frames carrying a request id and resolved when the matching
//! `reply` frame comes back.

use actix::Recipient;
use async_trait::async_trait;
use common::models::{ChannelId, RegistryCapabilities};
use common::{BridgeOutbound, RpcReply};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{ChannelError, RpcError, SignError};
use crate::telemetry::{Tracker, TrackingRegistry};
use crate::wallet::WalletSigner;

/// Calls waiting for a browser reply, keyed by request id
pub type PendingReplies = Arc<DashMap<Uuid, oneshot::Sender<RpcReply>>>;

#[derive(Clone)]
pub struct BridgeRpc {
    outbound: Recipient<BridgeOutbound>,
    pending: PendingReplies,
}

impl BridgeRpc {
    pub fn new(outbound: Recipient<BridgeOutbound>, pending: PendingReplies) -> Self {
        Self { outbound, pending }
    }

    /// Send the frame built for a fresh request id and wait for its reply
    pub async fn call<F>(&self, build: F, timeout: Duration) -> Result<Value, RpcError>
    where
        F: FnOnce(Uuid) -> BridgeOutbound,
    {
        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(request_id, tx);

        self.outbound.do_send(build(request_id));

        let reply = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => reply,
            // Sender dropped: the socket went away
            Ok(Err(_)) => return Err(RpcError::Closed),
            Err(_) => {
                self.pending.remove(&request_id);
                return Err(RpcError::Timeout(timeout));
            }
        };

        match reply {
            RpcReply::Ok { value } => Ok(value),
            RpcReply::Err { reason } => Err(RpcError::Remote(reason)),
        }
    }
}

/// Hand a reply to the call waiting on it. Returns false for unknown ids.
pub fn resolve_reply(pending: &PendingReplies, request_id: Uuid, reply: RpcReply) -> bool {
    match pending.remove(&request_id) {
        Some((_, tx)) => tx.send(reply).is_ok(),
        None => false,
    }
}

/// Wallet reached through the browser
pub struct RemoteWallet {
    rpc: BridgeRpc,
    timeout: Duration,
}

impl RemoteWallet {
    pub fn new(rpc: BridgeRpc, timeout: Duration) -> Self {
        Self { rpc, timeout }
    }
}

#[async_trait]
impl WalletSigner for RemoteWallet {
    async fn sign(&self, message: &str, account: &str) -> Result<String, SignError> {
        let value = self
            .rpc
            .call(
                |request_id| BridgeOutbound::SignMessage {
                    request_id,
                    message: message.to_string(),
                    account: account.to_string(),
                },
                self.timeout,
            )
            .await
            .map_err(|e| match e {
                RpcError::Remote(reason) => SignError::Rejected(reason),
                other => SignError::Failed(other.to_string()),
            })?;

        match value.as_str() {
            Some(signature) if !signature.is_empty() => Ok(signature.to_string()),
            _ => Err(SignError::Failed("wallet returned no signature".to_string())),
        }
    }
}

/// One of the page registry's tracking handles
pub struct RemoteTracker {
    rpc: BridgeRpc,
    channel: ChannelId,
    timeout: Duration,
}

impl RemoteTracker {
    pub fn new(rpc: BridgeRpc, channel: ChannelId, timeout: Duration) -> Self {
        Self { rpc, channel, timeout }
    }
}

#[async_trait]
impl Tracker for RemoteTracker {
    async fn track(&self, event: &str, payload: &Value) -> Result<(), ChannelError> {
        self.rpc
            .call(
                |request_id| BridgeOutbound::Track {
                    request_id,
                    channel: self.channel,
                    event: event.to_string(),
                    payload: payload.clone(),
                },
                self.timeout,
            )
            .await
            .map(|_| ())
            .map_err(|e| ChannelError::Failed(e.to_string()))
    }
}

/// Build the registry for the handles the page announced
pub fn remote_registry(rpc: &BridgeRpc, capabilities: RegistryCapabilities, timeout: Duration) -> TrackingRegistry {
    let tracker = |channel| Arc::new(RemoteTracker::new(rpc.clone(), channel, timeout)) as Arc<dyn Tracker>;

    let mut registry = TrackingRegistry::empty();
    if capabilities.track {
        registry = registry.with_track(tracker(ChannelId::RegistryMethod));
    }
    if capabilities.analytics {
        registry = registry.with_analytics(tracker(ChannelId::RegistryNamespace));
    }
    if capabilities.internal {
        registry = registry.with_internal(tracker(ChannelId::RegistryInternal));
    }
    registry
}
