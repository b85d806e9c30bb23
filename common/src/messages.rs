// Common Crate - messages.rs
// Frames exchanged with the browser over the wallet bridge socket
use actix::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{ChannelId, DispatchOutcome, RegistryCapabilities, SessionSnapshot, WalletIdentity};

/// Frame sent by the browser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeInbound {
    /// First frame after connecting: page hostname and registry handles
    Hello {
        #[serde(default)]
        domain: Option<String>,
        #[serde(default)]
        registry: RegistryCapabilities,
    },
    /// Wallet account changed; `None` means disconnected
    IdentityChanged {
        #[serde(default)]
        identity: Option<WalletIdentity>,
    },
    /// User clicked "sign"
    SignRequested,
    /// User clicked "sign again"
    SignAgain,
    /// Answer to a `sign_message` or `track` request
    Reply {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        result: RpcReply,
    },
    StatusRequest,
}

/// Browser-side result of a bridged call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RpcReply {
    Ok {
        #[serde(default)]
        value: Value,
    },
    Err {
        reason: String,
    },
}

/// Frame sent to the browser
#[derive(Debug, Clone, Serialize, Deserialize, Message)]
#[rtype(result = "()")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeOutbound {
    Welcome {
        #[serde(rename = "clientId")]
        client_id: Uuid,
    },
    /// Ask the wallet to sign `message` with `account`
    SignMessage {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        message: String,
        account: String,
    },
    /// Ask the page registry to track an event through one handle
    Track {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        channel: ChannelId,
        event: String,
        payload: Value,
    },
    Status {
        snapshot: SessionSnapshot,
    },
    Dispatch {
        outcome: DispatchOutcome,
    },
    Error {
        message: String,
    },
}

impl BridgeOutbound {
    /// Request id carried by the frame, if it expects a reply
    pub fn request_id(&self) -> Option<Uuid> {
        match self {
            BridgeOutbound::SignMessage { request_id, .. } | BridgeOutbound::Track { request_id, .. } => {
                Some(*request_id)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_hello_without_registry() {
        let frame: BridgeInbound = serde_json::from_value(json!({
            "type": "hello",
            "domain": "localhost"
        }))
        .unwrap();

        match frame {
            BridgeInbound::Hello { domain, registry } => {
                assert_eq!(domain.as_deref(), Some("localhost"));
                assert!(!registry.any());
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_parse_identity_and_reply() {
        let frame: BridgeInbound = serde_json::from_value(json!({
            "type": "identity_changed",
            "identity": { "address": "0xABC", "chainId": 8453 }
        }))
        .unwrap();
        assert!(matches!(
            frame,
            BridgeInbound::IdentityChanged { identity: Some(ref id) } if id.chain_id == 8453
        ));

        let disconnected: BridgeInbound = serde_json::from_value(json!({
            "type": "identity_changed",
            "identity": null
        }))
        .unwrap();
        assert!(matches!(disconnected, BridgeInbound::IdentityChanged { identity: None }));

        let request_id = Uuid::new_v4();
        let reply: BridgeInbound = serde_json::from_value(json!({
            "type": "reply",
            "requestId": request_id,
            "result": { "status": "err", "reason": "User rejected the request." }
        }))
        .unwrap();
        match reply {
            BridgeInbound::Reply { request_id: id, result } => {
                assert_eq!(id, request_id);
                assert_eq!(result, RpcReply::Err { reason: "User rejected the request.".to_string() });
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_sign_message_frame_shape() {
        let request_id = Uuid::new_v4();
        let frame = BridgeOutbound::SignMessage {
            request_id,
            message: "hello".to_string(),
            account: "0xABC".to_string(),
        };

        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "sign_message");
        assert_eq!(value["requestId"], json!(request_id));
        assert_eq!(value["account"], "0xABC");
        assert_eq!(frame.request_id(), Some(request_id));
    }
}
