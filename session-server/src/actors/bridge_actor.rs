// session-server/src/actors/bridge_actor.rs
use actix::{Actor, ActorContext, Addr, AsyncContext, Handler, StreamHandler};
use actix_web_actors::ws;
use common::{BridgeInbound, BridgeOutbound, Config};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::flow_actor::{AnnounceRegistry, GetSnapshot, IdentityChanged, RequestSignature, SignAgain, SignatureFlowActor};
use crate::bridge::{remote_registry, resolve_reply, BridgeRpc, PendingReplies, RemoteWallet};
use crate::directory::SessionDirectory;
use crate::telemetry::TelemetryChannel;

/// Actor managing one browser's wallet socket.
///
/// Owns the session's flow actor and forwards wallet events and user actions
/// to it; the flow reaches the wallet and the page registry back through
/// this socket.
pub struct WalletBridgeActor {
    client_id: Uuid,
    config: Arc<Config>,
    directory: SessionDirectory,
    network: Arc<dyn TelemetryChannel>,
    pending: PendingReplies,
    rpc: Option<BridgeRpc>,
    flow: Option<Addr<SignatureFlowActor>>,
    last_heartbeat: Instant,
}

impl WalletBridgeActor {
    pub fn new(config: Arc<Config>, directory: SessionDirectory, network: Arc<dyn TelemetryChannel>) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            config,
            directory,
            network,
            pending: PendingReplies::default(),
            rpc: None,
            flow: None,
            last_heartbeat: Instant::now(),
        }
    }

    // Heartbeat with timeout detection
    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let interval = Duration::from_secs(self.config.bridge.heartbeat_interval_secs);
        let timeout = Duration::from_secs(self.config.bridge.client_timeout_secs);

        ctx.run_interval(interval, move |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > timeout {
                tracing::warn!("Client heartbeat timeout: {}", act.client_id);
                ctx.stop();
                return;
            }

            ctx.ping(b"");
        });
    }

    fn send_frame(&self, frame: &BridgeOutbound, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::to_string(frame) {
            Ok(json) => ctx.text(json),
            Err(e) => tracing::error!("Failed to serialize bridge frame: {}", e),
        }
    }

    fn handle_frame(&mut self, frame: BridgeInbound, ctx: &mut ws::WebsocketContext<Self>) {
        let flow = match &self.flow {
            Some(flow) => flow.clone(),
            None => return,
        };

        match frame {
            BridgeInbound::Hello { domain, registry } => {
                let registry = match &self.rpc {
                    Some(rpc) => remote_registry(
                        rpc,
                        registry,
                        Duration::from_secs(self.config.bridge.track_timeout_secs),
                    ),
                    None => return,
                };
                flow.do_send(AnnounceRegistry { domain, registry });
            },
            BridgeInbound::IdentityChanged { identity } => {
                flow.do_send(IdentityChanged { identity });
            },
            BridgeInbound::SignRequested => {
                let me = ctx.address();
                actix::spawn(async move {
                    match flow.send(RequestSignature).await {
                        Ok(Ok(_)) => {},
                        Ok(Err(e)) => me.do_send(BridgeOutbound::Error { message: e.to_string() }),
                        Err(e) => tracing::error!("Sign flow unreachable: {}", e),
                    }
                });
            },
            BridgeInbound::SignAgain => {
                let me = ctx.address();
                actix::spawn(async move {
                    match flow.send(SignAgain).await {
                        Ok(Ok(())) => {},
                        Ok(Err(e)) => me.do_send(BridgeOutbound::Error { message: e.to_string() }),
                        Err(e) => tracing::error!("Sign flow unreachable: {}", e),
                    }
                });
            },
            BridgeInbound::Reply { request_id, result } => {
                if !resolve_reply(&self.pending, request_id, result) {
                    tracing::warn!("Reply for unknown request {} from client {}", request_id, self.client_id);
                }
            },
            BridgeInbound::StatusRequest => {
                let me = ctx.address();
                actix::spawn(async move {
                    match flow.send(GetSnapshot).await {
                        Ok(snapshot) => me.do_send(BridgeOutbound::Status { snapshot }),
                        Err(e) => tracing::error!("Sign flow unreachable: {}", e),
                    }
                });
            },
        }
    }
}

impl Actor for WalletBridgeActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("Client connected: {}", self.client_id);
        self.last_heartbeat = Instant::now();
        self.heartbeat(ctx);

        let rpc = BridgeRpc::new(ctx.address().recipient(), self.pending.clone());
        let wallet = RemoteWallet::new(rpc.clone(), Duration::from_secs(self.config.bridge.sign_timeout_secs));

        let flow = SignatureFlowActor::new(
            self.client_id,
            self.config.clone(),
            Arc::new(wallet),
            self.network.clone(),
        )
        .with_observer(ctx.address().recipient())
        .start();

        self.directory.insert(self.client_id, flow.clone());
        self.rpc = Some(rpc);
        self.flow = Some(flow);

        self.send_frame(&BridgeOutbound::Welcome { client_id: self.client_id }, ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Client disconnected: {}", self.client_id);

        self.directory.remove(&self.client_id);
        if self.directory.is_empty() {
            tracing::debug!("No live sessions left");
        }

        // Dropping the senders fails every outstanding call with Closed
        self.pending.clear();

        if let Some(flow) = self.flow.take() {
            flow.do_send(IdentityChanged { identity: None });
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WalletBridgeActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            },
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            },
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();

                match serde_json::from_str::<BridgeInbound>(&text) {
                    Ok(frame) => {
                        tracing::debug!("Frame from client {}: {:?}", self.client_id, frame);
                        self.handle_frame(frame, ctx);
                    },
                    Err(e) => {
                        tracing::warn!("Malformed frame from client {}: {}", self.client_id, e);
                        self.send_frame(&BridgeOutbound::Error { message: format!("malformed frame: {}", e) }, ctx);
                    },
                }
            },
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("Client closing connection: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            },
            Err(e) => {
                tracing::warn!("Protocol error from client {}: {}", self.client_id, e);
                ctx.stop();
            },
            _ => (),
        }
    }
}

impl Handler<BridgeOutbound> for WalletBridgeActor {
    type Result = ();

    fn handle(&mut self, msg: BridgeOutbound, ctx: &mut Self::Context) -> Self::Result {
        self.send_frame(&msg, ctx);
    }
}
