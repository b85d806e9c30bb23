// session-server/src/actors/flow_actor.rs
use actix::{Actor, AsyncContext, Context, Handler, Message, MessageResult, Recipient};
use chrono::Utc;
use common::models::{Challenge, DispatchOutcome, SessionDiagnostics, SessionEvent, SessionSnapshot, WalletIdentity};
use common::{BridgeOutbound, ChallengeBuilder, Config};
use futures::StreamExt;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{FlowError, SignError};
use crate::flow::{AttemptTicket, SignCompletion, SignStart, SignatureFlow};
use crate::reporter::SessionStatusReporter;
use crate::telemetry::{TelemetryChannel, TelemetryDispatcher, TrackingRegistry};
use crate::wallet::WalletSigner;

/// Actor message: the wallet reported a new identity, `None` when disconnected
#[derive(Message)]
#[rtype(result = "()")]
pub struct IdentityChanged {
    pub identity: Option<WalletIdentity>,
}

/// Actor message: the page announced its hostname and tracking handles
#[derive(Message)]
#[rtype(result = "()")]
pub struct AnnounceRegistry {
    pub domain: Option<String>,
    pub registry: TrackingRegistry,
}

/// Actor message: user asked to sign
#[derive(Message)]
#[rtype(result = "Result<SignRequestStatus, FlowError>")]
pub struct RequestSignature;

/// Actor message: user asked to sign again
#[derive(Message)]
#[rtype(result = "Result<(), FlowError>")]
pub struct SignAgain;

/// Actor message: read the current snapshot
#[derive(Message)]
#[rtype(result = "SessionSnapshot")]
pub struct GetSnapshot;

/// Actor message: read the diagnostics view
#[derive(Message)]
#[rtype(result = "SessionDiagnostics")]
pub struct GetDiagnostics;

/// Actor message: the wallet finished the sign call for `ticket`
#[derive(Message)]
#[rtype(result = "()")]
pub struct SignCompleted {
    pub ticket: AttemptTicket,
    pub result: Result<String, SignError>,
}

/// Actor message: one telemetry channel finished for `ticket`
#[derive(Message)]
#[rtype(result = "()")]
pub struct DispatchRecorded {
    pub ticket: AttemptTicket,
    pub outcome: DispatchOutcome,
}

#[derive(Debug, Clone)]
pub enum SignRequestStatus {
    Started(Challenge),
    AlreadySigning,
}

/// Drives the sign flow of one browser session.
///
/// The wallet call and the telemetry fan-out run as spawned tasks and report
/// back by message, so the actor keeps handling identity changes while they
/// are outstanding.
pub struct SignatureFlowActor {
    client_id: Uuid,
    flow: SignatureFlow,
    config: Arc<Config>,
    domain: String,
    wallet: Arc<dyn WalletSigner>,
    registry: TrackingRegistry,
    network: Arc<dyn TelemetryChannel>,
    observer: Option<Recipient<BridgeOutbound>>,
}

impl SignatureFlowActor {
    pub fn new(
        client_id: Uuid,
        config: Arc<Config>,
        wallet: Arc<dyn WalletSigner>,
        network: Arc<dyn TelemetryChannel>,
    ) -> Self {
        Self {
            client_id,
            flow: SignatureFlow::new(ChallengeBuilder::new(config.app_name.clone())),
            domain: config.domain.clone(),
            config,
            wallet,
            registry: TrackingRegistry::empty(),
            network,
            observer: None,
        }
    }

    /// Push status and dispatch frames to `observer`
    pub fn with_observer(mut self, observer: Recipient<BridgeOutbound>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_registry(mut self, registry: TrackingRegistry) -> Self {
        self.registry = registry;
        self
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionStatusReporter::new(&self.flow).snapshot()
    }

    fn notify(&self, frame: BridgeOutbound) {
        if let Some(observer) = &self.observer {
            observer.do_send(frame);
        }
    }

    fn publish_status(&self) {
        self.notify(BridgeOutbound::Status {
            snapshot: self.snapshot(),
        });
    }

    // Fire-and-forget: outcomes come back as DispatchRecorded
    fn start_dispatch(&mut self, ticket: AttemptTicket, event: SessionEvent, ctx: &mut Context<Self>) {
        if !self.flow.dispatch_started(ticket) {
            return;
        }

        let dispatcher = TelemetryDispatcher::standard(&self.registry, &self.config.project_id, self.network.clone());
        let addr = ctx.address();
        let client_id = self.client_id;

        actix::spawn(async move {
            let mut outcomes = dispatcher.dispatch_stream(event);
            while let Some(outcome) = outcomes.next().await {
                addr.do_send(DispatchRecorded { ticket, outcome });
            }
            tracing::debug!("Telemetry dispatch finished for client {}", client_id);
        });
    }
}

impl Actor for SignatureFlowActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Sign flow started for client {}", self.client_id);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Sign flow stopped for client {}", self.client_id);
    }
}

impl Handler<IdentityChanged> for SignatureFlowActor {
    type Result = ();

    fn handle(&mut self, msg: IdentityChanged, _ctx: &mut Self::Context) -> Self::Result {
        if self.flow.identity_changed(msg.identity) {
            self.publish_status();
        }
    }
}

impl Handler<AnnounceRegistry> for SignatureFlowActor {
    type Result = ();

    fn handle(&mut self, msg: AnnounceRegistry, _ctx: &mut Self::Context) -> Self::Result {
        if let Some(domain) = msg.domain.filter(|d| !d.trim().is_empty()) {
            if !self.config.is_allowed_domain(&domain) {
                tracing::warn!("Client {} reports domain {} outside the allowed list", self.client_id, domain);
            }
            self.domain = domain;
        }
        self.registry = msg.registry;

        tracing::info!(
            "Client {} on {} announced registry {:?}",
            self.client_id,
            self.domain,
            self.registry.capabilities()
        );
    }
}

impl Handler<RequestSignature> for SignatureFlowActor {
    type Result = Result<SignRequestStatus, FlowError>;

    fn handle(&mut self, _msg: RequestSignature, ctx: &mut Self::Context) -> Self::Result {
        let (ticket, challenge, account) = match self.flow.begin_signing(&self.domain, Utc::now())? {
            SignStart::AlreadySigning => {
                tracing::debug!("Sign already pending for client {}", self.client_id);
                return Ok(SignRequestStatus::AlreadySigning);
            }
            SignStart::Started {
                ticket,
                challenge,
                account,
            } => (ticket, challenge, account),
        };

        tracing::info!("Requesting signature for client {} (attempt {})", self.client_id, ticket.attempt);

        let wallet = self.wallet.clone();
        let message = challenge.text.clone();
        let addr = ctx.address();
        actix::spawn(async move {
            let result = wallet.sign(&message, &account).await;
            addr.do_send(SignCompleted { ticket, result });
        });

        self.publish_status();
        Ok(SignRequestStatus::Started(challenge))
    }
}

impl Handler<SignCompleted> for SignatureFlowActor {
    type Result = ();

    fn handle(&mut self, msg: SignCompleted, ctx: &mut Self::Context) -> Self::Result {
        match self.flow.complete_signing(msg.ticket, msg.result, Utc::now()) {
            SignCompletion::Stale => {
                tracing::warn!(
                    "Discarding stale sign result for client {} (epoch {}, attempt {})",
                    self.client_id,
                    msg.ticket.epoch,
                    msg.ticket.attempt
                );
                return;
            }
            SignCompletion::Failed(result) => {
                tracing::info!(
                    "Sign failed for client {}: {}",
                    self.client_id,
                    result.failure_reason().unwrap_or_default()
                );
            }
            SignCompletion::Signed(event) => {
                tracing::info!("Session established for client {} as {}", self.client_id, event.identity);
                self.start_dispatch(msg.ticket, event, ctx);
            }
        }

        self.publish_status();
    }
}

impl Handler<DispatchRecorded> for SignatureFlowActor {
    type Result = ();

    fn handle(&mut self, msg: DispatchRecorded, _ctx: &mut Self::Context) -> Self::Result {
        let outcome = msg.outcome.clone();
        if !self.flow.record_dispatch(msg.ticket, msg.outcome) {
            tracing::debug!("Dropping dispatch outcome for a discarded session: {}", outcome.channel);
            return;
        }

        self.notify(BridgeOutbound::Dispatch { outcome });
        self.publish_status();
    }
}

impl Handler<SignAgain> for SignatureFlowActor {
    type Result = Result<(), FlowError>;

    fn handle(&mut self, _msg: SignAgain, _ctx: &mut Self::Context) -> Self::Result {
        self.flow.sign_again()?;
        tracing::info!("Client {} reset its signed session", self.client_id);
        self.publish_status();
        Ok(())
    }
}

impl Handler<GetSnapshot> for SignatureFlowActor {
    type Result = MessageResult<GetSnapshot>;

    fn handle(&mut self, _msg: GetSnapshot, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.snapshot())
    }
}

impl Handler<GetDiagnostics> for SignatureFlowActor {
    type Result = MessageResult<GetDiagnostics>;

    fn handle(&mut self, _msg: GetDiagnostics, _ctx: &mut Self::Context) -> Self::Result {
        let diagnostics = SessionStatusReporter::new(&self.flow).diagnostics(
            self.client_id,
            &self.config,
            &self.domain,
            self.registry.capabilities(),
        );
        MessageResult(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChannelError;
    use crate::telemetry::Tracker;
    use actix::Addr;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Wallet whose answer is scripted per test
    struct ScriptedWallet {
        answer: Result<String, SignError>,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl WalletSigner for ScriptedWallet {
        async fn sign(&self, _message: &str, _account: &str) -> Result<String, SignError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.answer.clone()
        }
    }

    struct OkTracker;

    #[async_trait]
    impl Tracker for OkTracker {
        async fn track(&self, _event: &str, _payload: &Value) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    struct BlockedNetwork;

    #[async_trait]
    impl TelemetryChannel for BlockedNetwork {
        fn id(&self) -> common::models::ChannelId {
            common::models::ChannelId::DirectNetwork
        }

        async fn deliver(&self, _event: &SessionEvent) -> Result<String, ChannelError> {
            Err(ChannelError::Failed("blocked by CORS".to_string()))
        }
    }

    fn identity() -> WalletIdentity {
        WalletIdentity::new("0xABC...", 8453)
    }

    fn start(wallet: ScriptedWallet) -> Addr<SignatureFlowActor> {
        let config = Arc::new(Config {
            project_id: "project-1".to_string(),
            ..Config::default()
        });
        SignatureFlowActor::new(Uuid::new_v4(), config, Arc::new(wallet), Arc::new(BlockedNetwork))
            .with_registry(TrackingRegistry::empty().with_track(Arc::new(OkTracker)))
            .start()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[actix_web::test]
    async fn test_connect_sign_and_dispatch() {
        let flow = start(ScriptedWallet {
            answer: Ok("0xsig".to_string()),
            gate: None,
        });

        flow.send(IdentityChanged { identity: Some(identity()) }).await.unwrap();
        let status = flow.send(RequestSignature).await.unwrap().unwrap();
        assert!(matches!(status, SignRequestStatus::Started(ref c) if c.text.contains("Chain ID: 8453")));
        settle().await;

        let snapshot = flow.send(GetSnapshot).await.unwrap();
        assert!(snapshot.connected);
        assert!(snapshot.signed);
        assert!(snapshot.dispatch_attempted);
        assert!(snapshot.dispatch_succeeded_any);
        assert_eq!(snapshot.identity, Some(identity()));

        let diagnostics = flow.send(GetDiagnostics).await.unwrap();
        assert_eq!(diagnostics.dispatch.len(), 4);
        assert_eq!(diagnostics.project_id, "project-1");
    }

    #[actix_web::test]
    async fn test_rejection_then_retry() {
        let flow = start(ScriptedWallet {
            answer: Err(SignError::Rejected("User rejected the request.".to_string())),
            gate: None,
        });

        flow.send(IdentityChanged { identity: Some(identity()) }).await.unwrap();
        flow.send(RequestSignature).await.unwrap().unwrap();
        settle().await;

        let snapshot = flow.send(GetSnapshot).await.unwrap();
        assert!(snapshot.connected);
        assert!(!snapshot.signed);
        assert!(!snapshot.dispatch_attempted);
        assert_eq!(snapshot.last_error.as_deref(), Some("User rejected the request."));

        // Flow is re-armed
        let retry = flow.send(RequestSignature).await.unwrap();
        assert!(matches!(retry, Ok(SignRequestStatus::Started(_))));
    }

    #[actix_web::test]
    async fn test_disconnect_while_signing_discards_late_signature() {
        let gate = Arc::new(Notify::new());
        let flow = start(ScriptedWallet {
            answer: Ok("0xsig".to_string()),
            gate: Some(gate.clone()),
        });

        flow.send(IdentityChanged { identity: Some(identity()) }).await.unwrap();
        flow.send(RequestSignature).await.unwrap().unwrap();

        // Duplicate prompt is refused while the first is pending
        let duplicate = flow.send(RequestSignature).await.unwrap();
        assert!(matches!(duplicate, Ok(SignRequestStatus::AlreadySigning)));

        flow.send(IdentityChanged { identity: None }).await.unwrap();
        flow.send(IdentityChanged { identity: Some(identity()) }).await.unwrap();

        // Wallet answers for the previous epoch
        gate.notify_one();
        settle().await;

        let snapshot = flow.send(GetSnapshot).await.unwrap();
        assert!(snapshot.connected);
        assert!(!snapshot.signed);
        assert!(!snapshot.signing);
    }

    #[actix_web::test]
    async fn test_disconnect_after_sign_clears_session() {
        let flow = start(ScriptedWallet {
            answer: Ok("0xsig".to_string()),
            gate: None,
        });

        flow.send(IdentityChanged { identity: Some(identity()) }).await.unwrap();
        flow.send(RequestSignature).await.unwrap().unwrap();
        settle().await;
        assert!(flow.send(GetSnapshot).await.unwrap().signed);

        flow.send(IdentityChanged { identity: None }).await.unwrap();

        let snapshot = flow.send(GetSnapshot).await.unwrap();
        assert!(!snapshot.connected);
        assert!(!snapshot.signed);
        assert!(snapshot.identity.is_none());
    }

    #[actix_web::test]
    async fn test_sign_again_requires_signed_session() {
        let flow = start(ScriptedWallet {
            answer: Ok("0xsig".to_string()),
            gate: None,
        });

        assert_eq!(flow.send(SignAgain).await.unwrap(), Err(FlowError::NotConnected));
        assert!(matches!(flow.send(RequestSignature).await.unwrap(), Err(FlowError::NotConnected)));

        flow.send(IdentityChanged { identity: Some(identity()) }).await.unwrap();
        flow.send(RequestSignature).await.unwrap().unwrap();
        settle().await;

        assert_eq!(flow.send(SignAgain).await.unwrap(), Ok(()));
        let snapshot = flow.send(GetSnapshot).await.unwrap();
        assert!(snapshot.connected);
        assert!(!snapshot.signed);
        assert!(!snapshot.dispatch_attempted);
    }
}
