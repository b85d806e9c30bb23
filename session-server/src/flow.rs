// session-server/src/flow.rs
//! Connection and signing state machine for one browser session.
//!
//! All state derived from an identity (results, events, dispatch history) is
//! scoped to an epoch. The epoch advances whenever the identity appears,
//! disappears or changes, and every async completion is checked against the
//! ticket it was issued with before it may touch the state.

use chrono::{DateTime, Utc};
use common::models::{Challenge, DispatchOutcome, SessionEvent, SignatureResult, WalletIdentity};
use common::ChallengeBuilder;

use crate::error::{FlowError, SignError};

/// Identifies one sign attempt within one identity epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptTicket {
    pub epoch: u64,
    pub attempt: u64,
}

#[derive(Debug, Clone)]
pub enum FlowState {
    Disconnected,
    Connected {
        identity: WalletIdentity,
        /// Failed attempt kept for display until the next attempt
        last_failure: Option<SignatureResult>,
    },
    Signing {
        identity: WalletIdentity,
        challenge: Challenge,
        ticket: AttemptTicket,
    },
    Signed {
        result: SignatureResult,
        event: SessionEvent,
        ticket: AttemptTicket,
    },
}

/// Result of asking to start a sign attempt
#[derive(Debug, Clone)]
pub enum SignStart {
    Started {
        ticket: AttemptTicket,
        challenge: Challenge,
        account: String,
    },
    /// A prompt is already open; nothing was started
    AlreadySigning,
}

/// What a finished sign call did to the flow
#[derive(Debug, Clone)]
pub enum SignCompletion {
    Signed(SessionEvent),
    Failed(SignatureResult),
    /// The attempt no longer belongs to the current epoch
    Stale,
}

#[derive(Debug, Default)]
struct DispatchLog {
    attempted: bool,
    outcomes: Vec<DispatchOutcome>,
}

pub struct SignatureFlow {
    state: FlowState,
    builder: ChallengeBuilder,
    epoch: u64,
    attempts: u64,
    dispatch: DispatchLog,
}

impl Default for SignatureFlow {
    fn default() -> Self {
        Self::new(ChallengeBuilder::default())
    }
}

impl SignatureFlow {
    pub fn new(builder: ChallengeBuilder) -> Self {
        Self {
            state: FlowState::Disconnected,
            builder,
            epoch: 0,
            attempts: 0,
            dispatch: DispatchLog::default(),
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn identity(&self) -> Option<&WalletIdentity> {
        match &self.state {
            FlowState::Disconnected => None,
            FlowState::Connected { identity, .. } | FlowState::Signing { identity, .. } => Some(identity),
            FlowState::Signed { result, .. } => Some(&result.identity),
        }
    }

    /// Latest terminal result of this epoch, success or failure
    pub fn latest_result(&self) -> Option<&SignatureResult> {
        match &self.state {
            FlowState::Connected { last_failure, .. } => last_failure.as_ref(),
            FlowState::Signed { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn session_event(&self) -> Option<&SessionEvent> {
        match &self.state {
            FlowState::Signed { event, .. } => Some(event),
            _ => None,
        }
    }

    pub fn is_signing(&self) -> bool {
        matches!(self.state, FlowState::Signing { .. })
    }

    pub fn dispatch_attempted(&self) -> bool {
        self.dispatch.attempted
    }

    pub fn dispatch_outcomes(&self) -> &[DispatchOutcome] {
        &self.dispatch.outcomes
    }

    /// Apply an identity report from the wallet. Returns true if the state changed.
    pub fn identity_changed(&mut self, identity: Option<WalletIdentity>) -> bool {
        match identity {
            None => {
                if matches!(self.state, FlowState::Disconnected) {
                    return false;
                }
                tracing::info!("Wallet disconnected, discarding epoch {}", self.epoch);
                self.reset_epoch(FlowState::Disconnected);
                true
            }
            Some(identity) => {
                if self.identity() == Some(&identity) {
                    return false;
                }
                tracing::info!("Wallet connected: {}", identity);
                self.reset_epoch(FlowState::Connected {
                    identity,
                    last_failure: None,
                });
                true
            }
        }
    }

    /// Start a sign attempt from `Connected`
    pub fn begin_signing(&mut self, domain: &str, now: DateTime<Utc>) -> Result<SignStart, FlowError> {
        let identity = match &self.state {
            FlowState::Disconnected => return Err(FlowError::NotConnected),
            FlowState::Signing { .. } => return Ok(SignStart::AlreadySigning),
            FlowState::Signed { .. } => return Err(FlowError::AlreadySigned),
            FlowState::Connected { identity, .. } => identity.clone(),
        };

        self.attempts += 1;
        let ticket = AttemptTicket {
            epoch: self.epoch,
            attempt: self.attempts,
        };
        let challenge = self.builder.build(&identity, domain, now);
        let account = identity.address.clone();

        self.state = FlowState::Signing {
            identity,
            challenge: challenge.clone(),
            ticket,
        };

        Ok(SignStart::Started {
            ticket,
            challenge,
            account,
        })
    }

    /// Apply the wallet's answer for `ticket`
    pub fn complete_signing(
        &mut self,
        ticket: AttemptTicket,
        outcome: Result<String, SignError>,
        now: DateTime<Utc>,
    ) -> SignCompletion {
        let (identity, challenge) = match &self.state {
            FlowState::Signing {
                identity,
                challenge,
                ticket: current,
            } if *current == ticket => (identity.clone(), challenge.clone()),
            _ => return SignCompletion::Stale,
        };

        let result = match outcome {
            Ok(signature) => SignatureResult::success(challenge, identity.clone(), signature),
            Err(e) => SignatureResult::failure(challenge, identity.clone(), e.to_string()),
        };

        match SessionEvent::from_result(&result, now) {
            Some(event) => {
                self.state = FlowState::Signed {
                    result,
                    event: event.clone(),
                    ticket,
                };
                SignCompletion::Signed(event)
            }
            None => {
                self.state = FlowState::Connected {
                    identity,
                    last_failure: Some(result.clone()),
                };
                SignCompletion::Failed(result)
            }
        }
    }

    /// "Sign again": drop the signed session but keep the identity
    pub fn sign_again(&mut self) -> Result<(), FlowError> {
        let identity = match &self.state {
            FlowState::Disconnected => return Err(FlowError::NotConnected),
            FlowState::Signed { result, .. } => result.identity.clone(),
            _ => return Err(FlowError::NotSigned),
        };

        self.state = FlowState::Connected {
            identity,
            last_failure: None,
        };
        self.dispatch = DispatchLog::default();
        Ok(())
    }

    /// Mark the session event of `ticket` as handed to the dispatcher
    pub fn dispatch_started(&mut self, ticket: AttemptTicket) -> bool {
        if !self.is_current_signed(ticket) {
            return false;
        }
        self.dispatch.attempted = true;
        true
    }

    /// Record a channel outcome if it belongs to the current signed session
    pub fn record_dispatch(&mut self, ticket: AttemptTicket, outcome: DispatchOutcome) -> bool {
        if !self.is_current_signed(ticket) {
            return false;
        }
        self.dispatch.outcomes.push(outcome);
        true
    }

    fn is_current_signed(&self, ticket: AttemptTicket) -> bool {
        matches!(&self.state, FlowState::Signed { ticket: current, .. } if *current == ticket)
    }

    fn reset_epoch(&mut self, state: FlowState) {
        self.epoch += 1;
        self.state = state;
        self.dispatch = DispatchLog::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::ChannelId;

    fn identity() -> WalletIdentity {
        WalletIdentity::new("0xABC0000000000000000000000000000000000001", 8453)
    }

    fn connected() -> SignatureFlow {
        let mut flow = SignatureFlow::default();
        assert!(flow.identity_changed(Some(identity())));
        flow
    }

    fn start(flow: &mut SignatureFlow) -> AttemptTicket {
        match flow.begin_signing("localhost", Utc::now()).unwrap() {
            SignStart::Started { ticket, account, .. } => {
                assert_eq!(account, identity().address);
                ticket
            }
            SignStart::AlreadySigning => panic!("expected a new attempt"),
        }
    }

    #[test]
    fn test_sign_requires_connection() {
        let mut flow = SignatureFlow::default();
        assert_eq!(
            flow.begin_signing("localhost", Utc::now()).unwrap_err(),
            FlowError::NotConnected
        );
    }

    #[test]
    fn test_duplicate_sign_request_is_noop() {
        let mut flow = connected();
        let ticket = start(&mut flow);

        assert!(matches!(
            flow.begin_signing("localhost", Utc::now()).unwrap(),
            SignStart::AlreadySigning
        ));
        // The original attempt is still the one in flight
        assert!(matches!(flow.state(), FlowState::Signing { ticket: t, .. } if *t == ticket));
    }

    #[test]
    fn test_successful_sign_produces_event() {
        let mut flow = connected();
        let ticket = start(&mut flow);

        let completion = flow.complete_signing(ticket, Ok("0xsig".to_string()), Utc::now());
        let event = match completion {
            SignCompletion::Signed(event) => event,
            other => panic!("unexpected completion: {:?}", other),
        };

        assert_eq!(event.signature, "0xsig");
        assert_eq!(event.identity, identity());
        assert_eq!(flow.session_event(), Some(&event));
        assert!(flow.latest_result().unwrap().is_success());
        assert!(flow.dispatch_started(ticket));
        assert!(flow.dispatch_attempted());
    }

    #[test]
    fn test_failed_sign_is_rearmable() {
        let mut flow = connected();
        let ticket = start(&mut flow);

        let completion = flow.complete_signing(
            ticket,
            Err(SignError::Rejected("User rejected the request.".to_string())),
            Utc::now(),
        );
        assert!(matches!(completion, SignCompletion::Failed(_)));
        assert!(flow.session_event().is_none());
        assert_eq!(
            flow.latest_result().and_then(|r| r.failure_reason()),
            Some("User rejected the request.")
        );

        // A fresh attempt is allowed and clears the old failure
        let retry = start(&mut flow);
        assert_ne!(retry, ticket);
        assert!(flow.latest_result().is_none());
        assert!(matches!(
            flow.complete_signing(retry, Ok("0xsig".to_string()), Utc::now()),
            SignCompletion::Signed(_)
        ));
    }

    #[test]
    fn test_disconnect_clears_epoch_from_every_state() {
        // Connected
        let mut flow = connected();
        assert!(flow.identity_changed(None));
        assert!(flow.identity().is_none());

        // Signing
        let mut flow = connected();
        start(&mut flow);
        assert!(flow.identity_changed(None));
        assert!(matches!(flow.state(), FlowState::Disconnected));

        // Signed with dispatch history
        let mut flow = connected();
        let ticket = start(&mut flow);
        flow.complete_signing(ticket, Ok("0xsig".to_string()), Utc::now());
        flow.dispatch_started(ticket);
        flow.record_dispatch(ticket, DispatchOutcome::delivered(ChannelId::RegistryMethod, "ok"));
        assert!(flow.identity_changed(None));
        assert!(flow.session_event().is_none());
        assert!(flow.latest_result().is_none());
        assert!(!flow.dispatch_attempted());
        assert!(flow.dispatch_outcomes().is_empty());

        // Already disconnected
        assert!(!flow.identity_changed(None));
    }

    #[test]
    fn test_late_signature_after_disconnect_is_discarded() {
        let mut flow = connected();
        let ticket = start(&mut flow);

        flow.identity_changed(None);
        flow.identity_changed(Some(identity()));

        let completion = flow.complete_signing(ticket, Ok("0xsig".to_string()), Utc::now());
        assert!(matches!(completion, SignCompletion::Stale));
        assert!(flow.session_event().is_none());
        assert!(matches!(flow.state(), FlowState::Connected { .. }));
    }

    #[test]
    fn test_account_switch_starts_new_epoch() {
        let mut flow = connected();
        let ticket = start(&mut flow);
        let epoch = flow.epoch();

        let other = WalletIdentity::new("0xDEF0000000000000000000000000000000000002", 8453);
        assert!(flow.identity_changed(Some(other.clone())));
        assert_eq!(flow.epoch(), epoch + 1);
        assert_eq!(flow.identity(), Some(&other));

        assert!(matches!(
            flow.complete_signing(ticket, Ok("0xsig".to_string()), Utc::now()),
            SignCompletion::Stale
        ));

        // Re-reporting the same identity changes nothing
        assert!(!flow.identity_changed(Some(other)));
        assert_eq!(flow.epoch(), epoch + 1);
    }

    #[test]
    fn test_sign_again_keeps_identity() {
        let mut flow = connected();
        assert_eq!(flow.sign_again().unwrap_err(), FlowError::NotSigned);

        let ticket = start(&mut flow);
        flow.complete_signing(ticket, Ok("0xsig".to_string()), Utc::now());
        flow.dispatch_started(ticket);
        assert_eq!(
            flow.begin_signing("localhost", Utc::now()).unwrap_err(),
            FlowError::AlreadySigned
        );

        flow.sign_again().unwrap();
        assert_eq!(flow.identity(), Some(&identity()));
        assert!(flow.session_event().is_none());
        assert!(!flow.dispatch_attempted());

        // Outcomes of the discarded session are ignored
        assert!(!flow.record_dispatch(ticket, DispatchOutcome::failed(ChannelId::DirectNetwork, "late")));
        assert!(flow.dispatch_outcomes().is_empty());
    }
}
