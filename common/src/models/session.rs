// common/src/models/session.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::WalletIdentity;

/// Message the user is asked to sign to prove control of the wallet.
///
/// Built fresh for every sign attempt and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub text: String,
    pub issued_at: DateTime<Utc>,
    pub domain: String,
}

/// How a sign attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignOutcome {
    Success,
    Failure { reason: String },
}

/// Terminal record of one sign attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureResult {
    pub challenge: Challenge,
    pub identity: WalletIdentity,
    pub signature: Option<String>,
    pub outcome: SignOutcome,
}

impl SignatureResult {
    pub fn success(challenge: Challenge, identity: WalletIdentity, signature: String) -> Self {
        Self {
            challenge,
            identity,
            signature: Some(signature),
            outcome: SignOutcome::Success,
        }
    }

    pub fn failure(challenge: Challenge, identity: WalletIdentity, reason: impl Into<String>) -> Self {
        Self {
            challenge,
            identity,
            signature: None,
            outcome: SignOutcome::Failure {
                reason: reason.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SignOutcome::Success)
    }

    /// Failure reason, if the attempt failed
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            SignOutcome::Failure { reason } => Some(reason),
            SignOutcome::Success => None,
        }
    }
}

/// An authenticated session, the unit handed to telemetry channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    pub identity: WalletIdentity,
    pub signature: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub domain: String,
}

impl SessionEvent {
    /// Derive the event for a successful result. Failed results have none.
    pub fn from_result(result: &SignatureResult, occurred_at: DateTime<Utc>) -> Option<Self> {
        if !result.is_success() {
            return None;
        }
        let signature = result.signature.clone()?;

        Some(Self {
            identity: result.identity.clone(),
            signature,
            message: result.challenge.text.clone(),
            occurred_at,
            domain: result.challenge.domain.clone(),
        })
    }
}
