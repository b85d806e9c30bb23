// common/src/models/status.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::WalletIdentity;
use super::telemetry::DispatchOutcome;

/// Composite view of one client's session for the current epoch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub connected: bool,
    /// A sign request is waiting on the wallet
    pub signing: bool,
    pub signed: bool,
    pub dispatch_attempted: bool,
    pub dispatch_succeeded_any: bool,
    pub identity: Option<WalletIdentity>,
    /// Reason of the last failed attempt, kept until the next attempt
    pub last_error: Option<String>,
}

/// Tracking handles the browser registry exposes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCapabilities {
    #[serde(default)]
    pub track: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub internal: bool,
}

impl RegistryCapabilities {
    pub fn any(&self) -> bool {
        self.track || self.analytics || self.internal
    }
}

/// Configuration sanity checks shown next to the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsChecks {
    pub project_id_set: bool,
    pub domain_configured: bool,
    pub registry_present: bool,
    pub analytics_enabled: bool,
}

impl AnalyticsChecks {
    pub fn all_pass(&self) -> bool {
        self.project_id_set && self.domain_configured && self.registry_present && self.analytics_enabled
    }
}

/// Troubleshooting view for operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDiagnostics {
    pub client_id: Uuid,
    pub project_id: String,
    pub domain: String,
    pub registry: RegistryCapabilities,
    pub checks: AnalyticsChecks,
    pub all_checks_pass: bool,
    pub snapshot: SessionSnapshot,
    pub dispatch: Vec<DispatchOutcome>,
}
