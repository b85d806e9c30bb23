// session-server/src/reporter.rs
use common::models::{AnalyticsChecks, RegistryCapabilities, SessionDiagnostics, SessionSnapshot};
use common::Config;
use uuid::Uuid;

use crate::flow::SignatureFlow;

/// Read-only view over one session's flow
pub struct SessionStatusReporter<'a> {
    flow: &'a SignatureFlow,
}

impl<'a> SessionStatusReporter<'a> {
    pub fn new(flow: &'a SignatureFlow) -> Self {
        Self { flow }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let identity = self.flow.identity().cloned();
        let outcomes = self.flow.dispatch_outcomes();

        SessionSnapshot {
            connected: identity.is_some(),
            signing: self.flow.is_signing(),
            signed: self.flow.session_event().is_some(),
            dispatch_attempted: self.flow.dispatch_attempted(),
            dispatch_succeeded_any: outcomes.iter().any(|o| o.delivered),
            identity,
            last_error: self
                .flow
                .latest_result()
                .and_then(|r| r.failure_reason())
                .map(str::to_string),
        }
    }

    pub fn diagnostics(
        &self,
        client_id: Uuid,
        config: &Config,
        domain: &str,
        registry: RegistryCapabilities,
    ) -> SessionDiagnostics {
        let checks = AnalyticsChecks {
            project_id_set: !config.project_id.trim().is_empty(),
            domain_configured: config.is_allowed_domain(domain),
            registry_present: registry.any(),
            analytics_enabled: config.telemetry.enabled,
        };

        SessionDiagnostics {
            client_id,
            project_id: config.project_id.clone(),
            domain: domain.to_string(),
            registry,
            checks,
            all_checks_pass: checks.all_pass(),
            snapshot: self.snapshot(),
            dispatch: self.flow.dispatch_outcomes().to_vec(),
        }
    }
}
