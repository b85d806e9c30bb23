// common/src/challenge.rs
use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::{Challenge, WalletIdentity};

pub const DEFAULT_APP_NAME: &str = "Academic Sandbox";

/// Builds the human-readable challenge text a wallet is asked to sign
#[derive(Debug, Clone)]
pub struct ChallengeBuilder {
    app_name: String,
}

impl Default for ChallengeBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_APP_NAME)
    }
}

impl ChallengeBuilder {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    /// Build a challenge for `identity` on `domain` at `now`.
    ///
    /// The timestamp keeps full sub-second precision, so distinct instants
    /// always produce distinct text.
    pub fn build(&self, identity: &WalletIdentity, domain: &str, now: DateTime<Utc>) -> Challenge {
        let text = format!(
            "Welcome to {app}!\n\n\
             This signature creates your analytics session.\n\n\
             Address: {address}\n\
             Chain ID: {chain_id}\n\
             Timestamp: {timestamp}\n\
             Domain: {domain}\n\n\
             By signing this message, you agree to participate in our educational platform.",
            app = self.app_name,
            address = identity.address,
            chain_id = identity.chain_id,
            timestamp = now.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            domain = domain,
        );

        Challenge {
            text,
            issued_at: now,
            domain: domain.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn identity() -> WalletIdentity {
        WalletIdentity::new("0x71C7656EC7ab88b098defB751B7401B5f6d8976F", 8453)
    }

    #[test]
    fn test_build_embeds_context() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let challenge = ChallengeBuilder::default().build(&identity(), "localhost", now);

        assert!(challenge.text.starts_with("Welcome to Academic Sandbox!"));
        assert!(challenge.text.contains("Address: 0x71C7656EC7ab88b098defB751B7401B5f6d8976F"));
        assert!(challenge.text.contains("Chain ID: 8453"));
        assert!(challenge.text.contains("Timestamp: 2024-05-01T12:00:00Z"));
        assert!(challenge.text.contains("Domain: localhost"));
        assert_eq!(challenge.issued_at, now);
        assert_eq!(challenge.domain, "localhost");
    }

    #[test]
    fn test_build_is_deterministic() {
        let now = Utc::now();
        let builder = ChallengeBuilder::new("Sandbox");

        assert_eq!(
            builder.build(&identity(), "example.org", now),
            builder.build(&identity(), "example.org", now)
        );
    }

    #[test]
    fn test_distinct_timestamps_never_collide() {
        let builder = ChallengeBuilder::default();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        for step in [
            Duration::nanoseconds(1),
            Duration::microseconds(1),
            Duration::milliseconds(1),
            Duration::seconds(1),
            Duration::days(365),
        ] {
            let a = builder.build(&identity(), "localhost", base);
            let b = builder.build(&identity(), "localhost", base + step);
            assert_ne!(a.text, b.text, "collision for step {:?}", step);
        }
    }
}
