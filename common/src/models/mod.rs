// common/src/models/mod.rs
pub mod identity;
pub mod session;
pub mod status;
pub mod telemetry;

pub use identity::WalletIdentity;
pub use session::{Challenge, SessionEvent, SignOutcome, SignatureResult};
pub use status::{AnalyticsChecks, RegistryCapabilities, SessionDiagnostics, SessionSnapshot};
pub use telemetry::{ChannelId, DispatchOutcome};
