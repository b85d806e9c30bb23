// session-server/src/state.rs
use common::Config;
use std::sync::Arc;

use crate::directory::SessionDirectory;
use crate::telemetry::TelemetryChannel;

/// Shared handles given to every route
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub directory: SessionDirectory,
    /// Direct network channel shared by all sessions
    pub network: Arc<dyn TelemetryChannel>,
}

impl AppState {
    pub fn new(config: Config, network: Arc<dyn TelemetryChannel>) -> Self {
        Self {
            config: Arc::new(config),
            directory: SessionDirectory::new(),
            network,
        }
    }
}
