// session-server/src/lib.rs
pub mod actors;
pub mod api;
pub mod bridge;
pub mod directory;
pub mod error;
pub mod flow;
pub mod reporter;
pub mod routing;
pub mod state;
pub mod static_files;
pub mod telemetry;
pub mod wallet;

pub use state::AppState;
