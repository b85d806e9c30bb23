// session-server/src/error.rs
use std::time::Duration;

/// User actions that are not valid in the current flow state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("wallet is not connected")]
    NotConnected,

    #[error("session is already signed, use sign again to start over")]
    AlreadySigned,

    #[error("there is no signed session to reset")]
    NotSigned,
}

/// Why the wallet did not produce a signature
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignError {
    /// The user declined the prompt
    #[error("{0}")]
    Rejected(String),

    #[error("signing failed: {0}")]
    Failed(String),
}

/// A telemetry channel could not deliver
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("unavailable")]
    Unavailable,

    #[error("{0}")]
    Failed(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("panicked: {0}")]
    Panicked(String),
}

/// A bridged call to the browser did not complete
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    #[error("bridge closed before reply")]
    Closed,

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The browser answered with an error
    #[error("{0}")]
    Remote(String),
}
