// session-server/src/wallet.rs
use async_trait::async_trait;

use crate::error::SignError;

/// The wallet side of the sign step.
///
/// Resolves with the signature, or fails when the user rejects the prompt
/// or the wallet cannot sign.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    async fn sign(&self, message: &str, account: &str) -> Result<String, SignError>;
}
