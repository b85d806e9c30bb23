// common/src/models/identity.rs
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::shorten;

/// Account reported by the wallet for the current connection epoch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletIdentity {
    pub address: String,
    pub chain_id: u64,
}

impl WalletIdentity {
    pub fn new(address: impl Into<String>, chain_id: u64) -> Self {
        Self {
            address: address.into(),
            chain_id,
        }
    }
}

impl fmt::Display for WalletIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", shorten(&self.address, 6, 4), self.chain_id)
    }
}
