//! The wallet provider boundary.

use std::sync::Arc;

use async_trait::async_trait;
use ballot_rpc::{eth, LedgerTransport};

use crate::error::WalletError;

/// Source of user accounts. Only the first returned account is used.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask for account access; may suspend until the user approves.
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;
}

/// Provider reached over JSON-RPC (`eth_requestAccounts`), e.g. a local signer
/// or a development node with unlocked accounts.
pub struct RpcWalletProvider {
    transport: Arc<dyn LedgerTransport>,
}

impl RpcWalletProvider {
    pub fn new(transport: Arc<dyn LedgerTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        Ok(eth::request_accounts(self.transport.as_ref()).await?)
    }
}
