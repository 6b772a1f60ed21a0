//! Account discovery through the wallet provider.

use std::sync::{Arc, Mutex};

use ballot_types::Account;

use crate::error::WalletError;
use crate::provider::WalletProvider;

/// Requests account access and remembers the account it got.
///
/// A missing provider is not a construction error: `connect` reports
/// [`WalletError::ProviderUnavailable`] so the caller can keep running
/// read-only.
pub struct WalletConnector {
    provider: Option<Arc<dyn WalletProvider>>,
    account: Mutex<Option<Account>>,
}

impl WalletConnector {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self {
            provider,
            account: Mutex::new(None),
        }
    }

    /// Whether a provider is present at all.
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// The account from the last successful `connect`.
    pub fn account(&self) -> Option<Account> {
        self.account.lock().ok().and_then(|a| a.clone())
    }

    /// Ask the provider for access and take the first account it returns.
    ///
    /// No retries; a failure leaves the previously connected account (if any)
    /// in place.
    pub async fn connect(&self) -> Result<Account, WalletError> {
        let provider = match &self.provider {
            Some(p) => p,
            None => {
                tracing::warn!("wallet not detected");
                return Err(WalletError::ProviderUnavailable);
            }
        };

        let accounts = provider.request_accounts().await.map_err(|e| {
            tracing::error!(error = %e, "error connecting wallet");
            e
        })?;
        let first = accounts.first().ok_or(WalletError::NoAccounts)?;
        let account =
            Account::parse(first).map_err(|_| WalletError::InvalidAccount(first.clone()))?;

        if let Ok(mut slot) = self.account.lock() {
            *slot = Some(account.clone());
        }
        tracing::info!(account = %account, "connected account");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ballot_rpc::{LedgerTransport, RpcError};

    use crate::provider::RpcWalletProvider;

    struct Fixed(Result<Vec<String>, WalletError>);

    #[async_trait]
    impl WalletProvider for Fixed {
        async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
            self.0.clone()
        }
    }

    fn connector(result: Result<Vec<String>, WalletError>) -> WalletConnector {
        WalletConnector::new(Some(Arc::new(Fixed(result))))
    }

    const A: &str = "0x00000000000000000000000000000000000000aa";
    const B: &str = "0x00000000000000000000000000000000000000bb";

    #[tokio::test]
    async fn takes_first_account() {
        let c = connector(Ok(vec![A.into(), B.into()]));
        let account = c.connect().await.unwrap();
        assert_eq!(account.as_str(), A);
        assert_eq!(c.account(), Some(account));
    }

    #[tokio::test]
    async fn missing_provider() {
        let c = WalletConnector::new(None);
        assert!(!c.has_provider());
        assert_eq!(c.connect().await, Err(WalletError::ProviderUnavailable));
        assert_eq!(c.account(), None);
    }

    #[tokio::test]
    async fn rejection_and_empty_list() {
        assert_eq!(
            connector(Err(WalletError::UserRejected)).connect().await,
            Err(WalletError::UserRejected)
        );
        assert_eq!(connector(Ok(vec![])).connect().await, Err(WalletError::NoAccounts));
        assert!(matches!(
            connector(Ok(vec!["nope".into()])).connect().await,
            Err(WalletError::InvalidAccount(_))
        ));
    }

    struct Rejecting;

    #[async_trait]
    impl LedgerTransport for Rejecting {
        async fn request(
            &self,
            _method: &str,
            _params: serde_json::Value,
        ) -> Result<serde_json::Value, RpcError> {
            Err(RpcError::Rpc {
                code: 4001,
                message: "User rejected the request.".into(),
            })
        }
    }

    #[tokio::test]
    async fn rpc_rejection_maps_to_user_rejected() {
        let provider = RpcWalletProvider::new(Arc::new(Rejecting));
        let c = WalletConnector::new(Some(Arc::new(provider)));
        assert_eq!(c.connect().await, Err(WalletError::UserRejected));
    }
}
