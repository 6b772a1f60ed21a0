use ballot_rpc::RpcError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("no wallet provider available")]
    ProviderUnavailable,

    #[error("wallet access was rejected by the user")]
    UserRejected,

    #[error("wallet returned no accounts")]
    NoAccounts,

    #[error("wallet returned an invalid account: {0}")]
    InvalidAccount(String),

    #[error("wallet provider error: {0}")]
    Rpc(RpcError),
}

impl From<RpcError> for WalletError {
    fn from(e: RpcError) -> Self {
        if e.is_user_rejected() {
            WalletError::UserRejected
        } else {
            WalletError::Rpc(e)
        }
    }
}
