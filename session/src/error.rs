use ballot_abi::AbiError;
use ballot_rpc::RpcError;
use ballot_wallet::WalletError;
use thiserror::Error;

use crate::notify::Action;

/// Failure of a single `call` or `send` against the contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("abi error: {0}")]
    Abi(#[from] AbiError),

    #[error("transport error: {0}")]
    Rpc(#[from] RpcError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("not ready: a connected wallet and a bound contract are required")]
    NotReady,

    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("contract binding failed: {0}")]
    BindFailed(String),

    #[error("failed to fetch candidates: {0}")]
    FetchFailed(String),

    #[error("invalid candidate id: {0}")]
    InvalidCandidateId(String),

    #[error("{action} failed: {reason}")]
    SendFailed { action: Action, reason: String },

    #[error("{0} already in progress")]
    AlreadyPending(Action),

    #[error("session closed")]
    Closed,

    #[error("{0} superseded by a newer attempt")]
    Superseded(Action),

    #[error("config error: {0}")]
    Config(String),
}
