//! RPC error types.

use thiserror::Error;

/// EIP-1193 "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("endpoint returned HTTP {0}")]
    Status(u16),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

impl RpcError {
    /// Whether the wallet or signer refused the request.
    pub fn is_user_rejected(&self) -> bool {
        matches!(self, RpcError::Rpc { code, .. } if *code == USER_REJECTED_CODE)
    }
}
