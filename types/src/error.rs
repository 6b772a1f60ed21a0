//! Error type for parsing the shared client types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid account address: {0}")]
    InvalidAddress(String),

    #[error("invalid transaction hash: {0}")]
    InvalidHash(String),

    #[error("invalid candidate id: {0}")]
    InvalidCandidateId(String),

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}
