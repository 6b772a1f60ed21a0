use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("method {0} is not declared in the contract ABI")]
    UnknownMethod(String),

    #[error("method {method} takes {expected} arguments, got {got}")]
    ArgumentCount {
        method: String,
        expected: usize,
        got: usize,
    },

    #[error("malformed return data: {0}")]
    Malformed(String),

    #[error("value does not fit in 64 bits: {0}")]
    Overflow(String),

    #[error("invalid ABI artifact: {0}")]
    Artifact(String),
}
