//! Wallet access for the ballot client.
//!
//! - [`WalletProvider`]: the "request accounts" boundary (browser wallet, local signer, test double)
//! - [`RpcWalletProvider`]: a provider reached over a JSON-RPC transport
//! - [`WalletConnector`]: asks the provider for access and tracks the connected account

pub mod connector;
pub mod error;
pub mod provider;

pub use connector::WalletConnector;
pub use error::WalletError;
pub use provider::{RpcWalletProvider, WalletProvider};
