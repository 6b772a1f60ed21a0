//! JSON-RPC transport to the ledger.
//!
//! Provides:
//! - The [`LedgerTransport`] seam every other crate talks through
//! - [`HttpTransport`], JSON-RPC 2.0 over HTTP(S)
//! - Typed helpers for the handful of Ethereum RPC methods the client uses
//! - [`EndpointConfig`], which resolves a network + API key into an endpoint URL

pub mod endpoint;
pub mod error;
pub mod eth;
pub mod http;
pub mod transport;

pub use endpoint::EndpointConfig;
pub use error::RpcError;
pub use eth::TransactionRequest;
pub use http::HttpTransport;
pub use transport::LedgerTransport;
