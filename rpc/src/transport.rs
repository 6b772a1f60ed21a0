//! The transport seam between the client and the ledger.

use async_trait::async_trait;

use crate::error::RpcError;

/// Something that can carry a JSON-RPC request to the ledger and return its `result`.
///
/// Implementations must be safe to call concurrently; read calls are issued in
/// parallel by the candidate cache.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, RpcError>;
}
