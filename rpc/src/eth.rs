//! Typed wrappers for the Ethereum JSON-RPC methods the client uses.

use ballot_types::{Account, TxHash};
use serde_json::json;

use crate::error::RpcError;
use crate::transport::LedgerTransport;

/// A transaction to be signed and submitted by the node or wallet holding `from`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Account,
    pub to: Account,
    pub data: Vec<u8>,
    pub gas: u64,
}

impl TransactionRequest {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "from": self.from.as_str(),
            "to": self.to.as_str(),
            "data": encode_bytes(&self.data),
            "gas": format!("{:#x}", self.gas),
        })
    }
}

pub fn encode_bytes(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn decode_bytes(value: &serde_json::Value) -> Result<Vec<u8>, RpcError> {
    let s = value
        .as_str()
        .ok_or_else(|| RpcError::InvalidResponse(format!("expected hex string, got {value}")))?;
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::InvalidResponse(format!("missing 0x prefix: {s}")))?;
    hex::decode(digits).map_err(|e| RpcError::InvalidResponse(format!("bad hex: {e}")))
}

/// `eth_call` against the latest block.
pub async fn call(
    transport: &dyn LedgerTransport,
    to: &Account,
    data: &[u8],
) -> Result<Vec<u8>, RpcError> {
    let result = transport
        .request(
            "eth_call",
            json!([{ "to": to.as_str(), "data": encode_bytes(data) }, "latest"]),
        )
        .await?;
    decode_bytes(&result)
}

/// `eth_sendTransaction`; resolves once the ledger has accepted the transaction.
pub async fn send_transaction(
    transport: &dyn LedgerTransport,
    tx: &TransactionRequest,
) -> Result<TxHash, RpcError> {
    let result = transport
        .request("eth_sendTransaction", json!([tx.to_json()]))
        .await?;
    let raw = result
        .as_str()
        .ok_or_else(|| RpcError::InvalidResponse(format!("expected tx hash, got {result}")))?;
    TxHash::parse(raw).map_err(|e| RpcError::InvalidResponse(e.to_string()))
}

/// `eth_getCode` at the latest block.
pub async fn get_code(transport: &dyn LedgerTransport, address: &Account) -> Result<Vec<u8>, RpcError> {
    let result = transport
        .request("eth_getCode", json!([address.as_str(), "latest"]))
        .await?;
    decode_bytes(&result)
}

/// `net_listening`.
pub async fn net_listening(transport: &dyn LedgerTransport) -> Result<bool, RpcError> {
    let result = transport.request("net_listening", json!([])).await?;
    result
        .as_bool()
        .ok_or_else(|| RpcError::InvalidResponse(format!("expected bool, got {result}")))
}

/// `eth_requestAccounts`, as exposed by wallets and local signers.
pub async fn request_accounts(transport: &dyn LedgerTransport) -> Result<Vec<String>, RpcError> {
    let result = transport.request("eth_requestAccounts", json!([])).await?;
    serde_json::from_value(result).map_err(|e| RpcError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_json_uses_hex_quantities() {
        let tx = TransactionRequest {
            from: Account::from_bytes([1; 20]),
            to: Account::from_bytes([2; 20]),
            data: vec![0xde, 0xad],
            gas: 300_000,
        };
        let v = tx.to_json();
        assert_eq!(v["gas"], "0x493e0");
        assert_eq!(v["data"], "0xdead");
        assert_eq!(v["from"], Account::from_bytes([1; 20]).as_str());
    }

    #[test]
    fn decode_bytes_requires_prefix() {
        assert_eq!(decode_bytes(&json!("0x0102")).unwrap(), vec![1, 2]);
        assert_eq!(decode_bytes(&json!("0x")).unwrap(), Vec::<u8>::new());
        assert!(decode_bytes(&json!("0102")).is_err());
        assert!(decode_bytes(&json!(12)).is_err());
    }
}
