//! JSON-RPC 2.0 over HTTP(S).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::RpcError;
use crate::transport::LedgerTransport;

/// HTTP client for a ledger JSON-RPC endpoint.
///
/// Wraps `reqwest::Client` with the endpoint URL and a request id counter.
/// Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    next_id: std::sync::Arc<AtomicU64>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

impl HttpTransport {
    /// Create a transport targeting the given endpoint URL (e.g. `http://127.0.0.1:8545`).
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RpcError::Endpoint(format!("{url} is not an http(s) URL")));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RpcError::Http(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            url,
            next_id: std::sync::Arc::new(AtomicU64::new(1)),
        })
    }

    /// The configured endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The URL may embed an API key.
        let host = self.url.split('/').take(3).collect::<Vec<_>>().join("/");
        f.debug_struct("HttpTransport").field("host", &host).finish()
    }
}

#[async_trait]
impl LedgerTransport for HttpTransport {
    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!(method, id, "rpc request");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Http(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(RpcError::Status(response.status().as_u16()));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| RpcError::InvalidResponse(e.without_url().to_string()))?;

        if let Some(err) = parsed.error {
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        parsed
            .result
            .ok_or_else(|| RpcError::InvalidResponse(format!("{method}: no result field")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(HttpTransport::new("ws://localhost"), Err(RpcError::Endpoint(_))));
        assert!(HttpTransport::new("https://example.org/v2/key").is_ok());
    }

    #[test]
    fn debug_hides_path() {
        let t = HttpTransport::new("https://eth-sepolia.g.alchemy.com/v2/secret").unwrap();
        let shown = format!("{t:?}");
        assert!(!shown.contains("secret"));
        assert!(shown.contains("eth-sepolia.g.alchemy.com"));
    }

    #[tokio::test]
    async fn returns_result_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "jsonrpc": "2.0", "method": "net_listening" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": true })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri()).unwrap();
        let result = transport.request("net_listening", json!([])).await.unwrap();
        assert_eq!(result, json!(true));
    }

    #[tokio::test]
    async fn maps_error_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": 4001, "message": "User rejected the request." }
            })))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri()).unwrap();
        let err = transport.request("eth_requestAccounts", json!([])).await.unwrap_err();
        assert!(err.is_user_rejected());
    }

    #[tokio::test]
    async fn maps_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri()).unwrap();
        let err = transport.request("eth_call", json!([])).await.unwrap_err();
        assert_eq!(err, RpcError::Status(503));
    }

    #[tokio::test]
    async fn missing_result_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1 })))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri()).unwrap();
        let err = transport.request("eth_call", json!([])).await.unwrap_err();
        assert!(matches!(err, RpcError::InvalidResponse(_)));
    }
}
