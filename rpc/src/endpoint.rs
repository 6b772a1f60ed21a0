//! Endpoint configuration: which ledger node the client talks to.

use ballot_types::NetworkId;
use serde::{Deserialize, Serialize};

use crate::error::RpcError;
use crate::http::HttpTransport;

/// Where to reach the ledger.
///
/// An explicit `rpc_url` wins. Otherwise the hosted endpoint for `network` is
/// used, which needs an API key; the `dev` network falls back to a local node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub network: NetworkId,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub rpc_url: Option<String>,
}

impl EndpointConfig {
    pub fn new(network: NetworkId) -> Self {
        Self {
            network,
            api_key: None,
            rpc_url: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    /// Resolve the endpoint URL.
    pub fn url(&self) -> Result<String, RpcError> {
        if let Some(url) = &self.rpc_url {
            return Ok(url.clone());
        }
        match (self.network, self.api_key.as_deref()) {
            (NetworkId::Dev, _) => Ok(self.network.default_local_url().to_string()),
            (network, Some(key)) if !key.is_empty() => Ok(format!(
                "https://eth-{}.g.alchemy.com/v2/{key}",
                network.as_str()
            )),
            (network, _) => Err(RpcError::Endpoint(format!(
                "no rpc_url and no API key configured for {}",
                network.as_str()
            ))),
        }
    }

    /// Build an HTTP transport for this endpoint.
    pub fn connect(&self) -> Result<HttpTransport, RpcError> {
        HttpTransport::new(self.url()?)
    }
}
