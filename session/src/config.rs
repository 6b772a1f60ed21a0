//! Session configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use ballot_abi::ContractAbi;
use ballot_rpc::EndpointConfig;
use ballot_types::{NetworkId, DEFAULT_CONTRACT_ADDRESS, DEFAULT_GAS_LIMIT};
use ballot_utils::LogFormat;

use crate::SessionError;

/// Configuration for an election session.
///
/// Can be loaded from a TOML file via [`SessionConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Which network the contract lives on.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    /// API key for the hosted endpoint.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Explicit ledger endpoint; overrides the hosted one.
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Endpoint of the wallet / signer answering `eth_requestAccounts`.
    /// Without one the session runs read-only.
    #[serde(default)]
    pub wallet_url: Option<String>,

    /// Address of the deployed election contract.
    #[serde(default = "default_contract_address")]
    pub contract_address: String,

    /// JSON ABI artifact; the built-in schema is used when absent.
    #[serde(default)]
    pub abi_path: Option<PathBuf>,

    /// Gas budget for registration and voting.
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,

    /// Run the advisory connectivity check after binding.
    #[serde(default = "default_true")]
    pub probe_on_bind: bool,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Sepolia
}

fn default_contract_address() -> String {
    DEFAULT_CONTRACT_ADDRESS.to_string()
}

fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl SessionConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SessionError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, SessionError> {
        toml::from_str(s).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, SessionError> {
        toml::to_string_pretty(self).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// The ledger endpoint described by this configuration.
    pub fn endpoint(&self) -> EndpointConfig {
        EndpointConfig {
            network: self.network,
            api_key: self.api_key.clone(),
            rpc_url: self.rpc_url.clone(),
        }
    }

    /// The contract ABI: from `abi_path` if set, otherwise built in.
    pub fn load_abi(&self) -> Result<ContractAbi, SessionError> {
        match &self.abi_path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|e| SessionError::Config(format!("{}: {e}", path.display())))?;
                ContractAbi::from_json(&json).map_err(|e| SessionError::Config(e.to_string()))
            }
            None => Ok(ContractAbi::election()),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            api_key: None,
            rpc_url: None,
            wallet_url: None,
            contract_address: default_contract_address(),
            abi_path: None,
            gas_limit: default_gas_limit(),
            probe_on_bind: default_true(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
