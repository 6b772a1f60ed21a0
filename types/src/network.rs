//! Network identifier.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::TypesError;

/// Identifies which ledger network the client talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// The production network.
    Mainnet,
    /// The public Sepolia test network.
    Sepolia,
    /// Local development node.
    Dev,
}

impl NetworkId {
    /// EIP-155 chain id.
    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Mainnet => 1,
            Self::Sepolia => 11_155_111,
            Self::Dev => 1337,
        }
    }

    /// Human-readable name, also used as the hosted endpoint subdomain.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Sepolia => "sepolia",
            Self::Dev => "dev",
        }
    }

    /// Default endpoint for a node running on this machine.
    pub fn default_local_url(&self) -> &'static str {
        "http://127.0.0.1:8545"
    }
}

impl FromStr for NetworkId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Self::Mainnet),
            "sepolia" => Ok(Self::Sepolia),
            "dev" | "local" => Ok(Self::Dev),
            other => Err(TypesError::UnknownNetwork(other.to_string())),
        }
    }
}
