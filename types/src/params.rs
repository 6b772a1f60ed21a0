//! Client constants.

/// Gas budget attached to every state-mutating contract call.
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;

/// Address of the deployed election contract on Sepolia.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x751f3e144A2E9887042404E36a4631EF71C5BFe9";
