//! Fundamental types for the ballot election client.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! accounts, transaction hashes, candidates, snapshots, network ids and client constants.

pub mod address;
pub mod candidate;
pub mod error;
pub mod hash;
pub mod network;
pub mod params;

pub use address::Account;
pub use candidate::{Candidate, CandidateId, CandidateSnapshot};
pub use error::TypesError;
pub use hash::TxHash;
pub use network::NetworkId;
pub use params::{DEFAULT_CONTRACT_ADDRESS, DEFAULT_GAS_LIMIT};
