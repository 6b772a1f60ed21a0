//! Contract ABI support for the election client.
//!
//! Covers only what the client consumes:
//! - Loading the contract's JSON ABI artifact (or the built-in schema)
//! - Function selectors (first four bytes of Keccak-256 of the signature)
//! - Encoding call data for `uint256` / `address` arguments
//! - Decoding `uint256` and the candidate tuple array returned by `getCandidates()`

pub mod codec;
pub mod error;
pub mod schema;

pub use codec::{decode_candidates, decode_uint, encode_call, encode_candidates, encode_uint, Token};
pub use error::AbiError;
pub use ethereum_types::U256;
pub use schema::{selector, AbiFunction, AbiParam, ContractAbi, ElectionMethod};
