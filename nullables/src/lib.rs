//! Nullable infrastructure for deterministic testing.
//!
//! The client's external dependencies (ledger transport, wallet provider) are
//! abstracted behind traits. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically (failures, held responses)
//! - Record every request for assertions
//! - Never touch the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod ledger;
pub mod wallet;

pub use ledger::{NullLedger, RecordedRequest};
pub use wallet::NullWallet;
