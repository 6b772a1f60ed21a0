//! Shared utilities for the ballot client.

pub mod format;
pub mod logging;

pub use format::{short_address, vote_share};
pub use logging::{init_logging, LogFormat};
