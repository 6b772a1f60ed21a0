//! Election session controller.
//!
//! Composes the client's moving parts:
//! - [`ContractSession`] binds a [`ContractHandle`] over a ledger transport
//! - [`CandidateCache`] keeps the latest candidate snapshot with a loading flag
//! - [`TransactionSubmitter`] validates and submits registrations and votes
//! - [`SessionOrchestrator`] races wallet connection against contract binding
//!   and gates mutating actions on both being ready
//!
//! Every failure is logged and published as a [`Notification`]; none of them
//! tear the session down.

pub mod cache;
pub mod config;
pub mod contract;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod submitter;

pub use cache::CandidateCache;
pub use config::SessionConfig;
pub use contract::{ContractBinding, ContractHandle, ContractSession, SendOptions, TransportSource};
pub use error::{ContractError, SessionError};
pub use notify::{Action, Notification, Notifier, Outcome};
pub use orchestrator::{
    ContractState, DataState, Session, SessionOrchestrator, SessionStatus, WalletState,
};
pub use submitter::{PendingInput, RegistrationRequest, TransactionSubmitter, VoteRequest};
