//! Validation and submission of state-mutating contract calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use ballot_abi::{ElectionMethod, Token};
use ballot_types::{Account, CandidateId, TxHash, TypesError};

use crate::cache::CandidateCache;
use crate::contract::{ContractHandle, SendOptions};
use crate::error::SessionError;
use crate::notify::{Action, Notifier};

/// Request to register the sender as a candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub sender: Option<Account>,
}

/// Request to vote; `candidate_id` is the raw user input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteRequest {
    pub candidate_id: String,
    pub sender: Option<Account>,
}

/// The candidate-id text the user is editing.
#[derive(Default)]
pub struct PendingInput {
    value: Mutex<String>,
}

impl PendingInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> String {
        self.value.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, value: impl Into<String>) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value.into();
    }

    pub fn clear(&self) {
        self.value.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// Marks an action in flight until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn begin(flag: &'a AtomicBool, action: Action) -> Result<Self, SessionError> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(SessionError::AlreadyPending(action));
        }
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Submits registrations and votes, then refreshes the candidate cache.
///
/// Each outcome is logged and published through the [`Notifier`]. A second
/// submission of the same kind while one is in flight is refused locally;
/// registration and voting never wait on each other.
pub struct TransactionSubmitter {
    gas_limit: u64,
    cache: CandidateCache,
    notifier: Notifier,
    registering: AtomicBool,
    voting: AtomicBool,
}

impl TransactionSubmitter {
    pub fn new(gas_limit: u64, cache: CandidateCache, notifier: Notifier) -> Self {
        Self {
            gas_limit,
            cache,
            notifier,
            registering: AtomicBool::new(false),
            voting: AtomicBool::new(false),
        }
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn is_registering(&self) -> bool {
        self.registering.load(Ordering::SeqCst)
    }

    pub fn is_voting(&self) -> bool {
        self.voting.load(Ordering::SeqCst)
    }

    fn reject<T>(&self, action: Action, err: SessionError) -> Result<T, SessionError> {
        tracing::warn!(%action, error = %err, "action rejected");
        self.notifier.failure(action, &err);
        Err(err)
    }

    async fn refresh_after(&self, action: Action, handle: &ContractHandle) {
        if let Err(e) = self.cache.refresh(handle).await {
            tracing::warn!(%action, error = %e, "refresh after transaction failed");
            self.notifier.failure(Action::Refresh, &e);
        }
    }

    /// Register `request.sender` as a candidate.
    pub async fn register_candidate(
        &self,
        request: RegistrationRequest,
        handle: Option<&ContractHandle>,
    ) -> Result<TxHash, SessionError> {
        let action = Action::Registration;
        let (handle, sender) = match (handle, request.sender) {
            (Some(h), Some(s)) => (h, s),
            _ => return self.reject(action, SessionError::NotReady),
        };
        let _guard = match InFlight::begin(&self.registering, action) {
            Ok(g) => g,
            Err(e) => return self.reject(action, e),
        };

        let options = SendOptions {
            from: sender,
            gas_limit: self.gas_limit,
        };
        match handle
            .send(ElectionMethod::CandidateRegistration.name(), &[], &options)
            .await
        {
            Ok(tx) if self.cache.is_closed() => {
                tracing::debug!(%tx, "registration accepted after session closed");
                Ok(tx)
            }
            Ok(tx) => {
                tracing::info!(%tx, candidate = %options.from, "candidate registered");
                self.refresh_after(action, handle).await;
                self.notifier.success(action, "Candidate Registered Successfully");
                Ok(tx)
            }
            Err(e) => {
                let err = SessionError::SendFailed {
                    action,
                    reason: e.to_string(),
                };
                tracing::error!(error = %e, "error registering candidate");
                self.notifier.failure(action, &err);
                Err(err)
            }
        }
    }

    /// Vote for the candidate named in `request`.
    ///
    /// The id is checked against `candidate_count` before anything is sent.
    /// `input` is cleared when the id is rejected and after a successful vote.
    pub async fn cast_vote(
        &self,
        request: VoteRequest,
        handle: Option<&ContractHandle>,
        candidate_count: usize,
        input: &PendingInput,
    ) -> Result<TxHash, SessionError> {
        let action = Action::Vote;
        let (handle, sender) = match (handle, request.sender) {
            (Some(h), Some(s)) => (h, s),
            _ => return self.reject(action, SessionError::NotReady),
        };

        let candidate_id = match CandidateId::parse_bounded(&request.candidate_id, candidate_count) {
            Ok(id) => id,
            Err(e) => {
                input.clear();
                let reason = match e {
                    TypesError::InvalidCandidateId(reason) => reason,
                    other => other.to_string(),
                };
                return self.reject(action, SessionError::InvalidCandidateId(reason));
            }
        };

        let _guard = match InFlight::begin(&self.voting, action) {
            Ok(g) => g,
            Err(e) => return self.reject(action, e),
        };

        let options = SendOptions {
            from: sender,
            gas_limit: self.gas_limit,
        };
        match handle
            .send(
                ElectionMethod::Vote.name(),
                &[Token::from(candidate_id.get())],
                &options,
            )
            .await
        {
            Ok(tx) if self.cache.is_closed() => {
                tracing::debug!(%tx, "vote accepted after session closed");
                Ok(tx)
            }
            Ok(tx) => {
                tracing::info!(%tx, candidate = %candidate_id, "vote cast");
                input.clear();
                self.refresh_after(action, handle).await;
                self.notifier.success(action, "Vote Cast Successfully");
                Ok(tx)
            }
            Err(e) => {
                let err = SessionError::SendFailed {
                    action,
                    reason: e.to_string(),
                };
                tracing::error!(error = %e, "error casting vote");
                self.notifier.failure(action, &err);
                Err(err)
            }
        }
    }
}
