//! Scripted wallet provider.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ballot_wallet::{WalletError, WalletProvider};
use tokio::sync::oneshot;

/// A wallet provider with scripted answers.
pub struct NullWallet {
    answers: Mutex<VecDeque<Result<Vec<String>, WalletError>>>,
    held: Mutex<Option<oneshot::Receiver<()>>>,
    requests: AtomicUsize,
}

impl NullWallet {
    /// Approves every request with these accounts.
    pub fn with_accounts(accounts: Vec<String>) -> Self {
        Self::answering(Ok(accounts))
    }

    /// Approves every request with a single account.
    pub fn approving(account: &str) -> Self {
        Self::with_accounts(vec![account.to_string()])
    }

    /// Denies every request as the user would.
    pub fn rejecting() -> Self {
        Self::answering(Err(WalletError::UserRejected))
    }

    pub fn answering(answer: Result<Vec<String>, WalletError>) -> Self {
        Self::sequence(vec![answer])
    }

    /// Answers requests in order, repeating the last answer once the rest
    /// are used up. An answer is picked when the request arrives, before any hold.
    pub fn sequence(answers: Vec<Result<Vec<String>, WalletError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            held: Mutex::new(None),
            requests: AtomicUsize::new(0),
        }
    }

    /// Hold the next request until the returned sender fires (or is dropped).
    pub fn hold(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.held.lock().unwrap() = Some(rx);
        tx
    }

    /// Number of account requests received.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for NullWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let answer = {
            let mut answers = self.answers.lock().unwrap();
            match answers.len() {
                0 => Err(WalletError::NoAccounts),
                1 => answers[0].clone(),
                _ => answers.pop_front().unwrap_or(Err(WalletError::NoAccounts)),
            }
        };
        let hold = self.held.lock().unwrap().take();
        if let Some(rx) = hold {
            let _ = rx.await;
        }
        answer
    }
}
