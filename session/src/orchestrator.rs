//! Session orchestration: wallet connection and contract binding run
//! concurrently, and mutating actions are gated on both having succeeded.
//!
//! Readiness is tracked per axis ([`WalletState`], [`ContractState`],
//! [`DataState`]) instead of one combined flag, so a wallet failure leaves a
//! bound contract usable for reads and vice versa. Each initialization is
//! tagged with an epoch; results that land after [`SessionOrchestrator::close`]
//! are discarded. Wallet connections also carry an attempt number, so a slow
//! connection cannot overwrite the account from a later reconnect.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ballot_rpc::HttpTransport;
use ballot_types::{Account, CandidateSnapshot, TxHash};
use ballot_wallet::{RpcWalletProvider, WalletConnector, WalletProvider};
use tokio::sync::{broadcast, watch};

use crate::cache::CandidateCache;
use crate::config::SessionConfig;
use crate::contract::{ContractBinding, ContractHandle, ContractSession, TransportSource};
use crate::error::SessionError;
use crate::notify::{Action, Notification, Notifier};
use crate::submitter::{PendingInput, RegistrationRequest, TransactionSubmitter, VoteRequest};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletState {
    Disconnected,
    Connecting,
    Connected(Account),
    /// The last connection attempt failed; the session is read-only.
    Unavailable(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractState {
    Unbound,
    Binding,
    Bound(Account),
    BindFailed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataState {
    /// No fetch has been applied yet.
    Empty,
    Loading,
    Loaded(usize),
}

impl fmt::Display for WalletState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletState::Disconnected => f.write_str("disconnected"),
            WalletState::Connecting => f.write_str("connecting"),
            WalletState::Connected(account) => write!(f, "connected ({account})"),
            WalletState::Unavailable(reason) => write!(f, "unavailable ({reason})"),
        }
    }
}

impl fmt::Display for ContractState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractState::Unbound => f.write_str("unbound"),
            ContractState::Binding => f.write_str("binding"),
            ContractState::Bound(address) => write!(f, "bound ({address})"),
            ContractState::BindFailed(reason) => write!(f, "bind failed ({reason})"),
        }
    }
}

impl fmt::Display for DataState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataState::Empty => f.write_str("empty"),
            DataState::Loading => f.write_str("loading"),
            DataState::Loaded(n) => write!(f, "{n} candidates"),
        }
    }
}

/// Point-in-time view of all three axes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionStatus {
    pub wallet: WalletState,
    pub contract: ContractState,
    pub data: DataState,
    /// Both a connected account and a bound contract are present.
    pub ready: bool,
}

/// The connected account and bound contract, replaced as a whole.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub account: Option<Account>,
    pub contract: Option<ContractHandle>,
}

impl Session {
    pub fn is_ready(&self) -> bool {
        self.account.is_some() && self.contract.is_some()
    }
}

struct AxisState {
    wallet: WalletState,
    contract: ContractState,
    session: Arc<Session>,
}

pub struct SessionOrchestrator {
    wallet: WalletConnector,
    binding: ContractBinding,
    probe_on_bind: bool,
    cache: CandidateCache,
    submitter: TransactionSubmitter,
    notifier: Notifier,
    input: PendingInput,
    state: Mutex<AxisState>,
    epoch: AtomicU64,
    wallet_attempt: AtomicU64,
    closed: AtomicBool,
}

impl SessionOrchestrator {
    pub fn new(wallet: WalletConnector, binding: ContractBinding, gas_limit: u64) -> Self {
        let cache = CandidateCache::new();
        let notifier = Notifier::new();
        let submitter = TransactionSubmitter::new(gas_limit, cache.clone(), notifier.clone());
        Self {
            wallet,
            binding,
            probe_on_bind: true,
            cache,
            submitter,
            notifier,
            input: PendingInput::new(),
            state: Mutex::new(AxisState {
                wallet: WalletState::Disconnected,
                contract: ContractState::Unbound,
                session: Arc::new(Session::default()),
            }),
            epoch: AtomicU64::new(0),
            wallet_attempt: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Enable or disable the advisory connectivity check after binding.
    pub fn with_probe(mut self, enabled: bool) -> Self {
        self.probe_on_bind = enabled;
        self
    }

    /// Build a session from configuration. Nothing touches the network until
    /// [`start`](Self::start).
    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        let abi = config.load_abi()?;
        let provider: Option<Arc<dyn WalletProvider>> = match &config.wallet_url {
            Some(url) => {
                let transport = HttpTransport::new(url.clone())
                    .map_err(|e| SessionError::Config(format!("wallet_url: {e}")))?;
                Some(Arc::new(RpcWalletProvider::new(Arc::new(transport))))
            }
            None => None,
        };
        let binding = ContractBinding {
            source: TransportSource::Endpoint(config.endpoint()),
            address: config.contract_address.clone(),
            abi,
        };
        Ok(Self::new(WalletConnector::new(provider), binding, config.gas_limit)
            .with_probe(config.probe_on_bind))
    }

    fn state(&self) -> MutexGuard<'_, AxisState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, epoch: u64) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn next_wallet_attempt(&self) -> u64 {
        self.wallet_attempt.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    /// Connect the wallet and bind the contract concurrently, then load the
    /// candidate list. Either side may fail without affecting the other.
    pub async fn start(&self) -> SessionStatus {
        if self.ensure_open().is_err() {
            return self.status();
        }
        let epoch = self.epoch.load(Ordering::SeqCst);
        let attempt = self.next_wallet_attempt();
        {
            let mut st = self.state();
            st.wallet = WalletState::Connecting;
            st.contract = ContractState::Binding;
        }
        tracing::info!(contract = %self.binding.address, "starting election session");

        let (wallet, contract) =
            tokio::join!(self.connect_wallet(epoch, attempt), self.bind_contract(epoch));
        if let (Ok(_), Ok(_)) = (&wallet, &contract) {
            tracing::info!("session ready");
        }
        self.status()
    }

    async fn connect_wallet(&self, epoch: u64, attempt: u64) -> Result<Account, SessionError> {
        let result = self.wallet.connect().await;
        if !self.is_current(epoch) {
            tracing::debug!("discarding wallet result for a stale session");
            return Err(SessionError::Closed);
        }

        let mut st = self.state();
        if self.wallet_attempt.load(Ordering::SeqCst) != attempt {
            tracing::debug!(attempt, "discarding wallet result from a superseded attempt");
            return Err(SessionError::Superseded(Action::Connect));
        }
        match result {
            Ok(account) => {
                st.wallet = WalletState::Connected(account.clone());
                st.session = Arc::new(Session {
                    account: Some(account.clone()),
                    contract: st.session.contract.clone(),
                });
                drop(st);
                self.notifier.success(Action::Connect, "Wallet Connected");
                Ok(account)
            }
            Err(e) => {
                st.wallet = WalletState::Unavailable(e.to_string());
                st.session = Arc::new(Session {
                    account: None,
                    contract: st.session.contract.clone(),
                });
                drop(st);
                let err = SessionError::Wallet(e);
                self.notifier.failure(Action::Connect, &err);
                Err(err)
            }
        }
    }

    async fn bind_contract(&self, epoch: u64) -> Result<ContractHandle, SessionError> {
        let result = ContractSession::open(&self.binding).await;
        if !self.is_current(epoch) {
            tracing::debug!("discarding contract binding for a stale session");
            return Err(SessionError::Closed);
        }

        let handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "error initializing contract");
                {
                    let mut st = self.state();
                    st.contract = ContractState::BindFailed(e.to_string());
                    st.session = Arc::new(Session {
                        account: st.session.account.clone(),
                        contract: None,
                    });
                }
                self.notifier.failure(Action::Bind, &e);
                return Err(e);
            }
        };

        {
            let mut st = self.state();
            st.contract = ContractState::Bound(handle.address().clone());
            st.session = Arc::new(Session {
                account: st.session.account.clone(),
                contract: Some(handle.clone()),
            });
        }
        tracing::info!(address = %handle.address(), "contract initialized");
        self.notifier.success(Action::Bind, "Contract Initialized");

        if self.probe_on_bind {
            let probe = handle.clone();
            tokio::spawn(async move { probe.probe().await });
        }

        // A failed first load is reported but does not undo the binding.
        let _ = self.refresh_with(&handle).await;
        Ok(handle)
    }

    async fn refresh_with(&self, handle: &ContractHandle) -> Result<CandidateSnapshot, SessionError> {
        let result = self.cache.refresh(handle).await;
        match &result {
            Err(SessionError::Closed) => {}
            Err(e) => self.notifier.failure(Action::Refresh, e),
            Ok(_) => {}
        }
        result
    }

    /// Re-run the wallet connection, e.g. after the user switched accounts.
    /// An earlier connection still in flight is superseded.
    pub async fn reconnect(&self) -> Result<Account, SessionError> {
        self.ensure_open()?;
        let epoch = self.epoch.load(Ordering::SeqCst);
        let attempt = self.next_wallet_attempt();
        self.state().wallet = WalletState::Connecting;
        self.connect_wallet(epoch, attempt).await
    }

    /// Reload the candidate list. Requires a bound contract but no wallet.
    pub async fn refresh(&self) -> Result<CandidateSnapshot, SessionError> {
        self.ensure_open()?;
        match self.session().contract.clone() {
            Some(handle) => self.refresh_with(&handle).await,
            None => {
                let err = SessionError::NotReady;
                self.notifier.failure(Action::Refresh, &err);
                Err(err)
            }
        }
    }

    /// Register the connected account as a candidate.
    pub async fn register(&self) -> Result<TxHash, SessionError> {
        self.ensure_open()?;
        let session = self.session();
        self.submitter
            .register_candidate(
                RegistrationRequest {
                    sender: session.account.clone(),
                },
                session.contract.as_ref(),
            )
            .await
    }

    /// Vote for the candidate id currently in the pending input.
    pub async fn vote(&self) -> Result<TxHash, SessionError> {
        self.ensure_open()?;
        let session = self.session();
        let request = VoteRequest {
            candidate_id: self.input.get(),
            sender: session.account.clone(),
        };
        self.submitter
            .cast_vote(
                request,
                session.contract.as_ref(),
                self.cache.candidate_count(),
                &self.input,
            )
            .await
    }

    /// Put `candidate_id` into the pending input and vote with it.
    pub async fn vote_for(&self, candidate_id: &str) -> Result<TxHash, SessionError> {
        self.set_candidate_input(candidate_id);
        self.vote().await
    }

    /// Stop the session. Initialization or fetches still in flight finish but
    /// their results are discarded; later actions return [`SessionError::Closed`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.cache.close();
        tracing::info!("election session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SessionStatus {
        let st = self.state();
        let data = if self.cache.is_loading() {
            DataState::Loading
        } else if self.cache.is_loaded() {
            DataState::Loaded(self.cache.candidate_count())
        } else {
            DataState::Empty
        };
        SessionStatus {
            wallet: st.wallet.clone(),
            contract: st.contract.clone(),
            data,
            ready: st.session.is_ready(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state().session.is_ready()
    }

    /// The current account and contract handle.
    pub fn session(&self) -> Arc<Session> {
        self.state().session.clone()
    }

    pub fn account(&self) -> Option<Account> {
        self.state().session.account.clone()
    }

    pub fn snapshot(&self) -> CandidateSnapshot {
        self.cache.snapshot()
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<CandidateSnapshot> {
        self.cache.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn pending_input(&self) -> String {
        self.input.get()
    }

    pub fn set_candidate_input(&self, value: impl Into<String>) {
        self.input.set(value);
    }

    pub fn is_registering(&self) -> bool {
        self.submitter.is_registering()
    }

    pub fn is_voting(&self) -> bool {
        self.submitter.is_voting()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_abi::ContractAbi;
    use ballot_nullables::{NullLedger, NullWallet};
    use ballot_types::{NetworkId, DEFAULT_CONTRACT_ADDRESS, DEFAULT_GAS_LIMIT};

    const ACCOUNT: &str = "0x00000000000000000000000000000000000000aa";

    fn orchestrator(wallet: NullWallet, ledger: &Arc<NullLedger>) -> SessionOrchestrator {
        let binding = ContractBinding {
            source: TransportSource::Shared(ledger.clone()),
            address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            abi: ContractAbi::election(),
        };
        SessionOrchestrator::new(
            WalletConnector::new(Some(Arc::new(wallet))),
            binding,
            DEFAULT_GAS_LIMIT,
        )
        .with_probe(false)
    }

    #[test]
    fn fresh_session_is_idle() {
        let ledger = Arc::new(NullLedger::new());
        let o = orchestrator(NullWallet::approving(ACCOUNT), &ledger);
        let status = o.status();
        assert_eq!(status.wallet, WalletState::Disconnected);
        assert_eq!(status.contract, ContractState::Unbound);
        assert_eq!(status.data, DataState::Empty);
        assert!(!status.ready);
    }

    #[tokio::test]
    async fn start_reaches_ready() {
        let ledger = Arc::new(NullLedger::with_candidate_count(2));
        let o = orchestrator(NullWallet::approving(ACCOUNT), &ledger);
        let status = o.start().await;
        assert!(status.ready);
        assert_eq!(status.data, DataState::Loaded(2));
        assert_eq!(o.account().unwrap().as_str(), ACCOUNT);
    }

    #[tokio::test]
    async fn refresh_without_contract_is_not_ready() {
        let ledger = Arc::new(NullLedger::new());
        let o = orchestrator(NullWallet::approving(ACCOUNT), &ledger);
        assert_eq!(o.refresh().await, Err(SessionError::NotReady));
        assert_eq!(ledger.request_count(), 0);
    }

    #[tokio::test]
    async fn closed_session_refuses_actions() {
        let ledger = Arc::new(NullLedger::with_candidate_count(1));
        let o = orchestrator(NullWallet::approving(ACCOUNT), &ledger);
        o.start().await;
        o.close();
        o.close();
        assert!(o.is_closed());
        assert_eq!(o.register().await, Err(SessionError::Closed));
        assert_eq!(o.vote_for("0").await, Err(SessionError::Closed));
        assert_eq!(o.refresh().await, Err(SessionError::Closed));
        assert_eq!(o.reconnect().await, Err(SessionError::Closed));
    }

    #[tokio::test]
    async fn failed_rebind_drops_the_old_handle() {
        let ledger = Arc::new(NullLedger::with_candidate_count(1));
        let mut o = orchestrator(NullWallet::approving(ACCOUNT), &ledger);
        assert!(o.start().await.ready);

        o.binding.address = "0x12".into();
        let status = o.start().await;
        assert!(matches!(status.contract, ContractState::BindFailed(_)));
        assert!(!status.ready);
        assert!(o.session().contract.is_none());
        assert_eq!(o.account().unwrap().as_str(), ACCOUNT);
        assert_eq!(o.register().await, Err(SessionError::NotReady));
    }

    #[test]
    fn from_config_without_wallet_is_read_only() {
        let config = SessionConfig {
            network: NetworkId::Dev,
            ..Default::default()
        };
        let o = SessionOrchestrator::from_config(&config).unwrap();
        assert!(!o.wallet.has_provider());

        let config = SessionConfig {
            wallet_url: Some("ws://localhost".into()),
            ..config
        };
        assert!(matches!(
            SessionOrchestrator::from_config(&config),
            Err(SessionError::Config(_))
        ));
    }
}
