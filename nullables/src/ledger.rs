//! In-memory election contract behind a JSON-RPC transport.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ballot_abi::{encode_candidates, encode_uint, ContractAbi, ElectionMethod, U256};
use ballot_rpc::eth::encode_bytes;
use ballot_rpc::{LedgerTransport, RpcError};
use ballot_types::{Account, Candidate};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// One request seen by the [`NullLedger`].
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    /// JSON-RPC method, e.g. `eth_call`.
    pub rpc_method: String,
    /// Contract method resolved from the call data selector, if any.
    pub contract_method: Option<&'static str>,
    pub params: Value,
}

/// A test ledger that answers the election contract's methods from memory.
///
/// Registration appends the sender as a new candidate, voting increments a
/// tally. Every request is recorded. Individual methods can be made to fail,
/// and `getCandidates` or transaction responses can be held back until
/// released so tests can control completion order.
pub struct NullLedger {
    abi: ContractAbi,
    candidates: Mutex<Vec<Candidate>>,
    voters: Mutex<HashSet<Account>>,
    requests: Mutex<Vec<RecordedRequest>>,
    failing: Mutex<HashSet<String>>,
    held: Mutex<VecDeque<oneshot::Receiver<()>>>,
    held_sends: Mutex<VecDeque<oneshot::Receiver<()>>>,
    waiting: AtomicUsize,
    next_tx: AtomicU64,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::with_candidates(Vec::new())
    }

    pub fn with_candidates(candidates: Vec<Candidate>) -> Self {
        Self {
            abi: ContractAbi::election(),
            candidates: Mutex::new(candidates),
            voters: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            held: Mutex::new(VecDeque::new()),
            held_sends: Mutex::new(VecDeque::new()),
            waiting: AtomicUsize::new(0),
            next_tx: AtomicU64::new(1),
        }
    }

    /// `n` candidates with deterministic addresses and zero votes.
    pub fn with_candidate_count(n: u64) -> Self {
        Self::with_candidates((0..n).map(|id| Self::candidate(id, 0)).collect())
    }

    /// A candidate whose address is derived from its id.
    pub fn candidate(id: u64, votes: u64) -> Candidate {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&(id + 1).to_be_bytes());
        Candidate {
            candidate_id: id,
            candidate_address: Account::from_bytes(bytes),
            votes,
        }
    }

    /// Register a candidate directly, bypassing the transport.
    pub fn register(&self, address: Account) -> u64 {
        let mut candidates = self.candidates.lock().unwrap();
        let id = candidates.len() as u64;
        candidates.push(Candidate {
            candidate_id: id,
            candidate_address: address,
            votes: 0,
        });
        id
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        self.candidates.lock().unwrap().clone()
    }

    /// Make every request for `method` fail. Accepts contract method names
    /// (`getCandidates`, `Vote`, ...) and JSON-RPC method names (`net_listening`, ...).
    pub fn fail(&self, method: &str) {
        self.failing.lock().unwrap().insert(method.to_string());
    }

    /// Undo [`fail`](Self::fail).
    pub fn heal(&self, method: &str) {
        self.failing.lock().unwrap().remove(method);
    }

    /// Hold the response of the next `getCandidates` call until the returned
    /// sender fires (or is dropped). The response content is taken when the
    /// call arrives, not when it is released.
    pub fn hold_next_candidates(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.held.lock().unwrap().push_back(rx);
        tx
    }

    /// Hold the response of the next `eth_sendTransaction` until the returned
    /// sender fires. The transaction is applied when the call arrives.
    pub fn hold_next_send(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.held_sends.lock().unwrap().push_back(rx);
        tx
    }

    /// Number of calls currently parked by [`hold_next_candidates`](Self::hold_next_candidates)
    /// or [`hold_next_send`](Self::hold_next_send).
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Total number of requests of any kind.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests matching a JSON-RPC or contract method name.
    pub fn count(&self, method: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.rpc_method == method || r.contract_method == Some(method))
            .count()
    }

    /// Clear recorded requests.
    pub fn reset_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    /// Map the call data of an `eth_call` / `eth_sendTransaction` to a contract method.
    fn resolve(&self, params: &Value) -> Option<(ElectionMethod, Vec<u8>)> {
        let data = params.get(0)?.get("data")?.as_str()?;
        let bytes = hex::decode(data.strip_prefix("0x")?).ok()?;
        if bytes.len() < 4 {
            return None;
        }
        let method = ElectionMethod::ALL.into_iter().find(|m| {
            self.abi
                .function(m.name())
                .map(|f| f.selector()[..] == bytes[..4])
                .unwrap_or(false)
        })?;
        Some((method, bytes[4..].to_vec()))
    }

    fn is_failing(&self, rpc_method: &str, contract: Option<ElectionMethod>) -> bool {
        let failing = self.failing.lock().unwrap();
        failing.contains(rpc_method) || contract.map(|m| failing.contains(m.name())).unwrap_or(false)
    }

    fn revert(reason: &str) -> RpcError {
        RpcError::Rpc {
            code: 3,
            message: format!("execution reverted: {reason}"),
        }
    }

    async fn park(&self, hold: Option<oneshot::Receiver<()>>) {
        if let Some(rx) = hold {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            let _ = rx.await;
            self.waiting.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn execute_send(&self, method: ElectionMethod, args: &[u8], from: Account) -> Result<Value, RpcError> {
        match method {
            ElectionMethod::CandidateRegistration => {
                let mut candidates = self.candidates.lock().unwrap();
                if candidates.iter().any(|c| c.candidate_address == from) {
                    return Err(Self::revert("already registered"));
                }
                let id = candidates.len() as u64;
                candidates.push(Candidate {
                    candidate_id: id,
                    candidate_address: from,
                    votes: 0,
                });
            }
            ElectionMethod::Vote => {
                if args.len() < 32 {
                    return Err(Self::revert("missing candidate id"));
                }
                let id = U256::from_big_endian(&args[..32]);
                let mut candidates = self.candidates.lock().unwrap();
                let candidate = candidates
                    .iter_mut()
                    .find(|c| U256::from(c.candidate_id) == id)
                    .ok_or_else(|| Self::revert("invalid candidate"))?;
                if !self.voters.lock().unwrap().insert(from) {
                    return Err(Self::revert("already voted"));
                }
                candidate.votes += 1;
            }
            _ => return Err(Self::revert("not a transaction method")),
        }
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        let mut hash = [0u8; 32];
        hash[24..].copy_from_slice(&n.to_be_bytes());
        Ok(json!(encode_bytes(&hash)))
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerTransport for NullLedger {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let resolved = match method {
            "eth_call" | "eth_sendTransaction" => self.resolve(&params),
            _ => None,
        };
        self.requests.lock().unwrap().push(RecordedRequest {
            rpc_method: method.to_string(),
            contract_method: resolved.as_ref().map(|(m, _)| m.name()),
            params: params.clone(),
        });

        if self.is_failing(method, resolved.as_ref().map(|(m, _)| *m)) {
            return Err(RpcError::Http(format!("{method} unavailable")));
        }

        match (method, resolved) {
            ("net_listening", _) => Ok(json!(true)),
            ("eth_getCode", _) => Ok(json!("0x6080604052")),
            ("eth_call", Some((ElectionMethod::GetCandidates, _))) => {
                let encoded = encode_candidates(&self.candidates.lock().unwrap());
                let hold = self.held.lock().unwrap().pop_front();
                self.park(hold).await;
                Ok(json!(encode_bytes(&encoded)))
            }
            ("eth_call", Some((ElectionMethod::CandidateNumber, _))) => {
                let n = self.candidates.lock().unwrap().len();
                Ok(json!(encode_bytes(&encode_uint(U256::from(n)))))
            }
            ("eth_sendTransaction", Some((m, args))) => {
                let from = params
                    .get(0)
                    .and_then(|tx| tx.get("from"))
                    .and_then(|f| f.as_str())
                    .and_then(|f| Account::parse(f).ok())
                    .ok_or_else(|| RpcError::Rpc {
                        code: -32602,
                        message: "missing from".into(),
                    })?;
                let result = self.execute_send(m, &args, from);
                let hold = self.held_sends.lock().unwrap().pop_front();
                self.park(hold).await;
                result
            }
            (other, _) => Err(RpcError::Rpc {
                code: -32601,
                message: format!("method not supported: {other}"),
            }),
        }
    }
}
