//! Cached view of the contract's candidate list.
//!
//! The snapshot lives in a `watch` channel and is replaced as a whole on
//! every update. Refreshes are not mutually exclusive: if two overlap, the
//! one that *completes* last wins. Candidate data is display-only, so this
//! race is accepted rather than locked away.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use ballot_abi::{decode_candidates, decode_uint, ElectionMethod, U256};
use ballot_types::{Candidate, CandidateSnapshot};
use tokio::sync::watch;

use crate::contract::ContractHandle;
use crate::error::{ContractError, SessionError};

struct CacheInner {
    snapshot: watch::Sender<CandidateSnapshot>,
    in_flight: AtomicUsize,
    generation: AtomicU64,
    started: AtomicU64,
    loaded: AtomicBool,
    closed: AtomicBool,
}

/// Shared candidate snapshot with a loading flag. Cheap to clone.
#[derive(Clone)]
pub struct CandidateCache {
    inner: Arc<CacheInner>,
}

impl CandidateCache {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(CandidateSnapshot::default());
        Self {
            inner: Arc::new(CacheInner {
                snapshot,
                in_flight: AtomicUsize::new(0),
                generation: AtomicU64::new(0),
                started: AtomicU64::new(0),
                loaded: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> CandidateSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Receiver that observes every snapshot replacement.
    pub fn subscribe(&self) -> watch::Receiver<CandidateSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Number of candidates in the current snapshot.
    pub fn candidate_count(&self) -> usize {
        self.inner.snapshot.borrow().candidates.len()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.snapshot.borrow().is_loading
    }

    /// Whether at least one fetch has been applied.
    pub fn is_loaded(&self) -> bool {
        self.inner.loaded.load(Ordering::SeqCst)
    }

    /// Number of refreshes started so far.
    pub fn refresh_count(&self) -> u64 {
        self.inner.started.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Stop applying results. Fetches still in flight finish but their results
    /// are dropped; later refreshes return [`SessionError::Closed`].
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Fetch the candidate list and replace the snapshot.
    ///
    /// The loading flag is raised before this function returns, i.e. before
    /// the returned future is first polled, and lowered when the fetch
    /// finishes or the future is dropped. On failure the previous candidate
    /// list is kept.
    pub fn refresh(
        &self,
        handle: &ContractHandle,
    ) -> impl Future<Output = Result<CandidateSnapshot, SessionError>> + Send + 'static {
        let handle = handle.clone();
        let closed = self.is_closed();
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let pending = (!closed).then(|| PendingFetch::begin(self.inner.clone()));

        async move {
            let pending = match pending {
                Some(p) => p,
                None => return Err(SessionError::Closed),
            };

            let fetched = fetch(&handle).await;
            let current = pending.inner.generation.load(Ordering::SeqCst) == generation;
            let applied = match &fetched {
                Ok(list) if current => Some(list.clone()),
                _ => None,
            };
            let inner = pending.inner.clone();
            let published = pending.finish(applied);

            if !current {
                tracing::debug!("discarding candidate fetch for a closed session");
                return Err(SessionError::Closed);
            }
            match fetched {
                Ok(_) => {
                    inner.loaded.store(true, Ordering::SeqCst);
                    Ok(published)
                }
                Err(e) => {
                    tracing::error!(error = %e, "error fetching candidates");
                    Err(SessionError::FetchFailed(e.to_string()))
                }
            }
        }
    }
}

/// One fetch counted in `in_flight`. Dropping it unfinished lowers the
/// count and keeps the current candidates.
struct PendingFetch {
    inner: Arc<CacheInner>,
    finished: bool,
}

impl PendingFetch {
    fn begin(inner: Arc<CacheInner>) -> Self {
        inner.started.fetch_add(1, Ordering::SeqCst);
        inner.snapshot.send_modify(|s| {
            inner.in_flight.fetch_add(1, Ordering::SeqCst);
            *s = CandidateSnapshot {
                candidates: std::mem::take(&mut s.candidates),
                is_loading: true,
            };
        });
        Self {
            inner,
            finished: false,
        }
    }

    /// Publish `candidates` (or keep the current list) and end the fetch.
    fn finish(mut self, candidates: Option<Vec<Candidate>>) -> CandidateSnapshot {
        self.finished = true;
        self.release(candidates)
    }

    fn release(&self, candidates: Option<Vec<Candidate>>) -> CandidateSnapshot {
        let mut published = CandidateSnapshot::default();
        self.inner.snapshot.send_modify(|s| {
            let remaining = self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            *s = CandidateSnapshot {
                candidates: candidates.unwrap_or_else(|| std::mem::take(&mut s.candidates)),
                is_loading: remaining > 0,
            };
            published = s.clone();
        });
        published
    }
}

impl Drop for PendingFetch {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("candidate fetch dropped before completion");
            self.release(None);
        }
    }
}

impl Default for CandidateCache {
    fn default() -> Self {
        Self::new()
    }
}

async fn fetch(handle: &ContractHandle) -> Result<Vec<Candidate>, ContractError> {
    let (list, count) = tokio::join!(
        handle.call(ElectionMethod::GetCandidates.name(), &[]),
        handle.call(ElectionMethod::CandidateNumber.name(), &[]),
    );
    let candidates = decode_candidates(&list?)?;

    if candidates.is_empty() {
        tracing::info!("no candidates present");
    } else {
        tracing::debug!(count = candidates.len(), "fetched candidates");
    }

    // The count is only a cross-check on the list.
    match count.and_then(|raw| Ok(decode_uint(&raw)?)) {
        Ok(n) if n == U256::from(candidates.len()) => {
            tracing::debug!(total = %n, "total candidates")
        }
        Ok(n) => tracing::warn!(
            listed = candidates.len(),
            reported = %n,
            "candidate count does not match candidate list"
        ),
        Err(e) => tracing::warn!(error = %e, "could not read candidate count"),
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractSession;
    use ballot_abi::ContractAbi;
    use ballot_nullables::NullLedger;
    use ballot_types::DEFAULT_CONTRACT_ADDRESS;
    use std::time::Duration;

    fn setup(ledger: NullLedger) -> (Arc<NullLedger>, ContractHandle, CandidateCache) {
        let ledger = Arc::new(ledger);
        let handle =
            ContractSession::bind(ledger.clone(), DEFAULT_CONTRACT_ADDRESS, ContractAbi::election())
                .unwrap();
        (ledger, handle, CandidateCache::new())
    }

    #[tokio::test]
    async fn loading_flag_raised_before_first_poll() {
        let (_ledger, handle, cache) = setup(NullLedger::with_candidate_count(1));
        let fut = cache.refresh(&handle);
        assert!(cache.is_loading());
        let snapshot = fut.await.unwrap();
        assert!(!snapshot.is_loading);
        assert!(!cache.is_loading());
        assert_eq!(cache.candidate_count(), 1);
    }

    #[tokio::test]
    async fn failure_keeps_previous_list() {
        let (ledger, handle, cache) = setup(NullLedger::with_candidate_count(2));
        cache.refresh(&handle).await.unwrap();

        ledger.fail("getCandidates");
        let err = cache.refresh(&handle).await.unwrap_err();
        assert!(matches!(err, SessionError::FetchFailed(_)));
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.candidates.len(), 2);
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn count_failure_does_not_fail_refresh() {
        let (ledger, handle, cache) = setup(NullLedger::with_candidate_count(3));
        ledger.fail("candidateNumber");
        let snapshot = cache.refresh(&handle).await.unwrap();
        assert_eq!(snapshot.candidates.len(), 3);
    }

    #[tokio::test]
    async fn subscribers_see_replacements() {
        let (_ledger, handle, cache) = setup(NullLedger::with_candidate_count(1));
        let mut rx = cache.subscribe();
        cache.refresh(&handle).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().candidates.len(), 1);
    }

    #[tokio::test]
    async fn dropped_refresh_lowers_loading_flag() {
        let (ledger, handle, cache) = setup(NullLedger::with_candidate_count(2));
        let _release = ledger.hold_next_candidates();
        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), cache.refresh(&handle)).await;
        assert!(timed_out.is_err());
        assert!(!cache.is_loading());

        let snapshot = cache.refresh(&handle).await.unwrap();
        assert_eq!(snapshot.candidates.len(), 2);
        assert!(!snapshot.is_loading);
        assert!(!cache.is_loading());
    }

    #[tokio::test]
    async fn closed_cache_discards_in_flight_result() {
        let (ledger, handle, cache) = setup(NullLedger::with_candidate_count(2));
        let release = ledger.hold_next_candidates();
        let pending = tokio::spawn(cache.refresh(&handle));
        while ledger.waiting() == 0 {
            tokio::task::yield_now().await;
        }
        cache.close();
        release.send(()).unwrap();

        assert_eq!(pending.await.unwrap(), Err(SessionError::Closed));
        assert!(cache.snapshot().candidates.is_empty());
        assert!(!cache.is_loading());
        assert!(!cache.is_loaded());

        assert_eq!(cache.refresh(&handle).await, Err(SessionError::Closed));
        assert_eq!(ledger.count("getCandidates"), 1);
    }
}
