// ── Server-state cache ──
//
// Key-addressed store of remote resources. Reads are memoized and
// deduplicated: concurrent queries for one key share a single fetch.
// Mutations invalidate related key prefixes; observed entries are
// refetched in the background, unobserved ones on their next read.
//
// Every fetch runs in its own task tagged with a generation number.
// Issuing a new fetch for a key cancels the previous one, and a result
// is only written if its generation is still the current one, so the
// last-issued fetch always wins.
//
// The number of entries is capped. Past the cap, idle entries (nobody
// observing, waiting or fetching) are evicted, empty ones first, then
// least recently used.

mod key;
mod retry;
mod scope;
mod state;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::CoreError;

pub use key::QueryKey;
pub use retry::RetryPolicy;
pub use scope::ViewScope;
pub use state::{QueryState, QueryStream};

use state::{AnyValue, Snapshot};

type FetchResult = Result<AnyValue, CoreError>;
type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, FetchResult> + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Default upper bound on cached entries.
pub const DEFAULT_CAPACITY: usize = 256;

/// The cache. Shared behind an `Arc` by the application root.
pub struct QueryCache {
    entries: DashMap<QueryKey, Arc<Entry>>,
    retry: RetryPolicy,
    capacity: usize,
    /// Monotonic use counter for eviction order.
    clock: AtomicU64,
}

impl QueryCache {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            retry,
            capacity: DEFAULT_CAPACITY,
            clock: AtomicU64::new(0),
        }
    }

    /// Cap the number of entries. Clamped to at least one.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Read `key`, fetching it if absent or stale.
    ///
    /// Joins a fetch already in flight for the same key instead of
    /// starting another. Transient failures are retried per the cache's
    /// [`RetryPolicy`]. Dropping the returned future releases this
    /// caller's interest; the fetch is cancelled once nobody waits on it.
    pub async fn query<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<T, CoreError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let entry = self.entry(key);
        let fetcher = erase(fetcher);
        let _interest = Interest::register(Arc::clone(&entry));
        self.evict_idle();

        loop {
            let (generation, fetch) = {
                let mut inner = entry.lock();
                inner.fetcher = Some(Arc::clone(&fetcher));

                if !inner.stale {
                    if let Some(value) = &inner.value {
                        trace!(%key, "cache hit");
                        return downcast(key, value);
                    }
                }

                if let Some(inflight) = &inner.inflight {
                    trace!(%key, generation = inflight.generation, "joining in-flight fetch");
                    (inflight.generation, inflight.shared.clone())
                } else {
                    let issued = entry.issue(&mut inner, Arc::clone(&fetcher), self.retry, false)?;
                    entry.publish(&inner);
                    issued
                }
            };

            match fetch.await {
                Ok(value) => return downcast(key, &value),
                Err(CoreError::Cancelled) => {
                    // Superseded by a newer fetch: follow it.
                    if entry.lock().issued != generation {
                        continue;
                    }
                    return Err(CoreError::Cancelled);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Peek at the cached value without fetching.
    pub fn get<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let entry = self.entries.get(key)?;
        let inner = entry.lock();
        inner
            .value
            .as_ref()
            .and_then(|v| Arc::clone(v).downcast::<T>().ok())
    }

    /// Current state of `key`.
    pub fn state<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        self.entries.get(key).map_or(QueryState::Idle, |entry| {
            QueryState::from_snapshot(&entry.tx.borrow())
        })
    }

    /// Observe `key`. The entry is created if it does not exist yet.
    pub fn subscribe<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryStream<T> {
        QueryStream::new(self.entry(key).tx.subscribe())
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Run a mutation, then invalidate `invalidates` on success.
    ///
    /// Mutations are never retried.
    pub async fn mutate<T, Fut>(&self, mutation: Fut, invalidates: &[QueryKey]) -> Result<T, CoreError>
    where
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let value = mutation.await?;
        for prefix in invalidates {
            self.invalidate(prefix);
        }
        Ok(value)
    }

    /// Mark every entry under `prefix` stale.
    ///
    /// Fire-and-forget: observed entries, and entries someone is waiting
    /// on, get a fresh fetch scheduled; the rest refetch on next read.
    pub fn invalidate(&self, prefix: &QueryKey) {
        let matched: Vec<Arc<Entry>> = self
            .entries
            .iter()
            .filter(|item| item.key().starts_with(prefix))
            .map(|item| Arc::clone(item.value()))
            .collect();

        debug!(%prefix, entries = matched.len(), "invalidating");

        for entry in matched {
            let mut inner = entry.lock();
            inner.stale = true;

            let observed = entry.observed();
            if observed || inner.inflight.is_some() {
                if let Some(fetcher) = inner.fetcher.clone() {
                    match entry.issue(&mut inner, fetcher, self.retry, observed) {
                        Ok(_) => trace!(key = %entry.key, "refetch scheduled"),
                        Err(e) => warn!(key = %entry.key, error = %e, "could not schedule refetch"),
                    }
                }
            }
            entry.publish(&inner);
        }
    }

    /// Seed or overwrite `key` with `value`, superseding any fetch.
    pub fn set_data<T: Send + Sync + 'static>(&self, key: &QueryKey, value: T) {
        let entry = self.entry(key);
        let mut inner = entry.lock();
        if let Some(inflight) = inner.inflight.take() {
            inflight.cancel.cancel();
        }
        inner.issued += 1;
        inner.value = Some(Arc::new(value));
        inner.stale = false;
        inner.error = None;
        entry.publish(&inner);
        drop(inner);
        self.evict_idle();
    }

    /// Drop every cached value and cancel every fetch.
    ///
    /// Entries with live subscribers stay (empty) so their streams keep
    /// working; the rest are removed.
    pub fn clear(&self) {
        for item in &self.entries {
            let entry = item.value();
            let mut inner = entry.lock();
            if let Some(inflight) = inner.inflight.take() {
                inflight.cancel.cancel();
            }
            inner.value = None;
            inner.error = None;
            inner.stale = false;
            inner.fetcher = None;
            entry.publish(&inner);
        }
        self.entries.retain(|_, entry| entry.observed());
        debug!("query cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, key: &QueryKey) -> Arc<Entry> {
        let entry = Arc::clone(
            self.entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Entry::new(key.clone())))
                .value(),
        );
        entry
            .last_used
            .store(self.clock.fetch_add(1, Ordering::Relaxed) + 1, Ordering::Relaxed);
        entry
    }

    /// Trim idle entries until the cache is back under its capacity.
    fn evict_idle(&self) {
        let excess = self.entries.len().saturating_sub(self.capacity);
        if excess == 0 {
            return;
        }

        let mut idle: Vec<(bool, u64, QueryKey)> = self
            .entries
            .iter()
            .filter(|item| item.value().idle())
            .map(|item| {
                let entry = item.value();
                let has_value = entry.lock().value.is_some();
                (has_value, entry.last_used.load(Ordering::Relaxed), item.key().clone())
            })
            .collect();
        idle.sort_unstable_by_key(|&(has_value, last_used, _)| (has_value, last_used));

        let mut evicted = 0;
        for (_, _, key) in idle.into_iter().take(excess) {
            // Re-checked under the shard lock: it may have been picked up since.
            if self.entries.remove_if(&key, |_, entry| entry.idle()).is_some() {
                trace!(%key, "evicted idle entry");
                evicted += 1;
            }
        }
        debug!(evicted, entries = self.entries.len(), "cache over capacity");
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

// ── Entry ───────────────────────────────────────────────────────────

struct Entry {
    key: QueryKey,
    inner: Mutex<EntryInner>,
    tx: watch::Sender<Snapshot>,
    last_used: AtomicU64,
}

#[derive(Default)]
struct EntryInner {
    value: Option<AnyValue>,
    stale: bool,
    error: Option<CoreError>,
    /// Generation of the most recently issued fetch or write.
    issued: u64,
    inflight: Option<InFlight>,
    /// Callers currently awaiting this entry.
    waiters: usize,
    /// Last fetcher registered by a reader, reused for refetches.
    fetcher: Option<Fetcher>,
}

struct InFlight {
    generation: u64,
    shared: SharedFetch,
    cancel: CancellationToken,
    /// Owned by the cache; not cancelled when waiters leave.
    background: bool,
}

impl Entry {
    fn new(key: QueryKey) -> Self {
        let (tx, _) = watch::channel(Snapshot::default());
        Self {
            key,
            inner: Mutex::new(EntryInner::default()),
            tx,
            last_used: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EntryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observed(&self) -> bool {
        self.tx.receiver_count() > 0
    }

    /// Nobody observes, awaits or fetches this entry.
    fn idle(&self) -> bool {
        if self.observed() {
            return false;
        }
        let inner = self.lock();
        inner.waiters == 0 && inner.inflight.is_none()
    }

    fn publish(&self, inner: &EntryInner) {
        self.tx.send_replace(Snapshot {
            value: inner.value.clone(),
            stale: inner.stale,
            error: inner.error.clone(),
            fetching: inner.inflight.is_some(),
        });
    }

    /// Start a new fetch, superseding the one in flight.
    fn issue(
        self: &Arc<Self>,
        inner: &mut EntryInner,
        fetcher: Fetcher,
        retry: RetryPolicy,
        background: bool,
    ) -> Result<(u64, SharedFetch), CoreError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CoreError::Internal(format!("no async runtime: {e}")))?;

        if let Some(previous) = inner.inflight.take() {
            trace!(key = %self.key, generation = previous.generation, "superseding fetch");
            previous.cancel.cancel();
        }

        inner.issued += 1;
        let generation = inner.issued;
        let cancel = CancellationToken::new();

        let entry = Arc::clone(self);
        let token = cancel.clone();
        let task = runtime.spawn(async move {
            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => Err(CoreError::Cancelled),
                result = fetch_with_retry(&fetcher, retry, &entry.key) => result,
            };
            entry.commit(generation, &outcome);
            outcome
        });

        let shared = async move {
            task.await
                .unwrap_or_else(|e| Err(CoreError::Internal(format!("fetch task failed: {e}"))))
        }
        .boxed()
        .shared();

        inner.error = None;
        inner.inflight = Some(InFlight {
            generation,
            shared: shared.clone(),
            cancel,
            background,
        });
        Ok((generation, shared))
    }

    /// Store a finished fetch, unless a newer one replaced it.
    fn commit(&self, generation: u64, outcome: &FetchResult) {
        let mut inner = self.lock();
        let current = inner
            .inflight
            .as_ref()
            .is_some_and(|f| f.generation == generation);
        if !current {
            trace!(key = %self.key, generation, "discarding superseded result");
            return;
        }

        inner.inflight = None;
        match outcome {
            Ok(value) => {
                inner.value = Some(Arc::clone(value));
                inner.stale = false;
                inner.error = None;
            }
            Err(e) => {
                debug!(key = %self.key, error = %e, "fetch failed");
                inner.error = Some(e.clone());
            }
        }
        self.publish(&inner);
    }
}

/// One caller's interest in an entry, released on drop.
struct Interest {
    entry: Arc<Entry>,
}

impl Interest {
    fn register(entry: Arc<Entry>) -> Self {
        entry.lock().waiters += 1;
        Self { entry }
    }
}

impl Drop for Interest {
    fn drop(&mut self) {
        let mut inner = self.entry.lock();
        inner.waiters = inner.waiters.saturating_sub(1);
        if inner.waiters > 0 {
            return;
        }
        let abandoned = inner.inflight.as_ref().is_some_and(|f| !f.background);
        if abandoned {
            if let Some(inflight) = inner.inflight.take() {
                debug!(key = %self.entry.key, "no view waiting, cancelling fetch");
                inflight.cancel.cancel();
            }
            self.entry.publish(&inner);
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn erase<T, F, Fut>(fetcher: F) -> Fetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
{
    Arc::new(move || {
        let fut = fetcher();
        async move {
            let value: AnyValue = Arc::new(fut.await?);
            Ok(value)
        }
        .boxed()
    })
}

fn downcast<T: Clone + 'static>(key: &QueryKey, value: &AnyValue) -> Result<T, CoreError> {
    (**value)
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| CoreError::Internal(format!("cached value for {key} has an unexpected type")))
}

async fn fetch_with_retry(fetcher: &Fetcher, retry: RetryPolicy, key: &QueryKey) -> FetchResult {
    let mut attempt = 0;
    loop {
        match fetcher().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < retry.retries => {
                let delay = retry.delay_for(attempt);
                debug!(%key, attempt = attempt + 1, ?delay, error = %e, "retrying query");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
