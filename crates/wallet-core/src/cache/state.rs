// ── Observable query state ──
//
// Each cache entry publishes an untyped `Snapshot` on a watch channel.
// `QueryStream<T>` is the typed view a subscriber holds.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::CoreError;

pub(crate) type AnyValue = Arc<dyn Any + Send + Sync>;

/// What an entry currently holds, type-erased.
#[derive(Clone, Default)]
pub(crate) struct Snapshot {
    pub value: Option<AnyValue>,
    pub stale: bool,
    pub error: Option<CoreError>,
    pub fetching: bool,
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("has_value", &self.value.is_some())
            .field("stale", &self.stale)
            .field("error", &self.error)
            .field("fetching", &self.fetching)
            .finish()
    }
}

/// State of one cached query, as a view sees it.
#[derive(Debug, Clone)]
pub enum QueryState<T> {
    /// Nothing fetched yet, nothing in flight.
    Idle,
    /// First fetch in flight.
    Loading,
    /// Data available. `stale` is set between an invalidation and the
    /// refetch that replaces it.
    Ready { data: Arc<T>, stale: bool },
    /// The latest fetch failed; the last good value is kept.
    Failed {
        error: CoreError,
        previous: Option<Arc<T>>,
    },
}

impl<T: Send + Sync + 'static> QueryState<T> {
    pub(crate) fn from_snapshot(snapshot: &Snapshot) -> Self {
        let data = match snapshot.value.as_ref().map(|v| Arc::clone(v).downcast::<T>()) {
            Some(Ok(data)) => Some(data),
            Some(Err(_)) => {
                return Self::Failed {
                    error: CoreError::Internal("cached value has an unexpected type".into()),
                    previous: None,
                };
            }
            None => None,
        };

        if let Some(error) = &snapshot.error {
            return Self::Failed {
                error: error.clone(),
                previous: data,
            };
        }

        match data {
            Some(data) => Self::Ready {
                data,
                stale: snapshot.stale,
            },
            None if snapshot.fetching => Self::Loading,
            None => Self::Idle,
        }
    }

    pub fn data(&self) -> Option<&Arc<T>> {
        match self {
            Self::Ready { data, .. } => Some(data),
            Self::Failed { previous, .. } => previous.as_ref(),
            Self::Idle | Self::Loading => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Ready and not awaiting a refetch.
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Ready { stale: false, .. })
    }
}

/// A subscription to one cache entry.
///
/// Holding a `QueryStream` marks the entry as observed: invalidating it
/// schedules a background refetch instead of waiting for the next read.
pub struct QueryStream<T> {
    receiver: watch::Receiver<Snapshot>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> QueryStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot>) -> Self {
        Self {
            receiver,
            _marker: PhantomData,
        }
    }

    /// The latest state.
    pub fn current(&self) -> QueryState<T> {
        QueryState::from_snapshot(&self.receiver.borrow())
    }

    /// Wait for the next change, returning the new state.
    /// Returns `None` if the entry was dropped from the cache.
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.receiver.changed().await.ok()?;
        Some(QueryState::from_snapshot(&self.receiver.borrow_and_update()))
    }

    /// Wait until the entry holds fresh data or fails.
    pub async fn settled(&mut self) -> Option<QueryState<T>> {
        loop {
            let state = self.current();
            if state.is_fresh() || matches!(state, QueryState::Failed { .. }) {
                return Some(state);
            }
            self.receiver.changed().await.ok()?;
        }
    }
}
