//! Cache Entry State
//!
//! Entries are stored type-erased; [`QueryResult`] and [`Subscription`]
//! recover the concrete type at the edge. A key is always fetched with the
//! same result type, so a failed downcast only happens on caller error and
//! reads as "no data".

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::api::ApiError;

pub(crate) type AnyData = Arc<dyn Any + Send + Sync>;

/// Lifecycle of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Nothing has been fetched successfully or unsuccessfully yet
    Pending,
    Success,
    Error,
}

#[derive(Clone)]
pub(crate) struct Snapshot {
    pub status: QueryStatus,
    pub data: Option<AnyData>,
    pub error: Option<ApiError>,
    pub fetched_at: Option<Instant>,
    pub is_fetching: bool,
    pub stale: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            status: QueryStatus::Pending,
            data: None,
            error: None,
            fetched_at: None,
            is_fetching: false,
            stale: false,
        }
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("status", &self.status)
            .field("has_data", &self.data.is_some())
            .field("error", &self.error)
            .field("is_fetching", &self.is_fetching)
            .field("stale", &self.stale)
            .finish()
    }
}

impl Snapshot {
    /// Servable without a refetch under the given stale time
    pub fn is_fresh(&self, stale_time: Duration) -> bool {
        self.data.is_some()
            && self.error.is_none()
            && !self.stale
            && self
                .fetched_at
                .map(|at| at.elapsed() < stale_time)
                .unwrap_or(false)
    }
}

fn downcast<T: Send + Sync + 'static>(data: Option<AnyData>) -> Option<Arc<T>> {
    data.and_then(|data| data.downcast::<T>().ok())
}

/// A typed view of one cache entry
pub struct QueryResult<T> {
    pub data: Option<Arc<T>>,
    pub status: QueryStatus,
    pub error: Option<ApiError>,
    pub is_fetching: bool,
    pub is_stale: bool,
}

impl<T: Send + Sync + 'static> QueryResult<T> {
    pub(crate) fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            data: downcast(snapshot.data.clone()),
            status: snapshot.status,
            error: snapshot.error.clone(),
            is_fetching: snapshot.is_fetching,
            is_stale: snapshot.stale,
        }
    }

    /// Result of a fetch whose outcome was not written to the entry
    pub(crate) fn detached(outcome: Result<AnyData, ApiError>, previous: Option<AnyData>) -> Self {
        match outcome {
            Ok(data) => Self {
                data: downcast(Some(data)),
                status: QueryStatus::Success,
                error: None,
                is_fetching: false,
                is_stale: true,
            },
            Err(error) => Self {
                data: downcast(previous),
                status: QueryStatus::Error,
                error: Some(error),
                is_fetching: false,
                is_stale: true,
            },
        }
    }
}

impl<T> QueryResult<T> {
    /// No data yet and a fetch is underway
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.is_fetching
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The data if any is available (possibly stale), otherwise the error
    pub fn into_result(self) -> Result<Arc<T>, ApiError> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(error)) => Err(error),
            (None, None) => Err(ApiError::Decode(
                "query finished without data".to_string(),
            )),
        }
    }
}

impl<T> Clone for QueryResult<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            status: self.status,
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            is_stale: self.is_stale,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for QueryResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("data", &self.data)
            .field("status", &self.status)
            .field("error", &self.error)
            .field("is_fetching", &self.is_fetching)
            .field("is_stale", &self.is_stale)
            .finish()
    }
}

/// Receives every state change of one cache key
pub struct Subscription<T> {
    rx: watch::Receiver<Snapshot>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub(crate) fn new(rx: watch::Receiver<Snapshot>) -> Self {
        Self {
            rx,
            _marker: PhantomData,
        }
    }

    pub fn current(&self) -> QueryResult<T> {
        QueryResult::from_snapshot(&self.rx.borrow())
    }

    /// Wait for the next change; `None` once the entry has been removed
    pub async fn changed(&mut self) -> Option<QueryResult<T>> {
        self.rx.changed().await.ok()?;
        Some(self.current())
    }

    /// Wait until no fetch is in progress for the key
    pub async fn wait_settled(&mut self) -> QueryResult<T> {
        loop {
            let current = self.current();
            if !current.is_fetching {
                return current;
            }
            if self.rx.changed().await.is_err() {
                return self.current();
            }
        }
    }
}
