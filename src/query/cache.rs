//! Query Cache
//!
//! Keyed store of remote reads. Concurrent reads of one key share a single
//! fetch; results are served until they go stale or are invalidated by a
//! mutation; every state change is broadcast to the key's subscribers.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::entry::{AnyData, QueryResult, QueryStatus, Snapshot, Subscription};
use super::key::QueryKey;
use super::options::QueryOptions;
use crate::api::{ApiError, ApiResult};

type FetchFuture = Shared<BoxFuture<'static, Result<AnyData, ApiError>>>;

struct Entry {
    tx: watch::Sender<Snapshot>,
    /// Generation whose outcome is currently stored
    applied: u64,
    in_flight: Option<(u64, FetchFuture)>,
}

impl Entry {
    fn new() -> Self {
        let (tx, _) = watch::channel(Snapshot::default());
        Self {
            tx,
            applied: 0,
            in_flight: None,
        }
    }

    fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    fn update(&self, modify: impl FnOnce(&mut Snapshot)) {
        self.tx.send_modify(modify);
    }
}

struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    /// Fetch generations are unique across the whole cache, so a fetch
    /// started before its entry was removed never matches a later one
    generations: AtomicU64,
    defaults: QueryOptions,
}

enum Begin {
    Fresh(Snapshot),
    Fetch(u64, FetchFuture),
}

/// Shared, cheaply clonable query cache
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(QueryOptions::default())
    }
}

impl QueryCache {
    pub fn new(defaults: QueryOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
                defaults,
            }),
        }
    }

    /// Options used by reads that do not override them
    pub fn defaults(&self) -> QueryOptions {
        self.inner.defaults
    }

    /// Read `key`, fetching it unless a fresh result is cached.
    ///
    /// Joins the in-flight fetch for the key if there is one. A failed
    /// fetch keeps the previous data alongside the error. The fetch runs on
    /// its own task, so dropping this future does not stall other readers.
    pub async fn query<T, F, Fut>(&self, key: QueryKey, options: QueryOptions, fetcher: F) -> QueryResult<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let (generation, fetch) = match self.begin(&key, options, fetcher).await {
            Begin::Fresh(snapshot) => return QueryResult::from_snapshot(&snapshot),
            Begin::Fetch(generation, fetch) => (generation, fetch),
        };

        let outcome = fetch.await;

        let entries = self.inner.entries.lock().await;
        match entries.get(&key) {
            Some(entry) if entry.applied == generation => {
                QueryResult::from_snapshot(&entry.snapshot())
            }
            Some(entry) => QueryResult::detached(outcome, entry.snapshot().data),
            None => QueryResult::detached(outcome, None),
        }
    }

    /// Start (or join) a fetch for `key` in the background and return a
    /// subscription to its state immediately
    pub async fn watch<T, F, Fut>(&self, key: QueryKey, options: QueryOptions, fetcher: F) -> Subscription<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let subscription = self.subscribe(&key).await;
        self.begin(&key, options, fetcher).await;
        subscription
    }

    /// Observe `key` without triggering a fetch
    pub async fn subscribe<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Subscription<T> {
        let mut entries = self.inner.entries.lock().await;
        let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
        Subscription::new(entry.tx.subscribe())
    }

    /// Current state of `key`, if it has ever been requested
    pub async fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<QueryResult<T>> {
        let entries = self.inner.entries.lock().await;
        entries
            .get(key)
            .map(|entry| QueryResult::from_snapshot(&entry.snapshot()))
    }

    /// Mark every entry under `prefix` stale and detach its in-flight fetch.
    ///
    /// Returns the number of entries touched.
    pub async fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.inner.entries.lock().await;
        let mut touched = 0;

        for (_, entry) in entries.iter_mut().filter(|(key, _)| key.starts_with(prefix)) {
            entry.in_flight = None;
            entry.update(|snapshot| {
                snapshot.stale = true;
                snapshot.is_fetching = false;
            });
            touched += 1;
        }

        info!(prefix = %prefix, touched, "Invalidated queries");
        touched
    }

    /// Drop every entry under `prefix`; their subscriptions end
    pub async fn remove(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.inner.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    pub async fn clear(&self) {
        self.inner.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Run a write once. On success every affected prefix is invalidated;
    /// on failure the cache is left as it was.
    pub async fn mutate<R, Fut>(&self, affected: &[QueryKey], write: Fut) -> ApiResult<R>
    where
        Fut: Future<Output = ApiResult<R>>,
    {
        match write.await {
            Ok(value) => {
                for prefix in affected {
                    self.invalidate(prefix).await;
                }
                Ok(value)
            }
            Err(e) => {
                warn!(error = %e, "Mutation failed");
                Err(e)
            }
        }
    }

    async fn begin<T, F, Fut>(&self, key: &QueryKey, options: QueryOptions, fetcher: F) -> Begin
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let mut entries = self.inner.entries.lock().await;
        let entry = entries.entry(key.clone()).or_insert_with(Entry::new);

        if let Some((generation, fetch)) = &entry.in_flight {
            debug!(key = %key, generation, "Joining in-flight fetch");
            return Begin::Fetch(*generation, fetch.clone());
        }

        let snapshot = entry.snapshot();
        if snapshot.is_fresh(options.stale_time) {
            debug!(key = %key, "Cache hit");
            return Begin::Fresh(snapshot);
        }

        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(key = %key, generation, "Cache miss, fetching");

        let fetch = fetch_future(
            Arc::downgrade(&self.inner),
            key.clone(),
            generation,
            options,
            fetcher,
        );
        entry.in_flight = Some((generation, fetch.clone()));
        entry.update(|snapshot| snapshot.is_fetching = true);
        tokio::spawn(fetch.clone());

        Begin::Fetch(generation, fetch)
    }
}

fn fetch_future<T, F, Fut>(
    cache: Weak<Inner>,
    key: QueryKey,
    generation: u64,
    options: QueryOptions,
    fetcher: F,
) -> FetchFuture
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
{
    async move {
        let result = fetch_with_retry(&key, options, fetcher).await;
        if let Some(inner) = cache.upgrade() {
            apply(&inner, &key, generation, &result).await;
        }
        result
    }
    .boxed()
    .shared()
}

async fn fetch_with_retry<T, F, Fut>(key: &QueryKey, options: QueryOptions, fetcher: F) -> Result<AnyData, ApiError>
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let mut attempt = 0;
    loop {
        match fetcher().await {
            Ok(value) => return Ok(Arc::new(value) as AnyData),
            Err(e) if attempt < options.retry && e.is_retryable() => {
                attempt += 1;
                warn!(key = %key, attempt, error = %e, "Fetch failed, retrying");
                tokio::time::sleep(options.retry_delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Store a fetch outcome unless a newer fetch superseded it or the key was
/// invalidated while it ran
async fn apply(inner: &Inner, key: &QueryKey, generation: u64, result: &Result<AnyData, ApiError>) {
    let mut entries = inner.entries.lock().await;
    let Some(entry) = entries.get_mut(key) else {
        return;
    };

    if entry.in_flight.as_ref().map(|(g, _)| *g) != Some(generation) {
        debug!(key = %key, generation, "Discarding superseded result");
        return;
    }

    entry.in_flight = None;
    entry.applied = generation;

    match result {
        Ok(data) => entry.update(|snapshot| {
            snapshot.status = QueryStatus::Success;
            snapshot.data = Some(data.clone());
            snapshot.error = None;
            snapshot.fetched_at = Some(Instant::now());
            snapshot.stale = false;
            snapshot.is_fetching = false;
        }),
        Err(e) => {
            warn!(key = %key, error = %e, "Fetch failed");
            entry.update(|snapshot| {
                snapshot.status = QueryStatus::Error;
                snapshot.error = Some(e.clone());
                snapshot.is_fetching = false;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn counting<T: Clone + Send + Sync + 'static>(
        calls: &Arc<AtomicUsize>,
        value: T,
    ) -> impl Fn() -> BoxFuture<'static, ApiResult<T>> + Send + Sync + 'static {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let value = value.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    fn quick() -> QueryOptions {
        QueryOptions::default().with_retry_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_concurrent_queries_share_one_fetch() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("logs").segment(1);

        let (a, b, c) = tokio::join!(
            cache.query(key.clone(), quick(), counting(&calls, 7u32)),
            cache.query(key.clone(), quick(), counting(&calls, 7u32)),
            cache.query(key.clone(), quick(), counting(&calls, 7u32)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in [a, b, c] {
            assert_eq!(result.data.as_deref(), Some(&7));
            assert_eq!(result.status, QueryStatus::Success);
        }
    }

    #[tokio::test]
    async fn test_fresh_entry_served_from_cache() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("applications");

        cache.query(key.clone(), quick(), counting(&calls, "a")).await;
        let second = cache.query(key.clone(), quick(), counting(&calls, "a")).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.data.as_deref(), Some(&"a"));
        assert!(!second.is_fetching);
    }

    #[tokio::test]
    async fn test_always_stale_refetches() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("tasks");

        cache.query(key.clone(), quick().always_stale(), counting(&calls, 1)).await;
        cache.query(key.clone(), quick().always_stale(), counting(&calls, 1)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_entry_goes_stale_after_stale_time() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("system-stats");
        let options = quick().with_stale_time(Duration::from_millis(30));

        cache.query(key.clone(), options, counting(&calls, 1)).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.query(key.clone(), options, counting(&calls, 1)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_prefix_forces_refetch() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let page1 = QueryKey::new("logs").segment(1);
        let page2 = QueryKey::new("logs").segment(2);
        let tasks = QueryKey::new("tasks");

        for key in [&page1, &page2, &tasks] {
            cache.query(key.clone(), quick(), counting(&calls, 0)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        assert_eq!(cache.invalidate(&QueryKey::new("logs")).await, 2);
        let stale = cache.peek::<i32>(&page1).await.unwrap();
        assert!(stale.is_stale);
        assert!(stale.data.is_some());

        cache.query(page1.clone(), quick(), counting(&calls, 0)).await;
        cache.query(tasks.clone(), quick(), counting(&calls, 0)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_network_errors_are_retried() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = cache
            .query(QueryKey::new("health"), quick().with_retry(3), move || {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(ApiError::Network("connection reset".to_string()))
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.data.as_deref(), Some(&"ok"));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: QueryResult<String> = cache
            .query(QueryKey::new("applications").segment("missing"), quick().with_retry(3), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ApiError::Http {
                        status: 404,
                        message: "not found".to_string(),
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.status, QueryStatus::Error);
        assert_eq!(result.error.and_then(|e| e.status()), Some(404));
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_data() {
        let cache = QueryCache::default();
        let key = QueryKey::new("logs");
        let options = quick().always_stale().with_retry(0);

        cache.query(key.clone(), options, || async { Ok(41) }).await;
        let result = cache
            .query(key.clone(), options, || async {
                Err::<i32, _>(ApiError::Network("offline".to_string()))
            })
            .await;

        assert_eq!(result.data.as_deref(), Some(&41));
        assert!(result.is_error());
        assert_eq!(result.status, QueryStatus::Error);
    }

    #[tokio::test]
    async fn test_superseded_fetch_is_discarded() {
        let cache = QueryCache::default();
        let key = QueryKey::new("reviews");
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let slow = {
            let cache = cache.clone();
            let key = key.clone();
            let started = started.clone();
            let release = release.clone();
            tokio::spawn(async move {
                cache
                    .query(key, quick(), move || {
                        let started = started.clone();
                        let release = release.clone();
                        async move {
                            started.notify_one();
                            release.notified().await;
                            Ok("old".to_string())
                        }
                    })
                    .await
            })
        };

        started.notified().await;
        cache.invalidate(&key).await;

        let fresh = cache
            .query(key.clone(), quick(), || async { Ok("new".to_string()) })
            .await;
        assert_eq!(fresh.data.as_deref().map(String::as_str), Some("new"));

        release.notify_one();
        let old = slow.await.unwrap();
        assert_eq!(old.data.as_deref().map(String::as_str), Some("old"));

        let stored = cache.peek::<String>(&key).await.unwrap();
        assert_eq!(stored.data.as_deref().map(String::as_str), Some("new"));
    }

    /// A read gated on `release`, announcing on `started` once it runs
    fn gated(
        started: &Arc<Notify>,
        release: &Arc<Notify>,
        value: &'static str,
    ) -> impl Fn() -> BoxFuture<'static, ApiResult<String>> + Send + Sync + 'static {
        let started = started.clone();
        let release = release.clone();
        move || {
            let started = started.clone();
            let release = release.clone();
            async move {
                started.notify_one();
                release.notified().await;
                Ok(value.to_string())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_fetch_from_before_remove_cannot_overwrite_newer_entry() {
        let cache = QueryCache::default();
        let key = QueryKey::new("logs").segment(1);
        let (old_started, old_release) = (Arc::new(Notify::new()), Arc::new(Notify::new()));
        let (new_started, new_release) = (Arc::new(Notify::new()), Arc::new(Notify::new()));

        let old = tokio::spawn({
            let cache = cache.clone();
            let key = key.clone();
            let fetcher = gated(&old_started, &old_release, "old");
            async move { cache.query(key, quick(), fetcher).await }
        });
        old_started.notified().await;

        assert_eq!(cache.remove(&QueryKey::new("logs")).await, 1);

        let new = tokio::spawn({
            let cache = cache.clone();
            let key = key.clone();
            let fetcher = gated(&new_started, &new_release, "new");
            async move { cache.query(key, quick(), fetcher).await }
        });
        new_started.notified().await;

        // the older fetch lands first
        old_release.notify_one();
        old.await.unwrap();
        let pending = cache.peek::<String>(&key).await.unwrap();
        assert!(pending.data.is_none());
        assert!(pending.is_fetching);

        new_release.notify_one();
        let fresh = new.await.unwrap();
        assert_eq!(fresh.data.as_deref().map(String::as_str), Some("new"));

        let stored = cache.peek::<String>(&key).await.unwrap();
        assert_eq!(stored.data.as_deref().map(String::as_str), Some("new"));
        assert!(!stored.is_fetching);
    }

    #[tokio::test]
    async fn test_dropped_reader_does_not_stall_subscribers() {
        let cache = QueryCache::default();
        let key = QueryKey::new("applications");
        let mut observer = cache.subscribe::<u32>(&key).await;

        let abandoned = tokio::time::timeout(
            Duration::from_millis(5),
            cache.query(key.clone(), quick(), || async {
                tokio::time::sleep(Duration::from_millis(40)).await;
                Ok(5u32)
            }),
        )
        .await;
        assert!(abandoned.is_err());

        let settled = tokio::time::timeout(Duration::from_secs(2), observer.wait_settled())
            .await
            .unwrap();
        assert_eq!(settled.data.as_deref(), Some(&5));
        assert_eq!(settled.status, QueryStatus::Success);
    }

    #[tokio::test]
    async fn test_successful_mutation_invalidates_affected_keys() {
        let cache = QueryCache::default();
        let key = QueryKey::new("applications");
        cache.query(key.clone(), quick(), || async { Ok(1) }).await;

        let value = cache
            .mutate(&[QueryKey::new("applications")], async { Ok("created") })
            .await
            .unwrap();

        assert_eq!(value, "created");
        assert!(cache.peek::<i32>(&key).await.unwrap().is_stale);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_cache_untouched() {
        let cache = QueryCache::default();
        let key = QueryKey::new("applications");
        cache.query(key.clone(), quick(), || async { Ok(1) }).await;

        let result: ApiResult<()> = cache
            .mutate(&[key.clone()], async {
                Err(ApiError::Http {
                    status: 500,
                    message: "boom".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert!(!cache.peek::<i32>(&key).await.unwrap().is_stale);
    }

    #[tokio::test]
    async fn test_watch_notifies_subscribers() {
        let cache = QueryCache::default();
        let key = QueryKey::new("system-stats");
        let mut observer = cache.subscribe::<u64>(&key).await;

        let mut subscription = cache
            .watch(key.clone(), quick(), || async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(12u64)
            })
            .await;
        assert!(subscription.current().is_loading());

        let settled = subscription.wait_settled().await;
        assert_eq!(settled.data.as_deref(), Some(&12));

        let seen = observer.wait_settled().await;
        assert_eq!(seen.data.as_deref(), Some(&12));
    }

    #[tokio::test]
    async fn test_remove_ends_subscriptions() {
        let cache = QueryCache::default();
        let key = QueryKey::new("tasks").segment(1);
        let mut subscription = cache.subscribe::<u8>(&key).await;

        assert_eq!(cache.remove(&QueryKey::new("tasks")).await, 1);
        assert!(subscription.changed().await.is_none());
        assert!(cache.is_empty().await);
    }
}
