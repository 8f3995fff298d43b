use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use fontreq_core::{FontProvider, FontRequest, FontStyle, LoadError, LoaderConfig, RequestKey, Typeface};

use crate::cache::{CacheStats, ResultCache};
use crate::classify;
use crate::dispatch::{CallbackDispatcher, ExecutionContext, Subscriber};
use crate::pending::{JoinOutcome, PendingRegistry};
use crate::pool::WorkerPool;

/// Outcome delivered to every caller of a load.
pub type LoadResult = Result<Typeface, LoadError>;

/// Waits at least this long are treated as unbounded and resolved inline.
pub const UNBOUNDED_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// How long a blocking load may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTimeout {
    /// Wait as long as the provider takes. Runs on the caller's thread.
    Infinite,
    /// Give up waiting after the duration; the work itself continues.
    /// Durations of [`UNBOUNDED_WAIT`] or more behave like `Infinite`.
    After(Duration),
}

impl FetchTimeout {
    /// The bounded limit, or `None` when the wait is effectively unbounded.
    pub fn limit(&self) -> Option<Duration> {
        match *self {
            FetchTimeout::After(limit) if limit < UNBOUNDED_WAIT => Some(limit),
            _ => None,
        }
    }
}

impl From<Option<Duration>> for FetchTimeout {
    fn from(timeout: Option<Duration>) -> Self {
        timeout.map_or(FetchTimeout::Infinite, FetchTimeout::After)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Block the calling thread until the typeface is available.
    Blocking(FetchTimeout),
    /// Return immediately; subscribers are notified on completion.
    NonBlocking,
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Ready(Typeface),
    /// The result will be delivered to the subscriber later.
    Pending,
}

impl LoadOutcome {
    pub fn typeface(&self) -> Option<&Typeface> {
        match self {
            LoadOutcome::Ready(typeface) => Some(typeface),
            LoadOutcome::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LoadOutcome::Pending)
    }
}

enum Lookup {
    Hit(Typeface, Option<Subscriber>),
    Miss(JoinOutcome),
}

/// Cache and in-flight bookkeeping, always mutated together.
struct Registry {
    cache: ResultCache,
    pending: PendingRegistry,
}

struct Inner {
    registry: Mutex<Registry>,
    provider: Arc<dyn FontProvider>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        // Every critical section leaves the registry consistent.
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn resolve_and_store(&self, request: &FontRequest, style: FontStyle, key: &RequestKey) -> LoadResult {
        let result = classify::resolve(self.provider.as_ref(), request, style);
        if let Ok(typeface) = &result {
            self.lock().cache.put(key.clone(), typeface.clone());
        }
        result
    }

    /// Finish an in-flight resolution: cache it, then notify every waiter.
    fn complete(&self, key: &RequestKey, result: LoadResult) {
        let subscribers = {
            let mut registry = self.lock();
            if let Ok(typeface) = &result {
                registry.cache.put(key.clone(), typeface.clone());
            }
            registry.pending.drain(key)
        };
        debug!(key = %key, subscribers = subscribers.len(), ok = result.is_ok(), "font resolution completed");
        CallbackDispatcher::dispatch_all(subscribers, &result);
    }
}

/// Deduplicating font loader.
///
/// Resolved typefaces are cached by [`RequestKey`]. Concurrent non-blocking
/// loads of the same key share a single provider call; blocking loads with
/// a bounded timeout run on the worker pool, and blocking loads without a
/// timeout run inline so they can never tie up a pool worker.
pub struct Loader {
    inner: Arc<Inner>,
    pool: WorkerPool,
    config: LoaderConfig,
}

impl Loader {
    pub fn new(provider: Arc<dyn FontProvider>, config: LoaderConfig) -> Self {
        let config = config.normalized();
        let pool = WorkerPool::new(config.thread_name.clone(), config.max_workers, config.keep_alive());
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry {
                    cache: ResultCache::new(config.cache_capacity),
                    pending: PendingRegistry::new(),
                }),
                provider,
            }),
            pool,
            config,
        }
    }

    pub fn with_defaults(provider: Arc<dyn FontProvider>) -> Self {
        Self::new(provider, LoaderConfig::default())
    }

    /// Load a typeface.
    ///
    /// Cache hits return `Ready` in every mode and also notify `subscriber`.
    /// Blocking modes return the resolved typeface or the failure; when a
    /// subscriber is given it receives the same outcome. Non-blocking loads
    /// return `Pending` and notify `subscriber` on its own context.
    pub fn load(
        &self,
        request: &FontRequest,
        style: FontStyle,
        subscriber: Option<Subscriber>,
        mode: Mode,
    ) -> Result<LoadOutcome, LoadError> {
        let key = RequestKey::new(request, style);
        match mode {
            Mode::Blocking(timeout) => {
                let result = self.load_blocking_inner(request, style, &key, timeout);
                if let Some(subscriber) = subscriber {
                    CallbackDispatcher::dispatch(subscriber, result.clone());
                }
                result.map(LoadOutcome::Ready)
            }
            Mode::NonBlocking => self.load_non_blocking(request, style, key, subscriber),
        }
    }

    /// Blocking load without notifications.
    pub fn load_blocking(&self, request: &FontRequest, style: FontStyle, timeout: FetchTimeout) -> LoadResult {
        let key = RequestKey::new(request, style);
        self.load_blocking_inner(request, style, &key, timeout)
    }

    /// Blocking load bounded by the configured default timeout.
    pub fn load_blocking_default(&self, request: &FontRequest, style: FontStyle) -> LoadResult {
        self.load_blocking(request, style, FetchTimeout::After(self.config.default_timeout()))
    }

    /// Non-blocking load notifying `subscriber` on its origin context.
    pub fn request_font(
        &self,
        request: &FontRequest,
        style: FontStyle,
        subscriber: Subscriber,
    ) -> Result<LoadOutcome, LoadError> {
        self.load(request, style, Some(subscriber), Mode::NonBlocking)
    }

    /// Non-blocking load whose result arrives as a message.
    ///
    /// The load starts immediately; the returned future only waits for it.
    pub fn fetch(&self, request: &FontRequest, style: FontStyle) -> impl Future<Output = LoadResult> + Send + 'static {
        let (subscriber, rx) = Subscriber::channel();
        // Failures are delivered through the channel as well.
        let _ = self.load(request, style, Some(subscriber), Mode::NonBlocking);
        async move { rx.await.unwrap_or(Err(LoadError::LoadFailed)) }
    }

    /// Resolve on a caller-supplied background context instead of the pool.
    ///
    /// No coalescing happens on this path. If `executor` refuses the work the
    /// error is returned and `subscriber` is not notified.
    pub fn load_on(
        &self,
        executor: &dyn ExecutionContext,
        request: &FontRequest,
        style: FontStyle,
        subscriber: Subscriber,
    ) -> Result<LoadOutcome, LoadError> {
        let key = RequestKey::new(request, style);
        if let Some(hit) = self.lookup(&key) {
            CallbackDispatcher::dispatch(subscriber, Ok(hit.clone()));
            return Ok(LoadOutcome::Ready(hit));
        }

        let inner = Arc::clone(&self.inner);
        let request = request.clone();
        executor
            .post(Box::new(move || {
                let result = inner.resolve_and_store(&request, style, &key);
                CallbackDispatcher::dispatch(subscriber, result);
            }))
            .map_err(|e| LoadError::Rejected(e.to_string()))?;
        Ok(LoadOutcome::Pending)
    }

    fn lookup(&self, key: &RequestKey) -> Option<Typeface> {
        let hit = self.inner.lock().cache.get(key);
        if hit.is_some() {
            debug!(key = %key, "typeface cache hit");
        }
        hit
    }

    fn load_blocking_inner(
        &self,
        request: &FontRequest,
        style: FontStyle,
        key: &RequestKey,
        timeout: FetchTimeout,
    ) -> LoadResult {
        if let Some(hit) = self.lookup(key) {
            return Ok(hit);
        }

        match timeout.limit() {
            None => {
                // An unbounded wait must not occupy a pool worker.
                debug!(key = %key, "resolving inline on caller thread");
                self.inner.resolve_and_store(request, style, key)
            }
            Some(limit) => {
                debug!(key = %key, timeout = ?limit, "resolving on pool and waiting");
                let inner = Arc::clone(&self.inner);
                let request = request.clone();
                let job_key = key.clone();
                self.pool
                    .post_and_wait(move || inner.resolve_and_store(&request, style, &job_key), limit)
                    .map_err(LoadError::from)
                    .and_then(|result| result)
            }
        }
    }

    fn load_non_blocking(
        &self,
        request: &FontRequest,
        style: FontStyle,
        key: RequestKey,
        subscriber: Option<Subscriber>,
    ) -> Result<LoadOutcome, LoadError> {
        // Cache check and join happen under one lock so a completion cannot
        // slip in between them.
        let lookup = {
            let mut registry = self.inner.lock();
            match registry.cache.get(&key) {
                Some(hit) => Lookup::Hit(hit, subscriber),
                None => Lookup::Miss(registry.pending.try_join(&key, subscriber)),
            }
        };

        match lookup {
            Lookup::Hit(hit, subscriber) => {
                debug!(key = %key, "typeface cache hit");
                if let Some(subscriber) = subscriber {
                    CallbackDispatcher::dispatch(subscriber, Ok(hit.clone()));
                }
                Ok(LoadOutcome::Ready(hit))
            }
            Lookup::Miss(JoinOutcome::Joined) => {
                debug!(key = %key, "joined in-flight font request");
                Ok(LoadOutcome::Pending)
            }
            Lookup::Miss(JoinOutcome::NotPending) => {
                debug!(key = %key, "submitting font request");
                let provider = Arc::clone(&self.inner.provider);
                let inner = Arc::clone(&self.inner);
                let request = request.clone();
                let reply_key = key.clone();
                let submitted = self.pool.post_and_reply(
                    move || classify::resolve(provider.as_ref(), &request, style),
                    move |result| inner.complete(&reply_key, result),
                );

                match submitted {
                    Ok(()) => Ok(LoadOutcome::Pending),
                    Err(e) => {
                        let err = LoadError::from(e);
                        self.inner.complete(&key, Err(err.clone()));
                        Err(err)
                    }
                }
            }
        }
    }

    /// Drop every cached typeface. In-flight resolutions are unaffected.
    pub fn reset_cache(&self) {
        self.inner.lock().cache.clear();
        debug!("typeface cache cleared");
    }

    /// Cached typeface for `key`, refreshing its recency.
    pub fn cached(&self, key: &RequestKey) -> Option<Typeface> {
        self.inner.lock().cache.get(key)
    }

    /// Whether `key` is cached, without touching recency.
    pub fn is_cached(&self, key: &RequestKey) -> bool {
        self.inner.lock().cache.contains(key)
    }

    /// Whether a non-blocking resolution for `key` is in flight.
    pub fn is_in_flight(&self, key: &RequestKey) -> bool {
        self.inner.lock().pending.is_pending(key)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().cache.stats()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }
}
