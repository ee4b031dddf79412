use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::error::CacheError;

/// How often the sweeper runs unless configured otherwise
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15);

/// Upper bound on deletions performed by a single sweep
pub const DEFAULT_SWEEP_BATCH_LIMIT: usize = 1024;

/// Represents a value with an optional expiration time
///
/// An entry without `expires_at` never expires.
#[derive(Debug, Clone)]
pub struct Expiring<T> {
    pub expires_at: Option<Instant>,
    pub value: T,
}

impl<T> Expiring<T> {
    /// Creates a new expiring value
    pub fn new(value: T, expires_at: Option<Instant>) -> Self {
        Self { expires_at, value }
    }

    /// Creates a value that never expires
    pub fn permanent(value: T) -> Self {
        Self::new(value, None)
    }

    /// Creates a new expiring value that expires after the given duration
    ///
    /// A zero duration, or one too large for the clock to represent, yields a
    /// value that never expires.
    pub fn with_duration(value: T, ttl: Duration) -> Self {
        if ttl.is_zero() {
            return Self::permanent(value);
        }
        Self::new(value, Instant::now().checked_add(ttl))
    }

    /// Checks if this item had expired at `now`
    pub fn is_expired_at(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now > at)
    }

    /// Checks if this item has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

/// The operations every cache backend offers
///
/// `LocalCache` is the in-process implementation. Callers that only need
/// these three operations can hold a `dyn Cache<V>` and stay agnostic of the
/// backend.
pub trait Cache<V>: Send + Sync {
    /// Stores `value` under `key`; a zero `ttl` means the entry never expires
    fn set(&self, key: String, value: V, ttl: Duration);

    /// Returns the live value under `key`
    fn get(&self, key: &str) -> Result<V, CacheError>;

    /// Removes `key` if present
    fn delete(&self, key: &str);
}

/// Configuration for the cache's background sweeper
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Interval between sweeps (default: 15 seconds, zero falls back to it)
    pub sweep_interval: Duration,
    /// Maximum deletions per sweep (default: 1024, zero is treated as one)
    pub sweep_batch_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            sweep_batch_limit: DEFAULT_SWEEP_BATCH_LIMIT,
        }
    }
}

impl CacheConfig {
    /// Sets the sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the per-sweep deletion cap
    pub fn with_sweep_batch_limit(mut self, limit: usize) -> Self {
        self.sweep_batch_limit = limit;
        self
    }

    fn effective_interval(&self) -> Duration {
        if self.sweep_interval.is_zero() {
            DEFAULT_SWEEP_INTERVAL
        } else {
            self.sweep_interval
        }
    }
}

/// Builder for [`LocalCache`]
pub struct LocalCacheBuilder<V> {
    config: CacheConfig,
    runtime: Option<Handle>,
    _value: PhantomData<fn() -> V>,
}

impl<V> Default for LocalCacheBuilder<V> {
    fn default() -> Self {
        Self::from_config(CacheConfig::default())
    }
}

impl<V> Clone for LocalCacheBuilder<V> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            runtime: self.runtime.clone(),
            _value: PhantomData,
        }
    }
}

impl<V> std::fmt::Debug for LocalCacheBuilder<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCacheBuilder")
            .field("config", &self.config)
            .field("runtime", &self.runtime)
            .finish()
    }
}

impl<V> LocalCacheBuilder<V> {
    /// Creates a builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder starting from `config`
    pub fn from_config(config: CacheConfig) -> Self {
        Self {
            config,
            runtime: None,
            _value: PhantomData,
        }
    }

    /// Sets how often the background sweeper runs
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Caps how many expired entries a single sweep removes
    pub fn sweep_batch_limit(mut self, limit: usize) -> Self {
        self.config.sweep_batch_limit = limit;
        self
    }

    /// Runs the sweeper on `handle` instead of the current runtime
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Builds the cache and spawns its sweeper
    ///
    /// Fails with [`CacheError::NoRuntime`] when no handle was supplied and
    /// the caller is not running inside a tokio runtime.
    pub fn build(self) -> Result<LocalCache<V>, CacheError>
    where
        V: Clone + Send + Sync + 'static,
    {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| CacheError::NoRuntime)?,
        };

        let sweep_interval = self.config.effective_interval();
        let shared = Arc::new(Shared {
            entries: RwLock::new(HashMap::new()),
            sweep_batch_limit: self.config.sweep_batch_limit.max(1),
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = runtime.spawn(sweep_loop(Arc::clone(&shared), sweep_interval, shutdown_rx));

        Ok(LocalCache {
            shared,
            shutdown_tx,
            sweeper: Mutex::new(Some(sweeper)),
            sweep_interval,
        })
    }
}

/// State shared between the cache handle and its sweeper
struct Shared<V> {
    entries: RwLock<HashMap<String, Expiring<V>>>,
    sweep_batch_limit: usize,
}

impl<V> Shared<V> {
    /// Removes up to `sweep_batch_limit` entries expired at `now`
    ///
    /// The scan runs under the read lock. The write lock is held only to
    /// re-check and remove the collected keys, at most `sweep_batch_limit`.
    fn sweep(&self, now: Instant) -> usize {
        let candidates = self.expired_keys(now);
        if candidates.is_empty() {
            return 0;
        }
        self.remove_expired(&candidates, now)
    }

    fn expired_keys(&self, now: Instant) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .take(self.sweep_batch_limit)
            .collect()
    }

    /// Removes those of `keys` still expired at `now`; refreshed entries are kept
    fn remove_expired(&self, keys: &[String], now: Instant) -> usize {
        let mut entries = self.entries.write();
        let mut removed = 0;
        for key in keys {
            if entries.get(key).is_some_and(|entry| entry.is_expired_at(now)) {
                entries.remove(key);
                removed += 1;
            }
        }
        removed
    }

    /// Removes `key` only if it is still expired at `now`
    ///
    /// A concurrent `set` may have refreshed the entry after the caller saw
    /// it expired; the refreshed entry has a later deadline and is kept.
    fn remove_if_expired(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired_at(now)) {
            entries.remove(key);
            return true;
        }
        false
    }
}

async fn sweep_loop<V>(
    shared: Arc<Shared<V>>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    // An interval the clock cannot represent never ticks.
    let Some(start) = Instant::now().checked_add(period) else {
        let _ = shutdown_rx.wait_for(|closed| *closed).await;
        return;
    };
    let mut ticker = time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval = ?period, "cache sweeper started");

    loop {
        if *shutdown_rx.borrow_and_update() {
            break;
        }

        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let removed = shared.sweep(Instant::now());
                if removed > 0 {
                    debug!(removed, "swept expired entries");
                }
            }
        }
    }

    info!("cache sweeper stopped");
}

/// A thread-safe key/value cache with per-entry expiration
///
/// Expired entries are removed lazily by [`LocalCache::get`] and eagerly by a
/// background task that wakes every sweep interval. The sweeper is stopped by
/// [`LocalCache::close`], [`LocalCache::shutdown`] or dropping the cache; the
/// map itself stays usable after that, only the background sweep stops.
pub struct LocalCache<V> {
    shared: Arc<Shared<V>>,
    shutdown_tx: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    sweep_interval: Duration,
}

impl<V> LocalCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Returns a builder for configuring a new cache
    pub fn builder() -> LocalCacheBuilder<V> {
        LocalCacheBuilder::new()
    }

    /// Creates a cache with default configuration on the current runtime
    pub fn new() -> Result<Self, CacheError> {
        LocalCacheBuilder::new().build()
    }

    /// Creates a cache from `config` on the current runtime
    pub fn with_config(config: CacheConfig) -> Result<Self, CacheError> {
        LocalCacheBuilder::from_config(config).build()
    }

    /// Stores `value` under `key`, replacing any previous entry and its expiry
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = Expiring::with_duration(value, ttl);
        self.shared.entries.write().insert(key.into(), entry);
    }

    /// Gets a value from the cache
    ///
    /// Returns [`CacheError::KeyNotFound`] when the key is absent or expired.
    /// An expired entry found here is removed unless it was refreshed in the
    /// meantime.
    pub fn get(&self, key: &str) -> Result<V, CacheError> {
        let now = Instant::now();
        {
            let entries = self.shared.entries.read();
            match entries.get(key) {
                None => return Err(CacheError::KeyNotFound),
                Some(entry) if !entry.is_expired_at(now) => return Ok(entry.value.clone()),
                Some(_) => {}
            }
        }

        if self.shared.remove_if_expired(key, now) {
            trace!(key, "removed expired entry on read");
        }
        Err(CacheError::KeyNotFound)
    }

    /// Deletes an item from the cache
    pub fn delete(&self, key: &str) {
        self.shared.entries.write().remove(key);
    }

    /// Clears all items from the cache
    pub fn clear(&self) {
        self.shared.entries.write().clear();
    }

    /// Checks for a live entry without touching stale ones
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.shared
            .entries
            .read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Number of entries held, including expired ones not yet removed
    pub fn len(&self) -> usize {
        self.shared.entries.read().len()
    }

    /// Returns true if the cache holds no entries, stale or live
    pub fn is_empty(&self) -> bool {
        self.shared.entries.read().is_empty()
    }

    /// Runs one sweep on the calling thread and returns how many entries it removed
    pub fn purge_expired(&self) -> usize {
        self.shared.sweep(Instant::now())
    }

    /// The interval the sweeper was started with
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Signals the sweeper to stop; calling it again does nothing
    pub fn close(&self) {
        if !self.shutdown_tx.send_replace(true) {
            debug!("cache closed");
        }
    }

    /// Whether `close` or `shutdown` has been called
    pub fn is_closed(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Closes the cache and waits for the sweeper task to finish
    ///
    /// Concurrent callers all return only once the sweeper has ended.
    pub async fn shutdown(&self) {
        self.close();
        let mut sweeper = self.sweeper.lock().await;
        if let Some(handle) = sweeper.as_mut() {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    warn!(error = %err, "cache sweeper panicked");
                }
            }
            *sweeper = None;
        }
    }
}

impl<V> Cache<V> for LocalCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn set(&self, key: String, value: V, ttl: Duration) {
        LocalCache::set(self, key, value, ttl);
    }

    fn get(&self, key: &str) -> Result<V, CacheError> {
        LocalCache::get(self, key)
    }

    fn delete(&self, key: &str) {
        LocalCache::delete(self, key);
    }
}

impl<V> std::fmt::Debug for LocalCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache")
            .field("len", &self.shared.entries.read().len())
            .field("sweep_interval", &self.sweep_interval)
            .field("closed", &*self.shutdown_tx.borrow())
            .finish()
    }
}

impl<V> Drop for LocalCache<V> {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}
