//! Non-blocking cache of index metadata.
//!
//! # Read path
//!
//! [`IndexCache::get_indices`] only ever looks at what is resident:
//!
//! - a valid entry is returned;
//! - an entry whose [`IndexMetadata::last_updated`] disagrees with the split's
//!   last-modified time is removed and nothing is returned;
//! - a missing or expired entry schedules a background load and nothing is
//!   returned.
//!
//! Callers observe loaded indexes on a later call. Nothing on the read path
//! waits for I/O.
//!
//! # Background loads
//!
//! Loads run on a small tokio runtime owned by the cache. Each load starts
//! after the configured delay, which damps bursts of identical misses. A key
//! has at most one load in flight; further misses while it runs are dropped.
//! Failures and timeouts are logged at debug level and leave the slot empty.

mod key;
mod loader;

use std::{
    collections::HashSet,
    num::NonZeroUsize,
    sync::Arc,
    time::{Duration, Instant},
};

pub use key::IndexCacheKey;
pub use loader::IndexLoader;
use lru::LruCache;
use parking_lot::Mutex;
use tokio::runtime::Runtime;
use tracing::{debug, trace};

use crate::{
    config::{CacheConfig, FilterConfig},
    error::LoadError,
    index::{IndexKind, IndexMetadata},
    split::Split,
};

/// Index kinds requested for every column.
pub const DEFAULT_INDEX_KINDS: [IndexKind; 2] = [IndexKind::Bitmap, IndexKind::Bloom];

#[derive(Clone)]
struct CacheEntry {
    indexes: Arc<[IndexMetadata]>,
    loaded_at: Instant,
}

struct Shared {
    entries: Mutex<LruCache<IndexCacheKey, CacheEntry>>,
    in_flight: Mutex<HashSet<IndexCacheKey>>,
    loader: Arc<dyn IndexLoader>,
    ttl: Duration,
}

impl Shared {
    fn lookup(&self, key: &IndexCacheKey) -> Option<Arc<[IndexMetadata]>> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.loaded_at.elapsed() < self.ttl => {
                return Some(Arc::clone(&entry.indexes));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
            trace!(%key, "index cache entry expired");
        }
        None
    }

    async fn load(self: Arc<Self>, key: IndexCacheKey, timeout: Duration) {
        let _guard = InFlightGuard {
            shared: Arc::clone(&self),
            key: key.clone(),
        };

        let result = if timeout.is_zero() {
            self.loader.load(&key).await
        } else {
            match tokio::time::timeout(timeout, self.loader.load(&key)).await {
                Ok(result) => result,
                Err(_) => Err(LoadError::Timeout {
                    path: key.path().to_string(),
                    timeout,
                }),
            }
        };

        match result {
            Ok(indexes) => {
                debug!(%key, indexes = indexes.len(), "Loaded index");
                let entry = CacheEntry {
                    indexes: indexes.into(),
                    loaded_at: Instant::now(),
                };
                self.entries.lock().put(key, entry);
            }
            Err(error) => {
                debug!(%key, %error, "Unable to load index");
            }
        }
    }
}

/// Clears the in-flight marker even when the loader panics.
struct InFlightGuard {
    shared: Arc<Shared>,
    key: IndexCacheKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.shared.in_flight.lock().remove(&self.key);
    }
}

/// Concurrent, bounded, TTL-expiring cache from [`IndexCacheKey`] to the
/// indexes stored for it.
///
/// Create one per process and share it through an `Arc`. Dropping the cache
/// stops its loader threads without waiting for running loads.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use split_prune::{FilterConfig, IndexCache, IndexLoader, Split};
///
/// # fn example(loader: Arc<dyn IndexLoader>) -> std::io::Result<()> {
/// let cache = IndexCache::new(&FilterConfig::enabled(), loader)?;
///
/// let split = Split::new("hive", "hdfs://nn/warehouse/nation/000000_0", 0, 1024, 1_600_000_000_000);
/// let columns = vec!["nationkey".to_string()];
///
/// // The first call schedules a load and returns immediately.
/// assert!(cache.get_indices("hive.tpch.nation", &split, &columns, &[]).is_empty());
/// # Ok(())
/// # }
/// ```
pub struct IndexCache {
    config: CacheConfig,
    shared: Arc<Shared>,
    runtime: Option<Runtime>,
}

impl IndexCache {
    /// Create a cache for `config`.
    ///
    /// With `config.enabled == false` no threads are started and every lookup
    /// returns nothing.
    ///
    /// # Errors
    ///
    /// Fails when the loader threads cannot be spawned.
    pub fn new(config: &FilterConfig, loader: Arc<dyn IndexLoader>) -> std::io::Result<Self> {
        let cache_config = config.cache.clone();
        let capacity = NonZeroUsize::new(cache_config.max_entries).unwrap_or(NonZeroUsize::MIN);
        let runtime = if config.enabled {
            let threads = cache_config.effective_loading_threads();
            debug!(threads, capacity = capacity.get(), "Starting index cache loader pool");
            Some(
                tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(threads)
                    .thread_name("index-cache-loader")
                    .enable_time()
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(LruCache::new(capacity)),
                in_flight: Mutex::new(HashSet::new()),
                loader,
                ttl: cache_config.ttl,
            }),
            config: cache_config,
            runtime,
        })
    }

    /// Create a cache that never loads anything.
    pub fn disabled(loader: Arc<dyn IndexLoader>) -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(LruCache::new(NonZeroUsize::MIN)),
                in_flight: Mutex::new(HashSet::new()),
                loader,
                ttl: Duration::ZERO,
            }),
            config: CacheConfig::default(),
            runtime: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Resident, valid indexes for the columns of `split` referenced by a
    /// predicate.
    ///
    /// Partition columns are skipped (they are pruned by the planner).
    /// Missing entries are loaded in the background; this call never waits
    /// for them.
    pub fn get_indices(
        &self,
        table_fqn: &str,
        split: &Split,
        predicate_columns: &[String],
        partition_columns: &[String],
    ) -> Vec<IndexMetadata> {
        if self.runtime.is_none() || table_fqn.is_empty() || predicate_columns.is_empty() {
            return Vec::new();
        }

        let last_modified = split.last_modified();
        let file_path = split.file_path();
        let mut split_indexes = Vec::new();

        for column in predicate_columns {
            if partition_columns
                .iter()
                .any(|partition| partition.eq_ignore_ascii_case(column))
            {
                continue;
            }

            let key = IndexCacheKey::for_column(
                table_fqn,
                column,
                file_path,
                last_modified,
                DEFAULT_INDEX_KINDS,
            );
            match self.shared.lookup(&key) {
                Some(indexes) => {
                    if indexes.iter().any(|m| m.last_updated() != last_modified) {
                        debug!(%key, "Dropping stale index");
                        self.invalidate(&key);
                    } else {
                        split_indexes.extend(indexes.iter().cloned());
                    }
                }
                None => self.schedule_load(key),
            }
        }

        split_indexes
    }

    fn schedule_load(&self, key: IndexCacheKey) {
        let Some(runtime) = self.runtime.as_ref() else {
            return;
        };
        if !self.shared.in_flight.lock().insert(key.clone()) {
            trace!(%key, "Index load already in flight");
            return;
        }

        let shared = Arc::clone(&self.shared);
        let delay = self.config.loading_delay;
        let timeout = self.config.load_timeout;
        runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            shared.load(key, timeout).await;
        });
    }

    /// Whether a non-expired entry is resident for `key`.
    ///
    /// Does not change the entry's recency.
    pub fn is_resident(&self, key: &IndexCacheKey) -> bool {
        self.shared
            .entries
            .lock()
            .peek(key)
            .is_some_and(|entry| entry.loaded_at.elapsed() < self.shared.ttl)
    }

    /// Number of entries held, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.shared.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of loads scheduled or running.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.lock().len()
    }

    pub fn invalidate(&self, key: &IndexCacheKey) {
        self.shared.entries.lock().pop(key);
    }

    pub fn invalidate_all(&self) {
        self.shared.entries.lock().clear();
    }
}

impl Drop for IndexCache {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for IndexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexCache")
            .field("enabled", &self.is_enabled())
            .field("config", &self.config)
            .field("entries", &self.len())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
    };

    use futures_util::{FutureExt, future::BoxFuture};

    use super::*;
    use crate::index::BitmapIndex;

    const TABLE: &str = "hive.tpch.nation";

    /// Loader returning one bitmap index per key, built for `last_updated`.
    struct StubLoader {
        calls: AtomicUsize,
        last_updated: Option<i64>,
        latency: Duration,
        fail: bool,
    }

    impl StubLoader {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_updated: None,
                latency: Duration::ZERO,
                fail: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl IndexLoader for StubLoader {
        fn load(
            &self,
            key: &IndexCacheKey,
        ) -> BoxFuture<'_, Result<Vec<IndexMetadata>, LoadError>> {
            let path = key.path().to_string();
            let last_updated = self.last_updated.unwrap_or(key.last_modified());
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if !self.latency.is_zero() {
                    tokio::time::sleep(self.latency).await;
                }
                if self.fail {
                    return Err(LoadError::NotFound { path });
                }
                let index = Arc::new(BitmapIndex::new());
                Ok(vec![IndexMetadata::new(
                    index, TABLE, "nationkey", "/indexes", path, 0, last_updated,
                )])
            }
            .boxed()
        }
    }

    fn config(configure: impl FnOnce(&mut CacheConfig)) -> FilterConfig {
        let mut config = FilterConfig::enabled();
        config.cache.loading_delay = Duration::ZERO;
        configure(&mut config.cache);
        config
    }

    fn split(last_modified: i64) -> Split {
        Split::new("hive", "hdfs://nn/warehouse/nation/f0", 0, 100, last_modified)
    }

    fn key_for(split: &Split, column: &str) -> IndexCacheKey {
        IndexCacheKey::for_column(
            TABLE,
            column,
            split.file_path(),
            split.last_modified(),
            DEFAULT_INDEX_KINDS,
        )
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn disabled_cache_never_loads() {
        let loader = Arc::new(StubLoader::new());
        let cache = IndexCache::new(&FilterConfig::default(), loader.clone()).unwrap();
        assert!(!cache.is_enabled());

        let indexes = cache.get_indices(TABLE, &split(1), &columns(&["nationkey"]), &[]);
        assert!(indexes.is_empty());
        assert_eq!(cache.in_flight(), 0);
        assert_eq!(loader.calls(), 0);
    }

    #[test]
    fn missing_inputs_return_nothing() {
        let loader = Arc::new(StubLoader::new());
        let cache = IndexCache::new(&config(|_| {}), loader).unwrap();

        assert!(cache.get_indices("", &split(1), &columns(&["nationkey"]), &[]).is_empty());
        assert!(cache.get_indices(TABLE, &split(1), &[], &[]).is_empty());
        assert_eq!(cache.in_flight(), 0);
    }

    #[test]
    fn cold_read_does_not_wait_for_load() {
        let loader = Arc::new(StubLoader::new());
        let cache = IndexCache::new(
            &config(|c| c.loading_delay = Duration::from_millis(5000)),
            loader.clone(),
        )
        .unwrap();

        let started = Instant::now();
        let indexes = cache.get_indices(TABLE, &split(1), &columns(&["nationkey"]), &[]);
        assert!(indexes.is_empty());
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(cache.in_flight(), 1);
        assert_eq!(loader.calls(), 0);
    }

    #[test]
    fn loaded_entry_is_returned_on_later_calls() {
        let loader = Arc::new(StubLoader::new());
        let cache = IndexCache::new(&config(|_| {}), loader.clone()).unwrap();
        let split = split(1);
        let cols = columns(&["NationKey"]);

        assert!(cache.get_indices(TABLE, &split, &cols, &[]).is_empty());
        assert!(wait_until(|| cache.is_resident(&key_for(&split, "nationkey"))));

        let indexes = cache.get_indices(TABLE, &split, &cols, &[]);
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].last_updated(), 1);
        assert_eq!(
            indexes[0].uri(),
            "hive.tpch.nation/nationkey/warehouse/nation/f0"
        );
        assert_eq!(loader.calls(), 1);
    }

    #[test]
    fn concurrent_misses_share_one_load() {
        let loader = Arc::new(StubLoader::new());
        let cache = Arc::new(
            IndexCache::new(
                &config(|c| c.loading_delay = Duration::from_millis(100)),
                loader.clone(),
            )
            .unwrap(),
        );
        let split = split(1);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let split = split.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        cache.get_indices(TABLE, &split, &columns(&["nationkey"]), &[]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(wait_until(|| cache.is_resident(&key_for(&split, "nationkey"))));
        assert!(wait_until(|| cache.in_flight() == 0));
        assert_eq!(loader.calls(), 1);
    }

    #[test]
    fn stale_entry_is_removed_on_read() {
        let loader = Arc::new(StubLoader {
            last_updated: Some(100),
            ..StubLoader::new()
        });
        let cache = IndexCache::new(&config(|_| {}), loader).unwrap();
        let split = split(200);
        let key = key_for(&split, "nationkey");

        cache.get_indices(TABLE, &split, &columns(&["nationkey"]), &[]);
        assert!(wait_until(|| cache.is_resident(&key)));

        let indexes = cache.get_indices(TABLE, &split, &columns(&["nationkey"]), &[]);
        assert!(indexes.is_empty());
        assert!(!cache.is_resident(&key));
        assert_eq!(cache.in_flight(), 0);
    }

    #[test]
    fn partition_columns_are_skipped() {
        let loader = Arc::new(StubLoader::new());
        let cache = IndexCache::new(&config(|_| {}), loader.clone()).unwrap();

        let indexes = cache.get_indices(
            TABLE,
            &split(1),
            &columns(&["ds"]),
            &columns(&["DS"]),
        );
        assert!(indexes.is_empty());
        assert_eq!(cache.in_flight(), 0);
        assert_eq!(loader.calls(), 0);
    }

    #[test]
    fn failed_load_leaves_slot_empty_and_retries() {
        let loader = Arc::new(StubLoader {
            fail: true,
            ..StubLoader::new()
        });
        let cache = IndexCache::new(&config(|_| {}), loader.clone()).unwrap();
        let split = split(1);

        cache.get_indices(TABLE, &split, &columns(&["nationkey"]), &[]);
        assert!(wait_until(|| loader.calls() == 1 && cache.in_flight() == 0));
        assert!(cache.is_empty());

        assert!(cache.get_indices(TABLE, &split, &columns(&["nationkey"]), &[]).is_empty());
        assert!(wait_until(|| loader.calls() == 2));
    }

    #[test]
    fn slow_load_times_out() {
        let loader = Arc::new(StubLoader {
            latency: Duration::from_secs(30),
            ..StubLoader::new()
        });
        let cache = IndexCache::new(
            &config(|c| c.load_timeout = Duration::from_millis(50)),
            loader.clone(),
        )
        .unwrap();

        cache.get_indices(TABLE, &split(1), &columns(&["nationkey"]), &[]);
        assert!(wait_until(|| loader.calls() == 1 && cache.in_flight() == 0));
        assert!(cache.is_empty());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let loader = Arc::new(StubLoader::new());
        let cache = IndexCache::new(
            &config(|c| c.ttl = Duration::from_millis(100)),
            loader.clone(),
        )
        .unwrap();
        let split = split(1);
        let key = key_for(&split, "nationkey");

        cache.get_indices(TABLE, &split, &columns(&["nationkey"]), &[]);
        assert!(wait_until(|| cache.is_resident(&key)));
        thread::sleep(Duration::from_millis(150));
        assert!(!cache.is_resident(&key));

        assert!(cache.get_indices(TABLE, &split, &columns(&["nationkey"]), &[]).is_empty());
        assert!(wait_until(|| loader.calls() == 2));
    }

    #[test]
    fn size_is_bounded() {
        let loader = Arc::new(StubLoader::new());
        let cache = IndexCache::new(&config(|c| c.max_entries = 2), loader.clone()).unwrap();

        let split = split(1);
        cache.get_indices(TABLE, &split, &columns(&["a", "b", "c"]), &[]);
        assert!(wait_until(|| loader.calls() == 3 && cache.in_flight() == 0));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalidate_all_empties_the_cache() {
        let loader = Arc::new(StubLoader::new());
        let cache = IndexCache::new(&config(|_| {}), loader).unwrap();
        let split = split(1);

        cache.get_indices(TABLE, &split, &columns(&["a", "b"]), &[]);
        assert!(wait_until(|| cache.len() == 2));
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
