//! Query cache for backend reads, keyed by a list of path-like parts.
//!
//! Values are stored as JSON so one cache can hold every response type. An
//! entry is fresh for [`DEFAULT_FRESHNESS`]; a stale or missing entry is
//! refetched on the next [`QueryCache::fetch`], with concurrent fetches of the
//! same key coalesced into one. [`QueryCache::invalidate_all`] bumps a
//! generation counter so a fetch that started before it never writes back.
//! Every direct write or invalidation of a key also bumps that key's version;
//! a fetch only stores its result if the version it started with still holds.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::{Duration, Instant},
};
use tracing::debug;

pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// `["auth", "user"]`
    #[must_use]
    pub fn current_user() -> Self {
        Self::new(["auth", "user"])
    }

    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

struct Entry {
    value: Value,
    fetched_at: Instant,
}

impl Entry {
    fn is_fresh(&self, freshness: Duration) -> bool {
        self.fetched_at.elapsed() < freshness
    }
}

pub struct QueryCache {
    freshness: Duration,
    generation: AtomicU64,
    versions: Mutex<HashMap<QueryKey, u64>>,
    entries: Mutex<HashMap<QueryKey, Entry>>,
    flights: Mutex<HashMap<QueryKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_FRESHNESS)
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("freshness", &self.freshness)
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

impl QueryCache {
    #[must_use]
    pub fn new(freshness: Duration) -> Self {
        Self {
            freshness,
            generation: AtomicU64::new(0),
            versions: Mutex::default(),
            entries: Mutex::default(),
            flights: Mutex::default(),
        }
    }

    /// Cached value for `key`, fresh or not.
    #[must_use]
    pub fn peek<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries();
        let entry = entries.get(key)?;
        decode(key, &entry.value)
    }

    #[must_use]
    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.entries()
            .get(key)
            .is_some_and(|entry| entry.is_fresh(self.freshness))
    }

    /// Overwrite `key` with `value`, marking it fresh. Fetches of `key`
    /// already in flight will not overwrite it.
    pub fn set<T: Serialize>(&self, key: &QueryKey, value: &T) {
        let mut versions = self.versions();
        *versions.entry(key.clone()).or_default() += 1;
        self.store(key, value);
    }

    pub fn invalidate(&self, key: &QueryKey) {
        let mut versions = self.versions();
        *versions.entry(key.clone()).or_default() += 1;
        self.entries().remove(key);
    }

    /// Drop every entry and orphan fetches already in flight.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the fresh value for `key`, or run `fetcher` and cache its result.
    ///
    /// Failures are returned to the caller and never cached.
    ///
    /// # Errors
    /// Returns whatever error `fetcher` produces.
    pub async fn fetch<T, E, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.fresh(key) {
            return Ok(value);
        }

        let flight = self.flight(key);
        let _guard = flight.lock().await;

        // Another caller may have filled the entry while we waited.
        if let Some(value) = self.fresh(key) {
            debug!("Coalesced fetch for {key}");
            return Ok(value);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let version = self.version(key);
        let value = fetcher().await?;

        let versions = self.versions();
        let current = versions.get(key).copied().unwrap_or_default();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding result for {key}: cache invalidated during fetch");
        } else if current != version {
            debug!("Discarding result for {key}: entry replaced during fetch");
        } else {
            self.store(key, &value);
        }
        drop(versions);

        Ok(value)
    }

    /// Write without touching the version; callers hold the versions lock.
    fn store<T: Serialize>(&self, key: &QueryKey, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.entries().insert(
                    key.clone(),
                    Entry {
                        value,
                        fetched_at: Instant::now(),
                    },
                );
            }
            Err(err) => debug!("Failed to cache {key}: {err}"),
        }
    }

    fn version(&self, key: &QueryKey) -> u64 {
        self.versions().get(key).copied().unwrap_or_default()
    }

    fn fresh<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries();
        let entry = entries.get(key)?;
        if !entry.is_fresh(self.freshness) {
            return None;
        }
        decode(key, &entry.value)
    }

    fn flight(&self, key: &QueryKey) -> Arc<tokio::sync::Mutex<()>> {
        self.flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone()
    }

    fn versions(&self) -> MutexGuard<'_, HashMap<QueryKey, u64>> {
        self.versions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn decode<T: DeserializeOwned>(key: &QueryKey, value: &Value) -> Option<T> {
    T::deserialize(value)
        .map_err(|err| debug!("Cached value for {key} has an unexpected shape: {err}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{convert::Infallible, sync::atomic::AtomicUsize};

    #[tokio::test]
    async fn fresh_entry_skips_fetcher() {
        let cache = QueryCache::default();
        let key = QueryKey::new(["businesses"]);
        cache.set(&key, &vec![1, 2, 3]);

        let value: Result<Vec<i32>, Infallible> =
            cache.fetch(&key, || async { Ok(vec![9]) }).await;
        assert_eq!(value, Ok(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn stale_entry_is_refetched() {
        let cache = QueryCache::new(Duration::ZERO);
        let key = QueryKey::new(["orders"]);
        cache.set(&key, &1);
        assert!(!cache.is_fresh(&key));

        let value: Result<i32, Infallible> = cache.fetch(&key, || async { Ok(2) }).await;
        assert_eq!(value, Ok(2));
        assert_eq!(cache.peek::<i32>(&key), Some(2));
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = QueryCache::default();
        let key = QueryKey::current_user();

        let value: Result<i32, &str> = cache.fetch(&key, || async { Err("boom") }).await;
        assert_eq!(value, Err("boom"));
        assert!(cache.peek::<i32>(&key).is_none());
    }

    #[tokio::test]
    async fn concurrent_fetches_coalesce() {
        let cache = QueryCache::default();
        let key = QueryKey::new(["products"]);
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok::<_, Infallible>(7)
        };

        let (a, b) = tokio::join!(cache.fetch(&key, fetch), cache.fetch(&key, fetch));
        assert_eq!(a, Ok(7));
        assert_eq!(b, Ok(7));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_all_during_fetch_prevents_write_back() {
        let cache = QueryCache::default();
        let key = QueryKey::current_user();
        let shared = &cache;

        let value: Result<String, Infallible> = cache
            .fetch(&key, move || async move {
                shared.invalidate_all();
                Ok("old account".to_string())
            })
            .await;

        assert_eq!(value.as_deref(), Ok("old account"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn set_during_fetch_keeps_the_newer_value() {
        let cache = QueryCache::default();
        let key = QueryKey::current_user();
        let shared = &cache;

        let value: Result<String, Infallible> = cache
            .fetch(&key, move || async move {
                shared.set(&QueryKey::current_user(), &"new account");
                Ok("old account".to_string())
            })
            .await;

        assert_eq!(value.as_deref(), Ok("old account"));
        assert_eq!(cache.peek::<String>(&key).as_deref(), Some("new account"));
    }

    #[tokio::test]
    async fn set_on_another_key_does_not_block_write_back() {
        let cache = QueryCache::default();
        let key = QueryKey::new(["orders"]);
        let shared = &cache;

        let value: Result<i32, Infallible> = cache
            .fetch(&key, move || async move {
                shared.set(&QueryKey::new(["products"]), &1);
                Ok(2)
            })
            .await;

        assert_eq!(value, Ok(2));
        assert_eq!(cache.peek::<i32>(&key), Some(2));
    }

    #[test]
    fn invalidate_all_drops_every_key() {
        let cache = QueryCache::default();
        cache.set(&QueryKey::current_user(), &"user");
        cache.set(&QueryKey::new(["businesses", "b1"]), &"business");
        cache.invalidate(&QueryKey::current_user());
        assert_eq!(cache.len(), 1);

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn key_display_lists_parts() {
        assert_eq!(QueryKey::current_user().to_string(), "[auth, user]");
    }
}
