//! Request coalescing for repository fetches.
//!
//! Every key gets one shared cell. The first caller runs the fetch; callers
//! arriving while it is in flight await the same cell and receive a clone of
//! its result. Results, negative ones included, stay cached for the lifetime
//! of the cache, which is one resolution run.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

/// A coalescing map from key to fetched value.
#[derive(Debug)]
pub struct FetchCache<K, V> {
    entries: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for FetchCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> FetchCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, running `fetch` if no caller has
    /// requested it yet. At most one `fetch` runs per key.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(key).or_default().clone()
        };
        cell.get_or_init(fetch).await.clone()
    }

    /// The completed value for `key`, if any.
    pub async fn peek(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock().await;
        entries.get(key).and_then(|cell| cell.get().cloned())
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Forget every entry, so the next request for any key fetches again.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}
