//! In-memory transactional store with optimistic concurrency.

use super::{Mutation, StoreStats, TransactionalStore};
use crate::error::{ClusterError, Result};
use crate::types::Document;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
struct Versioned {
    document: Document,
    version: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, Versioned>,
    next_version: u64,
    stats: StoreStats,
}

impl Inner {
    fn bump_version(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    fn apply(&mut self, key: &str, mutation: &Mutation) {
        match mutation {
            Mutation::Keep => {}
            Mutation::Set(document) => {
                let version = self.bump_version();
                self.entries.insert(
                    key.to_string(),
                    Versioned {
                        document: document.clone(),
                        version,
                    },
                );
            }
            Mutation::Delete => {
                self.entries.remove(key);
            }
        }
    }
}

/// In-memory [`TransactionalStore`].
///
/// Transactions are optimistic: the body runs against a snapshot taken before
/// yielding to the scheduler, and the commit is rejected if the key changed in
/// the meantime. Rejected transactions are re-run up to `max_attempts` times,
/// which mirrors how remote document stores behave under contention.
///
/// # Examples
///
/// ```rust
/// use geocluster::storage::{MemoryStore, Mutation, TransactionalStore};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let store = MemoryStore::new();
/// let mut doc = serde_json::Map::new();
/// doc.insert("s".into(), 1.into());
///
/// store
///     .run_transaction("u4", &mut |current| {
///         assert!(current.is_none());
///         Ok(Mutation::Set(doc.clone()))
///     })
///     .await
///     .unwrap();
/// assert!(store.get("u4").await.unwrap().is_some());
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    max_attempts: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Number of times a conflicting transaction is attempted before failing.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        assert!(attempts > 0, "Max attempts must be greater than zero");
        self.max_attempts = attempts;
        self
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Sorted list of every stored key.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().entries.keys().cloned().collect()
    }

    /// Copy of every stored document.
    pub fn snapshot(&self) -> BTreeMap<String, Document> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.document.clone()))
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        stats.key_count = inner.entries.len();
        stats
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
    async fn run_transaction(
        &self,
        key: &str,
        body: &mut (dyn for<'d> FnMut(Option<&'d Document>) -> Result<Mutation> + Send),
    ) -> Result<Mutation> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let (snapshot, read_version) = {
                let mut inner = self.inner.lock();
                inner.stats.transactions += 1;
                match inner.entries.get(key) {
                    Some(entry) => (Some(entry.document.clone()), Some(entry.version)),
                    None => (None, None),
                }
            };

            // Let concurrent transactions interleave between read and commit.
            tokio::task::yield_now().await;

            let mutation = match body(snapshot.as_ref()) {
                Ok(mutation) => mutation,
                Err(e) => {
                    self.inner.lock().stats.aborted += 1;
                    return Err(e);
                }
            };

            let committed = {
                let mut inner = self.inner.lock();
                let current_version = inner.entries.get(key).map(|entry| entry.version);
                if current_version == read_version {
                    inner.apply(key, &mutation);
                    inner.stats.commits += 1;
                    true
                } else {
                    inner.stats.conflicts += 1;
                    false
                }
            };

            if committed {
                return Ok(mutation);
            }

            if attempts >= self.max_attempts {
                return Err(ClusterError::TransactionConflict {
                    key: key.to_string(),
                    attempts,
                });
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Document>> {
        Ok(self
            .inner
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.document.clone()))
    }

    async fn set(&self, key: &str, document: Document) -> Result<()> {
        self.inner.lock().apply(key, &Mutation::Set(document));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.inner.lock().entries.remove(key).is_some())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Document)>> {
        let inner = self.inner.lock();
        Ok(inner
            .entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| (key.clone(), entry.document.clone()))
            .collect())
    }
}
