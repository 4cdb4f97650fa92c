//! Store wrapper that injects transaction failures on chosen keys.

#![allow(dead_code)]

use async_trait::async_trait;
use geocluster::{ClusterError, Document, MemoryStore, Mutation, Result, TransactionalStore};
use parking_lot::Mutex;
use std::collections::HashMap;

const ALWAYS: u32 = u32::MAX;

#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failures: Mutex<HashMap<String, u32>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transaction on `key` reports a conflict.
    pub fn fail_always(&self, key: &str) {
        self.failures.lock().insert(key.to_string(), ALWAYS);
    }

    /// The next `times` transactions on `key` report a conflict.
    pub fn fail_times(&self, key: &str, times: u32) {
        self.failures.lock().insert(key.to_string(), times);
    }

    pub fn heal(&self) {
        self.failures.lock().clear();
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn take_failure(&self, key: &str) -> bool {
        let mut failures = self.failures.lock();
        match failures.get_mut(key) {
            Some(remaining) if *remaining == ALWAYS => true,
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl TransactionalStore for FlakyStore {
    async fn run_transaction(
        &self,
        key: &str,
        body: &mut (dyn for<'d> FnMut(Option<&'d Document>) -> Result<Mutation> + Send),
    ) -> Result<Mutation> {
        if self.take_failure(key) {
            return Err(ClusterError::TransactionConflict {
                key: key.to_string(),
                attempts: 1,
            });
        }
        self.inner.run_transaction(key, body).await
    }

    async fn get(&self, key: &str) -> Result<Option<Document>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, document: Document) -> Result<()> {
        self.inner.set(key, document).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.inner.delete(key).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Document)>> {
        self.inner.scan_prefix(prefix).await
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {} but got {}",
        expected,
        actual
    );
}
