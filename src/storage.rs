//! Storage abstraction for the cluster index
//!
//! The index never talks to a database directly. It consumes a
//! [`TransactionalStore`], which must offer an atomic read-modify-write of a
//! single key plus a handful of plain reads and writes used by flat
//! (non-clustered) documents and by map views.

use crate::error::Result;
use crate::types::Document;
use async_trait::async_trait;

mod memory;

pub use memory::MemoryStore;

/// Write decided by a transaction body.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Leave the key untouched
    Keep,
    /// Replace the document at the key
    Set(Document),
    /// Remove the key
    Delete,
}

/// Backing store consumed by the cluster index.
///
/// # Transactions
///
/// `run_transaction` reads the current document at `key`, hands it to `body`
/// and atomically commits the returned [`Mutation`]. A store may detect a
/// concurrent write to the same key and invoke `body` again with the fresh
/// document, so bodies must be free of side effects outside their own
/// captured state. When the store gives up it returns
/// [`ClusterError::TransactionConflict`](crate::ClusterError::TransactionConflict).
/// An error returned by `body` aborts the transaction without writing and is
/// passed through unchanged.
///
/// The store is the only source of mutual exclusion between concurrent walks:
/// at most one committed write per key may win for a given read.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    /// Atomically read-modify-write a single key; returns the committed mutation.
    async fn run_transaction(
        &self,
        key: &str,
        body: &mut (dyn for<'d> FnMut(Option<&'d Document>) -> Result<Mutation> + Send),
    ) -> Result<Mutation>;

    /// Read a document outside any transaction
    async fn get(&self, key: &str) -> Result<Option<Document>>;

    /// Write a document outside any transaction
    async fn set(&self, key: &str, document: Document) -> Result<()>;

    /// Delete a document outside any transaction; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// All documents whose key starts with `prefix`, in key order
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Document)>>;
}

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of keys currently stored
    pub key_count: usize,
    /// Transactions started (each retry counts once more)
    pub transactions: u64,
    /// Transactions that committed
    pub commits: u64,
    /// Commits rejected because the key changed after it was read
    pub conflicts: u64,
    /// Transactions aborted by their body
    pub aborted: u64,
}
