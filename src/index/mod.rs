//! Multi-level cluster maintenance over a [`TransactionalStore`].
//!
//! Every point is folded into one [`ClusterNode`] per precision level, keyed by
//! the level-length prefix of its geohash. Each level is its own transaction
//! and commits before the next one starts, so concurrent readers may observe
//! a hierarchy where finer and coarser levels disagree for a moment. Per-key
//! mutual exclusion comes entirely from the store.
//!
//! ```text
//! level 1   "s"          size 3   centroid mean(A, B, C)
//! level 2   "s0"         size 2   centroid mean(A, B)
//!           "s1"         size 1   centroid C
//! ...
//! level P   "s000000000" size 1   A + pointId + source fields
//! ```

mod report;
mod walk;

pub use report::{LevelOutcome, LevelReport, Operation, WalkReport};

use crate::compute::geohash::{encode, prefix};
use crate::compute::validation::{validate_coordinate, validate_geohash};
use crate::config::Config;
use crate::error::{ClusterError, Result};
use crate::storage::TransactionalStore;
use crate::types::{ClusterNode, Coordinate, Document};
use std::sync::Arc;
use walk::{Action, Applied, LeafPayload, Step, Walk};

/// Geohash cluster index.
///
/// Cheap to clone; clones share the store.
///
/// # Examples
///
/// ```rust
/// use geocluster::{ClusterIndex, Config, Coordinate, MemoryStore};
/// use std::sync::Arc;
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let store = Arc::new(MemoryStore::new());
/// let index = ClusterIndex::new(store, &Config::with_geohash_precision(6)).unwrap();
///
/// let paris = Coordinate::new(48.8566, 2.3522);
/// let report = index.add_point(&paris, Some("paris".into()), Default::default()).await.unwrap();
/// assert!(report.is_complete());
///
/// let cell = index.get_cluster("u").await.unwrap().unwrap();
/// assert_eq!(cell.size, 1);
/// # });
/// ```
pub struct ClusterIndex<S: TransactionalStore + ?Sized> {
    store: Arc<S>,
    config: Config,
}

impl<S: TransactionalStore + ?Sized> Clone for ClusterIndex<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: TransactionalStore + ?Sized> ClusterIndex<S> {
    pub fn new(store: Arc<S>, config: &Config) -> Result<Self> {
        config.validate().map_err(ClusterError::Config)?;
        Ok(Self {
            store,
            config: config.clone(),
        })
    }

    /// Finest precision level P.
    pub fn precision(&self) -> usize {
        self.config.geohash_precision
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Full-precision key of the leaf a coordinate lands in.
    pub fn key_for(&self, coordinate: &Coordinate) -> Result<String> {
        encode(coordinate, self.precision())
    }

    /// Fold a point into every level from 1 (coarsest) to P.
    ///
    /// The leaf at level P keeps `point_id` and `source_data` while it holds a
    /// single point. Transaction failures are retried, then handled by the
    /// configured [`FailurePolicy`](crate::FailurePolicy) and reported per
    /// level; check [`WalkReport::is_complete`] or use
    /// [`WalkReport::into_result`].
    pub async fn add_point(
        &self,
        coordinate: &Coordinate,
        point_id: Option<String>,
        source_data: Document,
    ) -> Result<WalkReport> {
        let hash = self.key_for(coordinate)?;
        let precision = self.precision();
        let mut payload = Some(LeafPayload {
            point_id,
            source_data,
        });

        let mut walk = Walk::new(self, Operation::Add);
        for level in 1..=precision {
            let leaf = if level == precision { payload.take() } else { None };
            walk.step(Step {
                level,
                key: prefix(&hash, level)?.to_string(),
                action: Action::Insert {
                    point: *coordinate,
                    leaf,
                },
            })
            .await?;
        }

        Ok(walk.finish())
    }

    /// Remove the point stored at `full_geohash` from every level, P down to 1.
    pub async fn delete_point(&self, full_geohash: &str) -> Result<WalkReport> {
        self.delete_point_with(full_geohash, &mut |_| {}).await
    }

    /// Like [`delete_point`](Self::delete_point), calling `on_update` with the
    /// new state of every node that survives the removal.
    ///
    /// The leaf's centroid is taken as the removed coordinate and threaded to
    /// all coarser levels. A missing node at any level fails the walk with
    /// [`ClusterError::PointNotFound`].
    pub async fn delete_point_with(
        &self,
        full_geohash: &str,
        on_update: &mut (dyn FnMut(&ClusterNode) + Send),
    ) -> Result<WalkReport> {
        self.check_full_key(full_geohash)?;
        let precision = self.precision();

        let mut walk = Walk::new(self, Operation::Delete);
        let mut removed = None;

        for level in (1..=precision).rev() {
            if level < precision && removed.is_none() && !walk.is_halted() {
                // The leaf never reported its coordinate; nothing to thread.
                walk.halt();
            }

            let applied = walk
                .step(Step {
                    level,
                    key: prefix(full_geohash, level)?.to_string(),
                    action: Action::Remove {
                        point: removed,
                        restore: None,
                    },
                })
                .await?;

            if let Some(applied) = applied {
                if level == precision {
                    removed = applied.removed;
                }
                notify(&applied, on_update);
            }
        }

        Ok(walk.finish())
    }

    /// Move the point stored at `from_geohash` to `to`, replacing its leaf
    /// payload.
    ///
    /// Levels are walked from P down to 1. Where the old and new cells are the
    /// same the centroid is shifted in one transaction; otherwise the new cell
    /// is incremented before the old one is decremented, so the point is
    /// counted at every level throughout the move.
    pub async fn move_point(
        &self,
        from_geohash: &str,
        to: &Coordinate,
        point_id: Option<String>,
        source_data: Document,
    ) -> Result<WalkReport> {
        self.check_full_key(from_geohash)?;
        validate_coordinate(to)?;
        let precision = self.precision();
        let to_hash = self.key_for(to)?;

        if self.get_cluster(from_geohash).await?.is_none() {
            return Err(ClusterError::PointNotFound(from_geohash.to_string()));
        }

        let mut payload = Some(LeafPayload {
            point_id,
            source_data,
        });
        let mut walk = Walk::new(self, Operation::Move);
        let mut removed: Option<Coordinate> = None;

        for level in (1..=precision).rev() {
            if level < precision && removed.is_none() && !walk.is_halted() {
                walk.halt();
            }

            let from_key = prefix(from_geohash, level)?.to_string();
            let to_key = prefix(&to_hash, level)?.to_string();
            let leaf = if level == precision { payload.take() } else { None };

            let applied = if from_key == to_key {
                walk.step(Step {
                    level,
                    key: to_key,
                    action: Action::Shift {
                        from: removed,
                        to: *to,
                        leaf,
                    },
                })
                .await?
            } else {
                walk.step(Step {
                    level,
                    key: to_key,
                    action: Action::Insert { point: *to, leaf },
                })
                .await?;
                walk.step(Step {
                    level,
                    key: from_key,
                    action: Action::Remove {
                        point: removed,
                        restore: None,
                    },
                })
                .await?
            };

            if level == precision {
                removed = applied.and_then(|a| a.removed);
            }
        }

        Ok(walk.finish())
    }

    /// Alias of [`move_point`](Self::move_point).
    pub async fn update_point(
        &self,
        from_geohash: &str,
        to: &Coordinate,
        point_id: Option<String>,
        source_data: Document,
    ) -> Result<WalkReport> {
        self.move_point(from_geohash, to, point_id, source_data).await
    }

    /// Read the node stored at `key`.
    pub async fn get_cluster(&self, key: &str) -> Result<Option<ClusterNode>> {
        self.store
            .get(key)
            .await?
            .map(|doc| ClusterNode::from_document(key, &doc))
            .transpose()
    }

    /// Every node of exactly `level` under `prefix`, in key order.
    ///
    /// This is what a map view reads to draw one marker per cell.
    pub async fn clusters_at_level(&self, prefix: &str, level: usize) -> Result<Vec<ClusterNode>> {
        if level == 0 || level > self.precision() {
            return Err(ClusterError::InvalidInput(format!(
                "level {} is outside 1..={}",
                level,
                self.precision()
            )));
        }
        if prefix.len() > level {
            return Err(ClusterError::InvalidInput(format!(
                "prefix '{}' is longer than level {}",
                prefix, level
            )));
        }
        if !prefix.is_empty() {
            validate_geohash(prefix, self.precision())?;
        }

        let mut nodes = Vec::new();
        for (key, doc) in self.store.scan_prefix(prefix).await? {
            if key.len() != level || validate_geohash(&key, self.precision()).is_err() {
                continue;
            }
            nodes.push(ClusterNode::from_document(&key, &doc)?);
        }
        Ok(nodes)
    }

    /// Total number of points folded into the index.
    pub async fn point_count(&self) -> Result<u64> {
        Ok(self
            .clusters_at_level("", 1)
            .await?
            .iter()
            .map(|node| node.size)
            .sum())
    }

    fn check_full_key(&self, hash: &str) -> Result<()> {
        validate_geohash(hash, self.precision())?;
        if hash.len() != self.precision() {
            return Err(ClusterError::InvalidGeohash(format!(
                "'{}' has {} characters, expected {}",
                hash,
                hash.len(),
                self.precision()
            )));
        }
        Ok(())
    }

    /// Run one step in its own transaction, retrying retryable failures.
    pub(crate) async fn execute(&self, step: &Step) -> Result<Applied> {
        let mut attempt = 0;
        loop {
            match self.transact(step).await {
                Ok(applied) => return Ok(applied),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    log::warn!(
                        "transaction on '{}' failed ({}), retry {}/{}",
                        step.key,
                        e,
                        attempt,
                        self.config.max_retries
                    );
                    tokio::time::sleep(self.config.retry_backoff(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn transact(&self, step: &Step) -> Result<Applied> {
        let mut applied = None;
        self.store
            .run_transaction(&step.key, &mut |current| {
                let node = current
                    .map(|doc| ClusterNode::from_document(&step.key, doc))
                    .transpose()?;
                let (mutation, result) = step.action.plan(&step.key, node)?;
                applied = Some(result);
                Ok(mutation)
            })
            .await?;

        applied.ok_or_else(|| {
            ClusterError::Store(format!(
                "transaction on '{}' committed without running its body",
                step.key
            ))
        })
    }
}

fn notify(applied: &Applied, on_update: &mut (dyn FnMut(&ClusterNode) + Send)) {
    if let LevelOutcome::Updated(node) = &applied.outcome {
        on_update(node);
    }
}
