//! Step engine shared by the add, delete and move walks.
//!
//! A walk is a sequence of steps, one transaction each. Every committed step
//! records its inverse so the walk can be compensated when a later level
//! fails and the failure policy asks for a rollback.

use super::ClusterIndex;
use super::report::{LevelOutcome, Operation, WalkReport};
use crate::compute::centroid::{on_insert, on_remove, on_shift};
use crate::config::FailurePolicy;
use crate::error::{ClusterError, Result};
use crate::storage::{Mutation, TransactionalStore};
use crate::types::{ClusterNode, Coordinate, Document, strip_reserved};

/// Identifier and original fields of a single point, kept on its leaf.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LeafPayload {
    pub point_id: Option<String>,
    pub source_data: Document,
}

impl LeafPayload {
    fn of(node: &ClusterNode) -> Self {
        Self {
            point_id: node.point_id.clone(),
            source_data: node.source_data.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Action {
    /// Fold `point` in; `leaf` is written only when the node is created
    Insert {
        point: Coordinate,
        leaf: Option<LeafPayload>,
    },
    /// Take `point` out; `None` removes the node's own centroid. `restore`
    /// is written back when the node returns to a single point.
    Remove {
        point: Option<Coordinate>,
        restore: Option<LeafPayload>,
    },
    /// Replace `from` (or the node's centroid) by `to`, size unchanged
    Shift {
        from: Option<Coordinate>,
        to: Coordinate,
        leaf: Option<LeafPayload>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct Step {
    pub level: usize,
    pub key: String,
    pub action: Action,
}

/// Result of one committed step.
#[derive(Debug, Clone)]
pub(crate) struct Applied {
    pub outcome: LevelOutcome,
    pub undo: Action,
    /// Coordinate actually taken out of the node by `Remove` or `Shift`
    pub removed: Option<Coordinate>,
}

impl Action {
    /// Decide the write for `key` given its current node. Pure; may run more
    /// than once per step when the store retries the transaction.
    pub(crate) fn plan(&self, key: &str, current: Option<ClusterNode>) -> Result<(Mutation, Applied)> {
        match self {
            Action::Insert { point, leaf } => plan_insert(key, current, point, leaf.as_ref()),
            Action::Remove { point, restore } => {
                plan_remove(key, current, point.as_ref(), restore.as_ref())
            }
            Action::Shift { from, to, leaf } => {
                plan_shift(key, current, from.as_ref(), to, leaf.as_ref())
            }
        }
    }
}

fn plan_insert(
    key: &str,
    current: Option<ClusterNode>,
    point: &Coordinate,
    leaf: Option<&LeafPayload>,
) -> Result<(Mutation, Applied)> {
    let Some(mut node) = current else {
        let node = match leaf {
            Some(payload) => ClusterNode::leaf(
                key,
                *point,
                payload.point_id.clone(),
                payload.source_data.clone(),
            ),
            None => ClusterNode::new(key, *point),
        };
        let mutation = Mutation::Set(node.to_document()?);
        return Ok((
            mutation,
            Applied {
                outcome: LevelOutcome::Created(node),
                undo: Action::Remove {
                    point: Some(*point),
                    restore: None,
                },
                removed: None,
            },
        ));
    };

    // Merging drops the single point's id; keep it for compensation.
    let undo = Action::Remove {
        point: Some(*point),
        restore: node.is_single_point().then(|| LeafPayload::of(&node)),
    };

    let (centroid, size) = on_insert(&node.centroid, node.size, point);
    node.centroid = centroid;
    node.size = size;
    if size > 1 {
        // No longer a single point; the first point's source data stays.
        node.point_id = None;
    }

    Ok((
        Mutation::Set(node.to_document()?),
        Applied {
            outcome: LevelOutcome::Updated(node),
            undo,
            removed: None,
        },
    ))
}

fn plan_remove(
    key: &str,
    current: Option<ClusterNode>,
    point: Option<&Coordinate>,
    restore: Option<&LeafPayload>,
) -> Result<(Mutation, Applied)> {
    let mut node = current.ok_or_else(|| ClusterError::PointNotFound(key.to_string()))?;
    let removed = point.copied().unwrap_or(node.centroid);

    match on_remove(&node.centroid, node.size, &removed) {
        None => Ok((
            Mutation::Delete,
            Applied {
                outcome: LevelOutcome::Deleted,
                undo: Action::Insert {
                    point: removed,
                    leaf: Some(LeafPayload::of(&node)),
                },
                removed: Some(removed),
            },
        )),
        Some((centroid, size)) => {
            node.centroid = centroid;
            node.size = size;
            if let Some(payload) = restore.filter(|_| node.is_single_point()) {
                node.point_id = payload.point_id.clone();
                node.source_data = strip_reserved(payload.source_data.clone());
            }
            Ok((
                Mutation::Set(node.to_document()?),
                Applied {
                    outcome: LevelOutcome::Updated(node),
                    undo: Action::Insert {
                        point: removed,
                        leaf: None,
                    },
                    removed: Some(removed),
                },
            ))
        }
    }
}

fn plan_shift(
    key: &str,
    current: Option<ClusterNode>,
    from: Option<&Coordinate>,
    to: &Coordinate,
    leaf: Option<&LeafPayload>,
) -> Result<(Mutation, Applied)> {
    let mut node = current.ok_or_else(|| ClusterError::PointNotFound(key.to_string()))?;
    let from = from.copied().unwrap_or(node.centroid);

    let mut restore = None;
    if node.is_single_point() {
        node.centroid = *to;
        if let Some(payload) = leaf {
            restore = Some(LeafPayload::of(&node));
            node.point_id = payload.point_id.clone();
            node.source_data = strip_reserved(payload.source_data.clone());
        }
    } else {
        node.centroid = on_shift(&node.centroid, node.size, &from, to);
    }

    Ok((
        Mutation::Set(node.to_document()?),
        Applied {
            outcome: LevelOutcome::Updated(node),
            undo: Action::Shift {
                from: Some(*to),
                to: from,
                leaf: restore,
            },
            removed: Some(from),
        },
    ))
}

/// One in-flight walk: report, compensation log and halt state.
pub(crate) struct Walk<'a, S: TransactionalStore + ?Sized> {
    index: &'a ClusterIndex<S>,
    report: WalkReport,
    /// (report position, inverse step) for every committed step
    undo_log: Vec<(usize, Step)>,
    halted: bool,
}

impl<'a, S: TransactionalStore + ?Sized> Walk<'a, S> {
    pub(crate) fn new(index: &'a ClusterIndex<S>, operation: Operation) -> Self {
        Self {
            index,
            report: WalkReport::new(operation),
            undo_log: Vec::new(),
            halted: false,
        }
    }

    pub(crate) fn is_halted(&self) -> bool {
        self.halted
    }

    /// Run one step. `Ok(None)` means the step did not commit (failed or
    /// skipped) and the failure policy allowed the walk to return normally.
    pub(crate) async fn step(&mut self, step: Step) -> Result<Option<Applied>> {
        if self.halted {
            self.report.push(step.level, &step.key, LevelOutcome::Skipped);
            return Ok(None);
        }

        match self.index.execute(&step).await {
            Ok(applied) => {
                log::debug!(
                    "{} committed level {} ({}): {:?}",
                    self.report.operation,
                    step.level,
                    step.key,
                    applied.outcome
                );
                let position = self
                    .report
                    .push(step.level, &step.key, applied.outcome.clone());
                self.undo_log.push((
                    position,
                    Step {
                        level: step.level,
                        key: step.key,
                        action: applied.undo.clone(),
                    },
                ));
                Ok(Some(applied))
            }
            Err(e) if e.is_retryable() => {
                log::warn!(
                    "{} failed at level {} ({}): {}",
                    self.report.operation,
                    step.level,
                    step.key,
                    e
                );
                self.report
                    .push(step.level, &step.key, LevelOutcome::Failed(e.to_string()));

                match self.index.config().failure_policy {
                    FailurePolicy::Continue => {}
                    FailurePolicy::Abort => self.halted = true,
                    FailurePolicy::Rollback => {
                        self.halted = true;
                        self.rollback().await;
                    }
                }
                Ok(None)
            }
            Err(e) => {
                if self.index.config().failure_policy == FailurePolicy::Rollback {
                    self.rollback().await;
                }
                Err(e)
            }
        }
    }

    /// Mark the remaining levels skipped; used when a walk cannot continue
    /// without a value an earlier level failed to produce.
    pub(crate) fn halt(&mut self) {
        self.halted = true;
    }

    /// Compensate committed steps, newest first.
    async fn rollback(&mut self) {
        if self.undo_log.is_empty() {
            return;
        }

        log::info!(
            "rolling back {} committed level(s) of {}",
            self.undo_log.len(),
            self.report.operation
        );

        while let Some((position, undo)) = self.undo_log.pop() {
            match self.index.execute(&undo).await {
                Ok(_) => {
                    self.report.levels[position].outcome = LevelOutcome::RolledBack;
                }
                Err(e) => {
                    log::error!(
                        "failed to compensate level {} ({}) of {}: {}",
                        undo.level,
                        undo.key,
                        self.report.operation,
                        e
                    );
                }
            }
        }
        self.report.rolled_back = true;
    }

    pub(crate) fn finish(self) -> WalkReport {
        self.report
    }
}
