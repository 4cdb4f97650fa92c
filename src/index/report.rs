//! Per-level outcome of a cluster walk.

use crate::error::{ClusterError, Result};
use crate::types::ClusterNode;
use std::fmt;

/// Walk kind, used in logs and in `PartialApplication` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Delete,
    Move,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Add => "add_point",
            Operation::Delete => "delete_point",
            Operation::Move => "move_point",
        };
        f.write_str(name)
    }
}

/// What happened to one key during a walk.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelOutcome {
    /// A new node was written
    Created(ClusterNode),
    /// An existing node was rewritten with this state
    Updated(ClusterNode),
    /// The node dropped to size 0 and was removed
    Deleted,
    /// The level's transaction failed after all retries
    Failed(String),
    /// The level committed and was compensated afterwards
    RolledBack,
    /// The walk stopped before reaching this level
    Skipped,
}

impl LevelOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(
            self,
            LevelOutcome::Created(_) | LevelOutcome::Updated(_) | LevelOutcome::Deleted
        )
    }

    pub fn node(&self) -> Option<&ClusterNode> {
        match self {
            LevelOutcome::Created(node) | LevelOutcome::Updated(node) => Some(node),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelReport {
    pub level: usize,
    pub key: String,
    pub outcome: LevelOutcome,
}

/// Ordered record of every transaction a walk attempted.
///
/// A move touches two keys on levels where the old and new cells differ, so
/// a level may appear more than once.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkReport {
    pub operation: Operation,
    pub levels: Vec<LevelReport>,
    /// Whether committed levels were compensated after a failure
    pub rolled_back: bool,
}

impl WalkReport {
    pub(crate) fn new(operation: Operation) -> Self {
        Self {
            operation,
            levels: Vec::new(),
            rolled_back: false,
        }
    }

    pub(crate) fn push(&mut self, level: usize, key: &str, outcome: LevelOutcome) -> usize {
        self.levels.push(LevelReport {
            level,
            key: key.to_string(),
            outcome,
        });
        self.levels.len() - 1
    }

    /// True when every attempted level committed.
    pub fn is_complete(&self) -> bool {
        self.levels.iter().all(|l| l.outcome.is_committed())
    }

    /// Levels whose transaction failed, in walk order.
    pub fn failed_levels(&self) -> Vec<usize> {
        self.levels
            .iter()
            .filter(|l| matches!(l.outcome, LevelOutcome::Failed(_)))
            .map(|l| l.level)
            .collect()
    }

    /// Number of transactions that committed and were not rolled back.
    pub fn committed_count(&self) -> usize {
        self.levels.iter().filter(|l| l.outcome.is_committed()).count()
    }

    /// Latest written node for `key`, if the walk wrote one.
    pub fn node(&self, key: &str) -> Option<&ClusterNode> {
        self.levels
            .iter()
            .rev()
            .find(|l| l.key == key)
            .and_then(|l| l.outcome.node())
    }

    /// Converts an incomplete walk into `ClusterError::PartialApplication`.
    pub fn into_result(self) -> Result<Self> {
        if self.is_complete() {
            return Ok(self);
        }

        let mut failed_levels = self.failed_levels();
        if failed_levels.is_empty() {
            failed_levels = self
                .levels
                .iter()
                .filter(|l| !l.outcome.is_committed())
                .map(|l| l.level)
                .collect();
        }

        Err(ClusterError::PartialApplication {
            operation: self.operation.to_string(),
            failed_levels,
        })
    }
}
