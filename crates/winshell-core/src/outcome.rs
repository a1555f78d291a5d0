//! Per-item outcomes collected during a commit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::code::ResultCode;

/// Terminal state of one source item after a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemOutcome {
    /// The item was renamed, moved, or copied; carries the full path of the
    /// newly created item.
    NewPath(PathBuf),
    /// The item was sent to the Recycle Bin.
    Recycled,
    /// The item was permanently deleted.
    Deleted,
}

impl ItemOutcome {
    /// The new path, if this outcome produced one.
    pub fn new_path(&self) -> Option<&Path> {
        match self {
            Self::NewPath(path) => Some(path),
            _ => None,
        }
    }
}

/// Mapping from original source path to its terminal outcome.
///
/// Sources whose operation never completed (skipped, aborted, still pending
/// interactive resolution) are absent.
pub type OutcomeMap = HashMap<PathBuf, ItemOutcome>;

/// Result of a committed operation batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSummary {
    /// Per-item outcomes keyed by source path.
    pub outcomes: OutcomeMap,
    /// Whether any operation was aborted, by the user or by an unresolved
    /// error the engine chose to skip past.
    pub aborted: bool,
    /// The overall batch result code reported by the engine.
    pub code: ResultCode,
}

impl CommitSummary {
    /// The summary of a commit with nothing queued.
    pub fn empty() -> Self {
        Self {
            outcomes: OutcomeMap::new(),
            aborted: false,
            code: ResultCode::S_OK,
        }
    }

    /// Whether the batch completed without aborts and with a success code.
    pub fn is_success(&self) -> bool {
        !self.aborted && self.code.is_success()
    }

    /// Look up the outcome recorded for a source path.
    pub fn outcome_of(&self, source: impl AsRef<Path>) -> Option<&ItemOutcome> {
        self.outcomes.get(source.as_ref())
    }
}
