//! ExecutionState and resolver-facing types (spec §3, §4.4).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Four disjoint id sets over the subtasks of one decomposition. `pending` is
/// the implicit complement and is not stored (spec §3 invariant).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionState {
    pub completed: HashSet<String>,
    pub failed: HashSet<String>,
    pub in_progress: HashSet<String>,
    pub skipped: HashSet<String>,
    /// Per-subtask retry counts under the RETRY failure policy.
    #[serde(default)]
    pub retry_counts: std::collections::HashMap<String, u32>,
}

impl ExecutionState {
    pub fn is_pending(&self, id: &str) -> bool {
        !self.completed.contains(id) && !self.failed.contains(id) && !self.in_progress.contains(id) && !self.skipped.contains(id)
    }

    /// Invariant I2: the four sets are pairwise disjoint.
    pub fn is_consistent(&self) -> bool {
        let sets = [&self.completed, &self.failed, &self.in_progress, &self.skipped];
        for i in 0..sets.len() {
            for j in (i + 1)..sets.len() {
                if !sets[i].is_disjoint(sets[j]) {
                    return false;
                }
            }
        }
        true
    }

    pub fn resolved_count(&self) -> usize {
        self.completed.len() + self.failed.len() + self.in_progress.len() + self.skipped.len()
    }
}

/// Failure containment policy (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailurePolicy {
    Continue,
    #[default]
    SkipDependents,
    Retry,
    Abort,
}

/// Returned by `handleFailure` (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureOutcome {
    pub can_continue: bool,
    pub skipped: Vec<String>,
}

/// Pre-execution plan summary (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub has_unresolvable: bool,
    pub cycles: Vec<Vec<String>>,
    pub order: Vec<String>,
    pub parallel_groups: Vec<Vec<String>>,
    pub critical_path: Vec<String>,
}
