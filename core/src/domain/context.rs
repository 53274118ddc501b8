//! TaskContext (supervisor-owned; spec §3).

use serde::{Deserialize, Serialize};

use super::decomposition::TaskDecomposition;
use super::verification::VerificationReport;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskContext {
    // NOTE: Clone is required so a snapshot can be handed to each spawned
    // subtask execution without borrowing the supervisor's own copy.
    pub task_id: String,
    pub description: String,
    pub iteration: u32,
    pub max_iterations: u32,
    pub started_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub plan: Option<TaskDecomposition>,
    #[serde(default)]
    pub execution_results: Option<serde_json::Value>,
    #[serde(default)]
    pub verification: Option<VerificationReport>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskContext {
    pub fn new(task_id: impl Into<String>, description: impl Into<String>, max_iterations: u32, now: i64) -> Self {
        Self {
            task_id: task_id.into(),
            description: description.into(),
            iteration: 0,
            max_iterations,
            started_at: now,
            updated_at: now,
            plan: None,
            execution_results: None,
            verification: None,
            error: None,
        }
    }

    pub fn at_iteration_budget(&self) -> bool {
        self.iteration >= self.max_iterations
    }
}
