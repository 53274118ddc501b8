//! TaskDecomposition (spec §3).

use serde::{Deserialize, Serialize};

use super::subtask::Subtask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Draft,
    Validated,
    Executing,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDecomposition {
    pub task_text: String,
    pub title: String,
    pub subtasks: Vec<Subtask>,
    pub root_subtasks: Vec<String>,
    pub leaf_subtasks: Vec<String>,
    pub success_criteria: Vec<String>,
    pub risks: Vec<String>,
    pub created_at: i64,
    pub plan_status: PlanStatus,
}

impl TaskDecomposition {
    pub fn get(&self, id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| s.id == id)
    }

    pub fn known_ids(&self) -> std::collections::HashSet<String> {
        self.subtasks.iter().map(|s| s.id.clone()).collect()
    }

    /// Recompute `root_subtasks`/`leaf_subtasks` from the current dependency edges.
    pub fn recompute_roots_and_leaves(&mut self) {
        let ids = self.known_ids();
        let has_dependent: std::collections::HashSet<String> =
            self.subtasks.iter().flat_map(|s| s.dependencies.iter().cloned()).collect();

        self.root_subtasks = self.subtasks.iter().filter(|s| s.dependencies.is_empty()).map(|s| s.id.clone()).collect();
        self.leaf_subtasks =
            self.subtasks.iter().filter(|s| !has_dependent.contains(&s.id) && ids.contains(&s.id)).map(|s| s.id.clone()).collect();
    }
}
