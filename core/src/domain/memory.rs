//! TaskMemory record (spec §3, §4.9).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskMemoryStatus {
    #[default]
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMemoryRecord {
    pub task_id: String,
    pub description: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub files_modified: BTreeSet<String>,
    pub commands_executed: Vec<String>,
    pub errors: Vec<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    pub status: TaskMemoryStatus,
    pub created_at: i64,
    #[serde(default)]
    pub completed_at: Option<i64>,
}

impl TaskMemoryRecord {
    pub fn new(task_id: impl Into<String>, description: impl Into<String>, conversation_id: Option<String>, now: i64) -> Self {
        Self {
            task_id: task_id.into(),
            description: description.into(),
            conversation_id,
            files_modified: BTreeSet::new(),
            commands_executed: Vec::new(),
            errors: Vec::new(),
            outcome: None,
            status: TaskMemoryStatus::Active,
            created_at: now,
            completed_at: None,
        }
    }

    /// Full-text search over description, files, and commands.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.description.to_lowercase().contains(&q)
            || self.files_modified.iter().any(|f| f.to_lowercase().contains(&q))
            || self.commands_executed.iter().any(|c| c.to_lowercase().contains(&q))
    }
}
