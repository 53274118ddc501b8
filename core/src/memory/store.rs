//! Task Memory (C9, spec §4.9). Write-only during EXECUTE, read-only after.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::memory::{TaskMemoryRecord, TaskMemoryStatus};

use super::persistence;

#[derive(Debug, Error)]
pub enum TaskMemoryError {
    #[error("unknown task id: {0}")]
    UnknownTask(String),
    #[error(transparent)]
    Persistence(#[from] persistence::MemoryPersistenceError),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskMemorySnapshot {
    pub tasks: Vec<TaskMemoryRecord>,
}

#[derive(Debug, Default)]
pub struct TaskMemory {
    tasks: HashMap<String, TaskMemoryRecord>,
}

impl TaskMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_task(&mut self, task_id: impl Into<String>, description: impl Into<String>, conversation_id: Option<String>, now: i64) -> &TaskMemoryRecord {
        let task_id = task_id.into();
        let record = TaskMemoryRecord::new(task_id.clone(), description, conversation_id, now);
        debug!(%task_id, "task memory: start_task");
        self.tasks.entry(task_id.clone()).or_insert(record);
        self.tasks.get(&task_id).unwrap()
    }

    pub fn record_file_modified(&mut self, task_id: &str, path: impl Into<String>) -> Result<(), TaskMemoryError> {
        let record = self.tasks.get_mut(task_id).ok_or_else(|| TaskMemoryError::UnknownTask(task_id.to_string()))?;
        record.files_modified.insert(path.into());
        Ok(())
    }

    pub fn record_command(&mut self, task_id: &str, command: impl Into<String>) -> Result<(), TaskMemoryError> {
        let record = self.tasks.get_mut(task_id).ok_or_else(|| TaskMemoryError::UnknownTask(task_id.to_string()))?;
        record.commands_executed.push(command.into());
        Ok(())
    }

    pub fn record_error(&mut self, task_id: &str, message: impl Into<String>) -> Result<(), TaskMemoryError> {
        let record = self.tasks.get_mut(task_id).ok_or_else(|| TaskMemoryError::UnknownTask(task_id.to_string()))?;
        record.errors.push(message.into());
        Ok(())
    }

    pub fn complete_task(&mut self, task_id: &str, outcome: Option<String>, now: i64) -> Result<(), TaskMemoryError> {
        let record = self.tasks.get_mut(task_id).ok_or_else(|| TaskMemoryError::UnknownTask(task_id.to_string()))?;
        record.status = TaskMemoryStatus::Completed;
        record.outcome = outcome;
        record.completed_at = Some(now);
        Ok(())
    }

    pub fn fail_task(&mut self, task_id: &str, message: impl Into<String>, now: i64) -> Result<(), TaskMemoryError> {
        let record = self.tasks.get_mut(task_id).ok_or_else(|| TaskMemoryError::UnknownTask(task_id.to_string()))?;
        record.errors.push(message.into());
        record.status = TaskMemoryStatus::Failed;
        record.completed_at = Some(now);
        Ok(())
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskMemoryRecord> {
        self.tasks.get(task_id)
    }

    pub fn by_status(&self, status: TaskMemoryStatus) -> Vec<&TaskMemoryRecord> {
        self.tasks.values().filter(|r| r.status == status).collect()
    }

    pub fn by_conversation(&self, conversation_id: &str) -> Vec<&TaskMemoryRecord> {
        self.tasks.values().filter(|r| r.conversation_id.as_deref() == Some(conversation_id)).collect()
    }

    pub fn by_file(&self, path: &str) -> Vec<&TaskMemoryRecord> {
        self.tasks.values().filter(|r| r.files_modified.contains(path)).collect()
    }

    pub fn search(&self, query: &str) -> Vec<&TaskMemoryRecord> {
        self.tasks.values().filter(|r| r.matches(query)).collect()
    }

    /// Removes completed/failed tasks whose `completed_at` predates `now - maxAgeDays`.
    pub fn cleanup(&mut self, max_age_days: i64, now: i64) -> usize {
        let cutoff = now - max_age_days * 86_400;
        let before = self.tasks.len();
        self.tasks.retain(|_, r| match (r.status, r.completed_at) {
            (TaskMemoryStatus::Active, _) => true,
            (_, Some(completed_at)) => completed_at >= cutoff,
            (_, None) => true,
        });
        before - self.tasks.len()
    }

    pub fn persist(&self, path: &Path) -> Result<(), TaskMemoryError> {
        let snapshot = TaskMemorySnapshot { tasks: self.tasks.values().cloned().collect() };
        persistence::save(path, &snapshot)?;
        Ok(())
    }

    pub fn restore(path: &Path) -> Result<Self, TaskMemoryError> {
        let snapshot = persistence::restore(path)?;
        let tasks = snapshot.tasks.into_iter().map(|r| (r.task_id.clone(), r)).collect();
        Ok(Self { tasks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn r2_record_file_modified_is_idempotent() {
        let mut mem = TaskMemory::new();
        mem.start_task("t1", "do thing", None, 0);
        mem.record_file_modified("t1", "src/lib.rs").unwrap();
        mem.record_file_modified("t1", "src/lib.rs").unwrap();
        assert_eq!(mem.get("t1").unwrap().files_modified.len(), 1);
    }

    #[test]
    fn complete_and_fail_freeze_status() {
        let mut mem = TaskMemory::new();
        mem.start_task("t1", "do thing", None, 0);
        mem.complete_task("t1", Some("done".into()), 10).unwrap();
        assert_eq!(mem.get("t1").unwrap().status, TaskMemoryStatus::Completed);
        assert_eq!(mem.get("t1").unwrap().completed_at, Some(10));
    }

    #[test]
    fn search_matches_across_fields() {
        let mut mem = TaskMemory::new();
        mem.start_task("t1", "refactor parser", None, 0);
        mem.record_command("t1", "cargo test").unwrap();
        assert_eq!(mem.search("parser").len(), 1);
        assert_eq!(mem.search("cargo").len(), 1);
        assert_eq!(mem.search("nonexistent").len(), 0);
    }

    #[test]
    fn cleanup_removes_only_old_completed_tasks() {
        let mut mem = TaskMemory::new();
        mem.start_task("old", "x", None, 0);
        mem.complete_task("old", None, 0).unwrap();
        mem.start_task("recent", "y", None, 0);
        mem.complete_task("recent", None, 100 * 86_400).unwrap();
        mem.start_task("active", "z", None, 0);

        let removed = mem.cleanup(30, 100 * 86_400);
        assert_eq!(removed, 1);
        assert!(mem.get("old").is_none());
        assert!(mem.get("recent").is_some());
        assert!(mem.get("active").is_some());
    }

    #[test]
    fn unknown_task_operations_error() {
        let mut mem = TaskMemory::new();
        assert!(mem.record_command("ghost", "ls").is_err());
    }
}
