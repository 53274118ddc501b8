//! Subtask and its supporting types (spec §3 Subtask).

use serde::{Deserialize, Serialize};

use super::priority::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskType {
    Code,
    File,
    Test,
    Documentation,
    Refactor,
    Research,
    Other,
}

impl std::fmt::Display for SubtaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code => write!(f, "code"),
            Self::File => write!(f, "file"),
            Self::Test => write!(f, "test"),
            Self::Documentation => write!(f, "documentation"),
            Self::Refactor => write!(f, "refactor"),
            Self::Research => write!(f, "research"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Status of a subtask. `Blocked` is a transient label assigned by the
/// resolver when a dependency failed under the SKIP_DEPENDENTS policy — it is
/// never a starting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
    Blocked,
}

impl std::fmt::Display for SubtaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortLevel {
    Trivial,
    Small,
    Medium,
    Large,
    Epic,
}

impl EffortLevel {
    /// Midpoint hours per level, used by the critical-path computation.
    pub fn hours(self) -> f64 {
        match self {
            Self::Trivial => 0.25,
            Self::Small => 1.0,
            Self::Medium => 4.0,
            Self::Large => 16.0,
            Self::Epic => 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffortEstimate {
    pub level: EffortLevel,
    pub hours: f64,
    pub confidence: f64,
}

impl EffortEstimate {
    pub fn new(level: EffortLevel) -> Self {
        Self { hours: level.hours(), level, confidence: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    Manual,
    Automated,
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptanceCriterion {
    pub description: String,
    pub verification_method: VerificationMethod,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub expected_pattern: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
}

impl AcceptanceCriterion {
    pub fn manual(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            verification_method: VerificationMethod::Manual,
            required: false,
            file: None,
            expected_pattern: None,
            command: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskResult {
    pub success: bool,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub duration_ms: u64,
    #[serde(default)]
    pub affected_files: Vec<String>,
    #[serde(default)]
    pub commands_run: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub subtask_type: SubtaskType,
    pub priority: Priority,
    pub status: SubtaskStatus,
    pub dependencies: Vec<String>,
    pub files: Vec<String>,
    pub acceptance_criteria: Vec<AcceptanceCriterion>,
    pub effort: EffortEstimate,
    #[serde(default)]
    pub result: Option<SubtaskResult>,
}

impl Subtask {
    /// True when every invariant in spec §3 holds with respect to `known_ids`.
    pub fn validate_against(&self, known_ids: &std::collections::HashSet<String>) -> Vec<String> {
        let mut errors = Vec::new();
        if self.dependencies.iter().any(|d| d == &self.id) {
            errors.push(format!("subtask {} depends on itself", self.id));
        }
        for dep in &self.dependencies {
            if !known_ids.contains(dep) {
                errors.push(format!("subtask {} references unknown dependency {dep}", self.id));
            }
        }
        errors
    }
}
