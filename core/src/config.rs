//! Ambient configuration surface: one struct per component (spec §6).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::domain::execution::FailurePolicy;
use crate::state::SupervisorState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default)]
    pub state_timeouts: HashMap<SupervisorState, u64>,
    #[serde(default)]
    pub enable_persistence: bool,
    #[serde(default = "default_supervisor_persistence_path")]
    pub persistence_path: PathBuf,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_supervisor_persistence_path() -> PathBuf {
    PathBuf::from("supervisor_snapshot.json")
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            state_timeouts: HashMap::new(),
            enable_persistence: false,
            persistence_path: default_supervisor_persistence_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_max_subtasks")]
    pub max_subtasks: usize,
    #[serde(default = "default_max_dependency_depth")]
    pub max_dependency_depth: usize,
    #[serde(default = "default_min_completeness_score")]
    pub min_completeness_score: f64,
}

fn default_max_subtasks() -> usize {
    50
}
fn default_max_dependency_depth() -> usize {
    10
}
fn default_min_completeness_score() -> f64 {
    0.6
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_subtasks: default_max_subtasks(),
            max_dependency_depth: default_max_dependency_depth(),
            min_completeness_score: default_min_completeness_score(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfigSurface {
    #[serde(default)]
    pub failure_mode: FailurePolicy,
    #[serde(default = "default_retry_budget")]
    pub per_subtask_retry_budget: u32,
}

fn default_retry_budget() -> u32 {
    1
}

impl Default for ResolverConfigSurface {
    fn default() -> Self {
        Self { failure_mode: FailurePolicy::default(), per_subtask_retry_budget: default_retry_budget() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfigSurface {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
}

fn default_max_concurrency() -> usize {
    4
}
fn default_progress_interval_ms() -> u64 {
    500
}

impl Default for ExecutorConfigSurface {
    fn default() -> Self {
        Self { max_concurrency: default_max_concurrency(), progress_interval_ms: default_progress_interval_ms() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfigSurface {
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub run_syntax_checks: bool,
    #[serde(default)]
    pub type_check_command: Option<String>,
    #[serde(default)]
    pub lint_command: Option<String>,
    #[serde(default)]
    pub test_command: Option<String>,
}

fn default_command_timeout_ms() -> u64 {
    30_000
}
fn default_true() -> bool {
    true
}

impl Default for VerifierConfigSurface {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_command_timeout_ms(),
            run_syntax_checks: true,
            type_check_command: None,
            lint_command: None,
            test_command: None,
        }
    }
}

/// Aggregates one configuration struct per component, loaded as a single
/// layered YAML document (mirrors the context store's `Config::load`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RalphConfig {
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub resolver: ResolverConfigSurface,
    #[serde(default)]
    pub executor: ExecutorConfigSurface,
    #[serde(default)]
    pub verifier: VerifierConfigSurface,
    #[serde(default)]
    pub context: contextstore::Config,
}

impl RalphConfig {
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let content = std::fs::read_to_string(path)?;
            return Ok(serde_yaml::from_str(&content)?);
        }

        let default_paths = [dirs::config_dir().map(|p| p.join("ralph").join("config.yml")), Some(PathBuf::from("ralph.yml"))];
        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                return Ok(serde_yaml::from_str(&content)?);
            }
        }

        Ok(Self::default())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_yaml() {
        let cfg = RalphConfig::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: RalphConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.supervisor.max_iterations, cfg.supervisor.max_iterations);
        assert_eq!(parsed.executor.max_concurrency, cfg.executor.max_concurrency);
    }
}
