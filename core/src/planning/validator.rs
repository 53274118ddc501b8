//! Plan Validator (C3, spec §4.3).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::decomposition::TaskDecomposition;
use crate::domain::graph::DependencyGraph;
use crate::domain::subtask::SubtaskType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub max_subtasks: usize,
    pub max_dependency_depth: usize,
    pub min_completeness_score: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self { max_subtasks: 50, max_dependency_depth: 10, min_completeness_score: 0.6 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub completeness_score: f64,
    pub coverage: f64,
}

const STOP_WORDS: &[&str] =
    &["the", "a", "an", "and", "or", "but", "with", "that", "this", "for", "from", "into", "then", "than", "will", "shall"];

/// Runs the four checks from spec §4.3 and returns a combined report.
pub fn validate(decomposition: &TaskDecomposition, config: &ValidatorConfig) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    structural_checks(decomposition, config, &mut errors, &mut warnings);
    let graph = dependency_checks(decomposition, config, &mut errors, &mut warnings);
    per_subtask_checks(decomposition, &mut errors, &mut warnings);
    let coverage = completeness_checks(decomposition, &mut warnings);

    let score = completeness_score(decomposition, &errors, &warnings, &graph);
    let is_valid = errors.is_empty() && score >= config.min_completeness_score;

    ValidationReport { is_valid, errors, warnings, completeness_score: score, coverage }
}

fn structural_checks(decomposition: &TaskDecomposition, config: &ValidatorConfig, errors: &mut Vec<String>, _warnings: &mut [String]) {
    if decomposition.subtasks.is_empty() {
        errors.push("EMPTY_PLAN".to_string());
        return;
    }
    if decomposition.subtasks.iter().any(|s| s.title.trim().is_empty()) {
        errors.push("MISSING_TITLE".to_string());
    }
    if decomposition.success_criteria.is_empty() {
        errors.push("NO_SUCCESS_CRITERIA".to_string());
    }
    if decomposition.subtasks.len() > config.max_subtasks {
        errors.push(format!("TOO_MANY_SUBTASKS: {} > {}", decomposition.subtasks.len(), config.max_subtasks));
    }
}

fn dependency_checks(
    decomposition: &TaskDecomposition,
    config: &ValidatorConfig,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) -> DependencyGraph {
    let known_ids = decomposition.known_ids();

    for subtask in &decomposition.subtasks {
        if subtask.dependencies.contains(&subtask.id) {
            errors.push(format!("SELF_DEPENDENCY: {}", subtask.id));
        }
        for dep in &subtask.dependencies {
            if !known_ids.contains(dep) {
                errors.push(format!("UNKNOWN_DEPENDENCY: {} references {dep}", subtask.id));
            }
        }
    }

    let graph = DependencyGraph::build(&decomposition.subtasks);
    for cycle in &graph.cycles {
        errors.push(format!("CIRCULAR_DEPENDENCY: {}", cycle.join(" -> ")));
    }

    if graph.levels.len() > config.max_dependency_depth {
        warnings.push(format!("dependency depth {} exceeds {}", graph.levels.len(), config.max_dependency_depth));
    }

    graph
}

fn per_subtask_checks(decomposition: &TaskDecomposition, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let mut seen_ids: HashSet<&str> = HashSet::new();
    for subtask in &decomposition.subtasks {
        if !seen_ids.insert(&subtask.id) {
            errors.push(format!("DUPLICATE_ID: {}", subtask.id));
        }
        if subtask.title.trim().is_empty() {
            errors.push(format!("MISSING_TITLE: {}", subtask.id));
        }
        if subtask.description.trim().is_empty() {
            warnings.push(format!("missing description: {}", subtask.id));
        }
        if subtask.acceptance_criteria.is_empty() {
            warnings.push(format!("no acceptance criteria: {}", subtask.id));
        }
        if subtask.effort.confidence < 0.5 {
            warnings.push(format!("low-confidence estimate: {}", subtask.id));
        }
    }
}

fn completeness_checks(decomposition: &TaskDecomposition, warnings: &mut Vec<String>) -> f64 {
    let important_words = important_words(&decomposition.task_text);
    let subtask_text: String =
        decomposition.subtasks.iter().map(|s| format!("{} {}", s.title, s.description)).collect::<Vec<_>>().join(" ").to_lowercase();

    let covered = important_words.iter().filter(|w| subtask_text.contains(w.as_str())).count();
    let coverage = if important_words.is_empty() { 1.0 } else { covered as f64 / important_words.len() as f64 };

    if coverage < 0.7 {
        warnings.push("incomplete coverage".to_string());
    }

    let has_test = decomposition
        .subtasks
        .iter()
        .any(|s| matches!(s.subtask_type, SubtaskType::Test) || s.title.to_lowercase().contains("test"));
    if !has_test {
        warnings.push("no test-typed or test-titled subtask".to_string());
    }

    coverage
}

fn important_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 4 && !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

fn completeness_score(decomposition: &TaskDecomposition, errors: &[String], warnings: &[String], graph: &DependencyGraph) -> f64 {
    let _ = graph;
    if decomposition.subtasks.is_empty() {
        return 0.0;
    }

    let mut score: f64 = 1.0;
    score -= 0.15 * errors.len() as f64;
    score -= 0.05 * warnings.len() as f64;

    if !decomposition.subtasks.is_empty() {
        let mean_criteria =
            decomposition.subtasks.iter().map(|s| s.acceptance_criteria.len()).sum::<usize>() as f64 / decomposition.subtasks.len() as f64;
        if mean_criteria >= 2.0 {
            score += 0.05;
        }
    }

    let has_tests = decomposition.subtasks.iter().any(|s| matches!(s.subtask_type, SubtaskType::Test));
    if has_tests {
        score += 0.05;
    }

    let has_docs = decomposition.subtasks.iter().any(|s| matches!(s.subtask_type, SubtaskType::Documentation));
    if has_docs {
        score += 0.02;
    }

    let has_files = decomposition.subtasks.iter().any(|s| !s.files.is_empty());
    if !has_files {
        score -= 0.10;
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decomposition::PlanStatus;
    use crate::domain::priority::Priority;
    use crate::domain::subtask::{AcceptanceCriterion, EffortEstimate, EffortLevel, Subtask, SubtaskStatus};

    fn empty_decomposition() -> TaskDecomposition {
        TaskDecomposition {
            task_text: "do something".to_string(),
            title: "do something".to_string(),
            subtasks: vec![],
            root_subtasks: vec![],
            leaf_subtasks: vec![],
            success_criteria: vec![],
            risks: vec![],
            created_at: 0,
            plan_status: PlanStatus::Draft,
        }
    }

    fn subtask(id: &str, deps: &[&str]) -> Subtask {
        Subtask {
            id: id.to_string(),
            title: format!("title-{id}"),
            description: "a description long enough to pass checks".to_string(),
            subtask_type: SubtaskType::Code,
            priority: Priority::P1,
            status: SubtaskStatus::Pending,
            dependencies: deps.iter().map(|s| s.to_string()).collect(),
            files: vec!["a.rs".to_string()],
            acceptance_criteria: vec![AcceptanceCriterion::manual("works")],
            effort: EffortEstimate::new(EffortLevel::Small),
            result: None,
        }
    }

    #[test]
    fn b1_empty_plan_emits_empty_plan_error_and_zero_score() {
        let decomposition = empty_decomposition();
        let report = validate(&decomposition, &ValidatorConfig::default());
        assert!(report.errors.contains(&"EMPTY_PLAN".to_string()));
        assert_eq!(report.completeness_score, 0.0);
        assert!(!report.is_valid);
    }

    #[test]
    fn b2_self_dependency_emits_error() {
        let mut decomposition = empty_decomposition();
        decomposition.subtasks = vec![subtask("a", &["a"])];
        decomposition.success_criteria = vec!["done".to_string()];
        let report = validate(&decomposition, &ValidatorConfig::default());
        assert!(report.errors.iter().any(|e| e.starts_with("SELF_DEPENDENCY")));
    }

    #[test]
    fn s4_cycle_emits_one_circular_dependency_per_cycle() {
        let mut decomposition = empty_decomposition();
        decomposition.subtasks = vec![subtask("a", &["b"]), subtask("b", &["a"])];
        decomposition.success_criteria = vec!["done".to_string()];
        let report = validate(&decomposition, &ValidatorConfig::default());
        assert_eq!(report.errors.iter().filter(|e| e.starts_with("CIRCULAR_DEPENDENCY")).count(), 1);
        assert!(!report.is_valid);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut decomposition = empty_decomposition();
        decomposition.subtasks = vec![subtask("a", &[]), subtask("a", &[])];
        decomposition.success_criteria = vec!["done".to_string()];
        let report = validate(&decomposition, &ValidatorConfig::default());
        assert!(report.errors.iter().any(|e| e.starts_with("DUPLICATE_ID")));
    }
}
