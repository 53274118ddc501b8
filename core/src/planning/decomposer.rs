//! Task Planner (C2, spec §4.2).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::decomposition::{PlanStatus, TaskDecomposition};
use crate::domain::id::generate_id;
use crate::domain::subtask::{AcceptanceCriterion, Subtask, SubtaskStatus, SubtaskType, VerificationMethod};

use super::effort::{self, EffortInputs};

/// A subtask template prior to id assignment and dependency resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskTemplate {
    pub title: String,
    pub description: String,
    pub subtask_type: SubtaskType,
    /// Titles of subtasks this one depends on, resolved to ids during planning.
    #[serde(default)]
    pub depends_on_titles: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionRequest {
    pub task_text: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub preferred_order: Vec<String>,
    #[serde(default)]
    pub max_subtasks: Option<usize>,
    #[serde(default)]
    pub success_criteria: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    #[error("unknown dependency title '{0}' referenced by subtask '{1}'")]
    UnknownDependencyTitle(String, String),
}

/// Builds a [`TaskDecomposition`] from a request and a sequence of templates.
/// Never calls a remote model directly: model-assisted decomposition is an
/// optional upstream step that simply produces templates. Output is
/// deterministic given its inputs.
pub fn decompose(request: &DecompositionRequest, templates: Vec<SubtaskTemplate>, now: i64) -> Result<TaskDecomposition, PlanningError> {
    info!(task = %request.task_text, count = templates.len(), "decomposing task");

    let title_to_id: HashMap<String, String> =
        templates.iter().enumerate().map(|(idx, t)| (t.title.clone(), generate_id("task", idx, &t.title))).collect();

    let mut subtasks = Vec::with_capacity(templates.len());
    for (idx, template) in templates.iter().enumerate() {
        let id = generate_id("task", idx, &template.title);

        let mut dependencies = Vec::with_capacity(template.depends_on_titles.len());
        for dep_title in &template.depends_on_titles {
            let dep_id = title_to_id
                .get(dep_title)
                .ok_or_else(|| PlanningError::UnknownDependencyTitle(dep_title.clone(), template.title.clone()))?;
            dependencies.push(dep_id.clone());
        }

        let mentions_tests = template.description.to_lowercase().contains("test")
            || matches!(template.subtask_type, SubtaskType::Test)
            || template.title.to_lowercase().contains("test");

        let effort = effort::estimate(&EffortInputs {
            description: &template.description,
            file_count: template.files.len(),
            subtask_type: template.subtask_type,
            mentions_tests,
            has_files: !template.files.is_empty(),
            has_acceptance_criteria: !template.acceptance_criteria.is_empty(),
        });

        let acceptance_criteria = if template.acceptance_criteria.is_empty() {
            heuristic_acceptance_criteria(template)
        } else {
            template.acceptance_criteria.iter().map(|d| AcceptanceCriterion::manual(d.clone())).collect()
        };

        subtasks.push(Subtask {
            id,
            title: template.title.clone(),
            description: template.description.clone(),
            subtask_type: template.subtask_type,
            priority: Default::default(),
            status: SubtaskStatus::Pending,
            dependencies,
            files: template.files.clone(),
            acceptance_criteria,
            effort,
            result: None,
        });
    }

    let mut decomposition = TaskDecomposition {
        task_text: request.task_text.clone(),
        title: derive_title(&request.task_text),
        subtasks,
        root_subtasks: Vec::new(),
        leaf_subtasks: Vec::new(),
        success_criteria: Vec::new(),
        risks: Vec::new(),
        created_at: now,
        plan_status: PlanStatus::Draft,
    };

    decomposition.recompute_roots_and_leaves();
    decomposition.success_criteria = derive_success_criteria(&decomposition, &request.success_criteria);
    decomposition.risks = derive_risks(&decomposition);

    Ok(decomposition)
}

fn derive_title(task_text: &str) -> String {
    let first_line = task_text.lines().next().unwrap_or(task_text);
    first_line.chars().take(80).collect()
}

/// Heuristic acceptance criteria so every subtask has at least one (spec §4.2 step 4).
fn heuristic_acceptance_criteria(template: &SubtaskTemplate) -> Vec<AcceptanceCriterion> {
    let mut criteria = vec![AcceptanceCriterion {
        description: "The described change compiles".to_string(),
        verification_method: VerificationMethod::Automated,
        required: true,
        file: template.files.first().cloned(),
        expected_pattern: None,
        command: None,
    }];

    if matches!(template.subtask_type, SubtaskType::Test) || template.description.to_lowercase().contains("test") {
        criteria.push(AcceptanceCriterion {
            description: "Tests mentioned in description pass".to_string(),
            verification_method: VerificationMethod::Command,
            required: true,
            file: None,
            expected_pattern: None,
            command: None,
        });
    }

    criteria
}

/// Union of subtask acceptance criteria descriptions plus explicit goal-level ones.
fn derive_success_criteria(decomposition: &TaskDecomposition, explicit: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut criteria = Vec::new();

    for c in explicit {
        if seen.insert(c.clone()) {
            criteria.push(c.clone());
        }
    }
    for subtask in &decomposition.subtasks {
        for criterion in &subtask.acceptance_criteria {
            if seen.insert(criterion.description.clone()) {
                criteria.push(criterion.description.clone());
            }
        }
    }
    criteria
}

/// Heuristic risk flags: deep dependency chains, heavy fan-in, and low-confidence estimates.
fn derive_risks(decomposition: &TaskDecomposition) -> Vec<String> {
    let mut risks = Vec::new();

    if decomposition.subtasks.iter().any(|s| s.dependencies.len() >= 3) {
        risks.push("high number of dependencies".to_string());
    }

    let graph = crate::domain::graph::DependencyGraph::build(&decomposition.subtasks);
    if graph.levels.len() >= 4 {
        risks.push("deep chain".to_string());
    }

    if decomposition.subtasks.iter().any(|s| s.effort.confidence < 0.6) {
        risks.push("low-confidence estimates".to_string());
    }

    risks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(title: &str, deps: &[&str]) -> SubtaskTemplate {
        SubtaskTemplate {
            title: title.to_string(),
            description: format!("Implement {title}"),
            subtask_type: SubtaskType::Code,
            depends_on_titles: deps.iter().map(|s| s.to_string()).collect(),
            files: vec![format!("{title}.rs")],
            acceptance_criteria: vec![],
        }
    }

    #[test]
    fn resolves_dependency_titles_to_ids() {
        let templates = vec![template("write hello", &[]), template("test hello", &["write hello"])];
        let request = DecompositionRequest {
            task_text: "Add a hello function and a test".to_string(),
            constraints: vec![],
            preferred_order: vec![],
            max_subtasks: None,
            success_criteria: vec![],
        };

        let decomposition = decompose(&request, templates, 0).unwrap();
        assert_eq!(decomposition.subtasks.len(), 2);
        let second = &decomposition.subtasks[1];
        assert_eq!(second.dependencies, vec![decomposition.subtasks[0].id.clone()]);
    }

    #[test]
    fn unknown_dependency_title_is_a_validation_error() {
        let templates = vec![template("write hello", &["does not exist"])];
        let request = DecompositionRequest {
            task_text: "Add a hello function".to_string(),
            constraints: vec![],
            preferred_order: vec![],
            max_subtasks: None,
            success_criteria: vec![],
        };
        assert!(decompose(&request, templates, 0).is_err());
    }

    #[test]
    fn every_subtask_gets_at_least_one_acceptance_criterion() {
        let templates = vec![template("write hello", &[])];
        let request = DecompositionRequest {
            task_text: "Add a hello function".to_string(),
            constraints: vec![],
            preferred_order: vec![],
            max_subtasks: None,
            success_criteria: vec![],
        };
        let decomposition = decompose(&request, templates, 0).unwrap();
        assert!(!decomposition.subtasks[0].acceptance_criteria.is_empty());
    }

    #[test]
    fn decomposition_is_deterministic_given_same_inputs() {
        let request = DecompositionRequest {
            task_text: "Add a hello function".to_string(),
            constraints: vec![],
            preferred_order: vec![],
            max_subtasks: None,
            success_criteria: vec![],
        };
        let templates = vec![template("write hello", &[])];
        let a = decompose(&request, templates.clone(), 0).unwrap();
        let b = decompose(&request, templates, 0).unwrap();
        assert_eq!(a.subtasks[0].id, b.subtasks[0].id);
    }
}
