//! Dependency Resolver (C4, spec §4.4). Stateless over `(decomposition, state)`.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::domain::decomposition::TaskDecomposition;
use crate::domain::execution::{ExecutionState, FailureOutcome, FailurePolicy, ResolutionResult};
use crate::domain::graph::DependencyGraph;
use crate::domain::subtask::SubtaskStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub failure_mode: FailurePolicy,
    pub per_subtask_retry_budget: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { failure_mode: FailurePolicy::SkipDependents, per_subtask_retry_budget: 1 }
    }
}

/// Builds state sets from the subtasks' current statuses.
pub fn create_initial_state(decomposition: &TaskDecomposition) -> ExecutionState {
    let mut state = ExecutionState::default();
    for subtask in &decomposition.subtasks {
        match subtask.status {
            SubtaskStatus::Completed => {
                state.completed.insert(subtask.id.clone());
            }
            SubtaskStatus::Failed => {
                state.failed.insert(subtask.id.clone());
            }
            SubtaskStatus::InProgress => {
                state.in_progress.insert(subtask.id.clone());
            }
            SubtaskStatus::Skipped | SubtaskStatus::Blocked => {
                state.skipped.insert(subtask.id.clone());
            }
            SubtaskStatus::Pending => {}
        }
    }
    state
}

/// Ids whose status is pending, whose every dependency is completed, and
/// that are not already in-progress (spec §4.4, invariant I3).
pub fn get_next_executable(decomposition: &TaskDecomposition, state: &ExecutionState) -> Vec<String> {
    decomposition
        .subtasks
        .iter()
        .filter(|s| state.is_pending(&s.id) && !state.in_progress.contains(&s.id))
        .filter(|s| s.dependencies.iter().all(|d| state.completed.contains(d)))
        .map(|s| s.id.clone())
        .collect()
}

/// Moves `id` from in-progress to completed and returns the newly executable set.
pub fn handle_completion(decomposition: &TaskDecomposition, id: &str, state: &mut ExecutionState) -> Vec<String> {
    state.in_progress.remove(id);
    state.completed.insert(id.to_string());
    get_next_executable(decomposition, state)
}

/// Moves `id` to failed and applies the configured policy.
pub fn handle_failure(decomposition: &TaskDecomposition, id: &str, state: &mut ExecutionState, config: &ResolverConfig) -> FailureOutcome {
    state.in_progress.remove(id);

    match config.failure_mode {
        FailurePolicy::Continue => {
            state.failed.insert(id.to_string());
            FailureOutcome { can_continue: true, skipped: Vec::new() }
        }
        FailurePolicy::Abort => {
            state.failed.insert(id.to_string());
            FailureOutcome { can_continue: false, skipped: Vec::new() }
        }
        FailurePolicy::Retry => {
            let attempts = state.retry_counts.entry(id.to_string()).or_insert(0);
            *attempts += 1;
            if *attempts <= config.per_subtask_retry_budget {
                // Back to pending, not failed: the resolver will offer it again.
                FailureOutcome { can_continue: true, skipped: Vec::new() }
            } else {
                state.failed.insert(id.to_string());
                let skipped = skip_dependents(decomposition, id, state);
                FailureOutcome { can_continue: true, skipped }
            }
        }
        FailurePolicy::SkipDependents => {
            state.failed.insert(id.to_string());
            let skipped = skip_dependents(decomposition, id, state);
            FailureOutcome { can_continue: true, skipped }
        }
    }
}

/// Transitively marks every downstream subtask as `skipped` (spec I4).
fn skip_dependents(decomposition: &TaskDecomposition, failed_id: &str, state: &mut ExecutionState) -> Vec<String> {
    let graph = DependencyGraph::build(&decomposition.subtasks);
    let mut skipped = Vec::new();
    let mut queue: VecDeque<String> = graph.forward.get(failed_id).cloned().unwrap_or_default().into();
    let mut visited: HashSet<String> = HashSet::new();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id.clone()) {
            continue;
        }
        if state.completed.contains(&id) || state.failed.contains(&id) {
            continue;
        }
        state.skipped.insert(id.clone());
        skipped.push(id.clone());
        for next in graph.forward.get(&id).cloned().unwrap_or_default() {
            queue.push_back(next);
        }
    }

    skipped
}

/// True when every subtask is in one of {completed, failed, skipped}.
pub fn is_complete(decomposition: &TaskDecomposition, state: &ExecutionState) -> bool {
    decomposition
        .subtasks
        .iter()
        .all(|s| state.completed.contains(&s.id) || state.failed.contains(&s.id) || state.skipped.contains(&s.id))
}

/// Pre-execution resolution summary (spec §4.4).
pub fn resolve(decomposition: &TaskDecomposition) -> ResolutionResult {
    let graph = DependencyGraph::build(&decomposition.subtasks);
    ResolutionResult {
        has_unresolvable: graph.has_cycles,
        cycles: graph.cycles.clone(),
        order: graph.topological_order(),
        parallel_groups: graph.parallel_groups(),
        critical_path: graph.critical_path.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decomposition::PlanStatus;
    use crate::domain::priority::Priority;
    use crate::domain::subtask::{AcceptanceCriterion, EffortEstimate, EffortLevel, Subtask};

    fn subtask(id: &str, deps: &[&str]) -> Subtask {
        Subtask {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            subtask_type: crate::domain::subtask::SubtaskType::Code,
            priority: Priority::P1,
            status: SubtaskStatus::Pending,
            dependencies: deps.iter().map(|s| s.to_string()).collect(),
            files: vec![],
            acceptance_criteria: vec![AcceptanceCriterion::manual("x")],
            effort: EffortEstimate::new(EffortLevel::Small),
            result: None,
        }
    }

    fn chain_a_b_c() -> TaskDecomposition {
        TaskDecomposition {
            task_text: "chain".into(),
            title: "chain".into(),
            subtasks: vec![subtask("a", &[]), subtask("b", &["a"]), subtask("c", &["b"])],
            root_subtasks: vec!["a".into()],
            leaf_subtasks: vec!["c".into()],
            success_criteria: vec!["done".into()],
            risks: vec![],
            created_at: 0,
            plan_status: PlanStatus::Validated,
        }
    }

    #[test]
    fn i3_next_executable_never_includes_unready_dependents() {
        let decomposition = chain_a_b_c();
        let state = create_initial_state(&decomposition);
        let next = get_next_executable(&decomposition, &state);
        assert_eq!(next, vec!["a".to_string()]);
    }

    #[test]
    fn s5_skip_dependents_marks_transitive_downstream_as_skipped() {
        let decomposition = chain_a_b_c();
        let mut state = create_initial_state(&decomposition);
        state.in_progress.insert("a".to_string());
        let next = handle_completion(&decomposition, "a", &mut state);
        assert_eq!(next, vec!["b".to_string()]);

        state.in_progress.insert("b".to_string());
        let config = ResolverConfig::default();
        let outcome = handle_failure(&decomposition, "b", &mut state, &config);
        assert!(outcome.can_continue);
        assert!(state.skipped.contains("c"));
        assert!(is_complete(&decomposition, &state));
    }

    #[test]
    fn abort_policy_stops_scheduling() {
        let decomposition = chain_a_b_c();
        let mut state = create_initial_state(&decomposition);
        state.in_progress.insert("a".to_string());
        let config = ResolverConfig { failure_mode: FailurePolicy::Abort, ..Default::default() };
        let outcome = handle_failure(&decomposition, "a", &mut state, &config);
        assert!(!outcome.can_continue);
    }

    #[test]
    fn retry_policy_exhausts_budget_then_falls_through_to_skip_dependents() {
        let decomposition = chain_a_b_c();
        let mut state = create_initial_state(&decomposition);
        let config = ResolverConfig { failure_mode: FailurePolicy::Retry, per_subtask_retry_budget: 1 };

        state.in_progress.insert("a".to_string());
        let first = handle_failure(&decomposition, "a", &mut state, &config);
        assert!(first.skipped.is_empty());
        assert!(!state.failed.contains("a"));

        state.in_progress.insert("a".to_string());
        let second = handle_failure(&decomposition, "a", &mut state, &config);
        assert!(state.failed.contains("a"));
        assert!(second.skipped.contains(&"b".to_string()));
    }

    #[test]
    fn resolve_reports_cycles_as_unresolvable() {
        let decomposition = TaskDecomposition {
            task_text: "cycle".into(),
            title: "cycle".into(),
            subtasks: vec![subtask("a", &["b"]), subtask("b", &["a"])],
            root_subtasks: vec![],
            leaf_subtasks: vec![],
            success_criteria: vec!["done".into()],
            risks: vec![],
            created_at: 0,
            plan_status: PlanStatus::Draft,
        };
        let result = resolve(&decomposition);
        assert!(result.has_unresolvable);
        assert_eq!(result.cycles.len(), 1);
    }
}
