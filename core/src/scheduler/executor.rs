//! Parallel Executor (C5, spec §4.5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::context::TaskContext;
use crate::domain::decomposition::TaskDecomposition;
use crate::domain::subtask::{SubtaskResult, SubtaskStatus};
use crate::executor_trait::{CancelSignal, SubtaskExecutor};

use super::queue::ScheduledSubtask;
use super::resolver::{self, ResolverConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub max_concurrency: usize,
    pub progress_interval_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { max_concurrency: 4, progress_interval_ms: 500 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub completed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub skipped: usize,
    pub total_elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutionTotals {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelExecutionResult {
    pub per_subtask_results: HashMap<String, SubtaskResult>,
    pub totals: ExecutionTotals,
    pub duration_ms: u64,
    pub max_concurrency_observed: usize,
}

/// Runs subtasks under `config.max_concurrency`, consulting the resolver
/// after every completion/failure, until `isComplete` holds.
pub async fn run(
    decomposition: &mut TaskDecomposition,
    task_context: &TaskContext,
    executor: Arc<dyn SubtaskExecutor>,
    config: &ExecutorConfig,
    resolver_config: &ResolverConfig,
    cancel: CancelSignal,
    mut on_progress: impl FnMut(ProgressEvent),
) -> ParallelExecutionResult {
    let started = Instant::now();
    let mut state = resolver::create_initial_state(decomposition);
    let mut results: HashMap<String, SubtaskResult> = HashMap::new();
    let mut can_continue = true;
    let mut max_concurrency_observed = 0usize;

    let graph = crate::domain::graph::DependencyGraph::build(&decomposition.subtasks);
    let on_critical_path: std::collections::HashSet<&String> = graph.critical_path.iter().collect();

    type InFlight = FuturesUnordered<std::pin::Pin<Box<dyn std::future::Future<Output = (String, SubtaskResult)> + Send>>>;
    let mut in_flight: InFlight = FuturesUnordered::new();

    loop {
        if !cancel.is_cancelled() && can_continue {
            let mut executable = resolver::get_next_executable(decomposition, &state);
            executable.retain(|id| !state.in_progress.contains(id));

            let mut candidates: Vec<ScheduledSubtask> = executable
                .into_iter()
                .filter_map(|id| {
                    decomposition.get(&id).map(|s| ScheduledSubtask { id: id.clone(), priority: s.priority, on_critical_path: on_critical_path.contains(&id) })
                })
                .collect();
            candidates.sort_by(|a, b| b.cmp(a));

            for candidate in candidates {
                if in_flight.len() >= config.max_concurrency {
                    break;
                }
                state.in_progress.insert(candidate.id.clone());
                if let Some(s) = decomposition.get_mut(&candidate.id) {
                    s.status = SubtaskStatus::InProgress;
                }

                let subtask = decomposition.get(&candidate.id).unwrap().clone();
                let ctx = task_context.clone();
                let exec = executor.clone();
                let cancel_clone = cancel.clone();

                in_flight.push(Box::pin(async move {
                    let result = exec.execute(&subtask, &ctx, &cancel_clone).await;
                    (subtask.id.clone(), result)
                }));
            }
        }

        max_concurrency_observed = max_concurrency_observed.max(in_flight.len());

        if in_flight.is_empty() {
            if resolver::is_complete(decomposition, &state) || !can_continue {
                break;
            }
            // Nothing launchable and nothing in flight: remaining subtasks are
            // unreachable (e.g. all their deps failed under CONTINUE policy).
            break;
        }

        // Suspension point (i): await subtask completion.
        let (id, result) = in_flight.select_next_some().await;

        results.insert(id.clone(), result.clone());
        if let Some(s) = decomposition.get_mut(&id) {
            s.result = Some(result.clone());
        }

        if result.success {
            if let Some(s) = decomposition.get_mut(&id) {
                s.status = SubtaskStatus::Completed;
            }
            resolver::handle_completion(decomposition, &id, &mut state);
            info!(subtask_id = %id, "subtask completed");
        } else {
            if let Some(s) = decomposition.get_mut(&id) {
                s.status = SubtaskStatus::Failed;
            }
            let outcome = resolver::handle_failure(decomposition, &id, &mut state, resolver_config);
            for skipped_id in &outcome.skipped {
                if let Some(s) = decomposition.get_mut(skipped_id) {
                    s.status = SubtaskStatus::Skipped;
                }
            }
            warn!(subtask_id = %id, "subtask failed");
            if !outcome.can_continue {
                can_continue = false;
            }
        }

        if cancel.is_cancelled() {
            for id in state.in_progress.clone() {
                executor.request_cancel(&id).await;
            }
        }

        on_progress(ProgressEvent {
            completed: state.completed.len(),
            failed: state.failed.len(),
            in_progress: state.in_progress.len(),
            pending: decomposition.subtasks.len() - state.resolved_count(),
            skipped: state.skipped.len(),
            total_elapsed_ms: started.elapsed().as_millis() as u64,
        });

        if resolver::is_complete(decomposition, &state) {
            break;
        }
        if cancel.is_cancelled() && state.in_progress.is_empty() {
            break;
        }
    }

    ParallelExecutionResult {
        totals: ExecutionTotals { completed: state.completed.len(), failed: state.failed.len(), skipped: state.skipped.len() },
        per_subtask_results: results,
        duration_ms: started.elapsed().as_millis() as u64,
        max_concurrency_observed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decomposition::PlanStatus;
    use crate::domain::priority::Priority;
    use crate::domain::subtask::{AcceptanceCriterion, EffortEstimate, EffortLevel, Subtask};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AlwaysSucceeds {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SubtaskExecutor for AlwaysSucceeds {
        async fn execute(&self, subtask: &crate::domain::subtask::Subtask, _ctx: &TaskContext, _cancel: &CancelSignal) -> SubtaskResult {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            SubtaskResult {
                success: true,
                output: None,
                error: None,
                duration_ms: 0,
                affected_files: subtask.files.clone(),
                commands_run: vec![],
            }
        }
    }

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

    #[tokio::test]
    async fn s1_happy_path_runs_to_completion() {
        let mut decomposition = TaskDecomposition {
            task_text: "t".into(),
            title: "t".into(),
            subtasks: vec![subtask("a", &[]), subtask("b", &["a"])],
            root_subtasks: vec!["a".into()],
            leaf_subtasks: vec!["b".into()],
            success_criteria: vec!["done".into()],
            risks: vec![],
            created_at: 0,
            plan_status: PlanStatus::Validated,
        };
        let ctx = TaskContext::new("t1", "desc", 3, 0);
        let executor = Arc::new(AlwaysSucceeds { in_flight: Arc::new(AtomicUsize::new(0)), peak: Arc::new(AtomicUsize::new(0)) });

        let result = run(
            &mut decomposition,
            &ctx,
            executor,
            &ExecutorConfig::default(),
            &ResolverConfig::default(),
            CancelSignal::new(),
            |_| {},
        )
        .await;

        assert_eq!(result.totals.completed, 2);
        assert_eq!(result.totals.failed, 0);
    }

    #[tokio::test]
    async fn b3_concurrency_cap_one_runs_sequentially() {
        let mut decomposition = TaskDecomposition {
            task_text: "t".into(),
            title: "t".into(),
            subtasks: vec![subtask("a", &[]), subtask("b", &[])],
            root_subtasks: vec!["a".into(), "b".into()],
            leaf_subtasks: vec!["a".into(), "b".into()],
            success_criteria: vec!["done".into()],
            risks: vec![],
            created_at: 0,
            plan_status: PlanStatus::Validated,
        };
        let ctx = TaskContext::new("t1", "desc", 3, 0);
        let peak = Arc::new(AtomicUsize::new(0));
        let executor = Arc::new(AlwaysSucceeds { in_flight: Arc::new(AtomicUsize::new(0)), peak: peak.clone() });

        let config = ExecutorConfig { max_concurrency: 1, progress_interval_ms: 500 };
        let result = run(&mut decomposition, &ctx, executor, &config, &ResolverConfig::default(), CancelSignal::new(), |_| {}).await;

        assert_eq!(result.totals.completed, 2);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
