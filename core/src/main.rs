use std::io::Read as _;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use ralph_core::cli::{Cli, Command};
use ralph_core::config::RalphConfig;
use ralph_core::domain::context::TaskContext;
use ralph_core::domain::subtask::{Subtask, SubtaskResult};
use ralph_core::executor_trait::{CancelSignal, SubtaskExecutor};
use ralph_core::planning::decomposer::{self, DecompositionRequest, SubtaskTemplate};
use ralph_core::planning::validator;
use ralph_core::scheduler::{executor, resolver::ResolverConfig};
use ralph_core::state::{SupervisorState, SupervisorStateMachine};
use ralph_core::verify;

fn setup_logging() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("ralph=info".parse().unwrap())).init();
}

fn read_task_text(path: &Option<std::path::PathBuf>) -> Result<String> {
    if let Some(path) = path {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    } else {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
        Ok(buf)
    }
}

/// Demo executor that marks every subtask successful without touching the
/// filesystem or calling an LM. Stands in for an integrator-supplied
/// `SubtaskExecutor` when running `ralph run` without one configured.
struct NoopExecutor;

#[async_trait]
impl SubtaskExecutor for NoopExecutor {
    async fn execute(&self, subtask: &Subtask, _task_context: &TaskContext, _cancel: &CancelSignal) -> SubtaskResult {
        SubtaskResult { success: true, output: Some("noop".into()), error: None, duration_ms: 0, affected_files: subtask.files.clone(), commands_run: vec![] }
    }
}

/// Builds a single-subtask decomposition request wrapping the whole task
/// text. A real integrator would produce richer templates upstream (e.g.
/// from an LM-assisted breakdown); the CLI demo keeps this part trivial.
fn build_request(task_text: &str) -> (DecompositionRequest, Vec<SubtaskTemplate>) {
    let title = task_text.lines().next().unwrap_or("task").chars().take(80).collect::<String>();
    let request = DecompositionRequest { task_text: task_text.to_string(), constraints: vec![], preferred_order: vec![title.clone()], max_subtasks: None, success_criteria: vec![] };
    let templates = vec![SubtaskTemplate {
        title,
        description: task_text.to_string(),
        subtask_type: ralph_core::domain::subtask::SubtaskType::Code,
        depends_on_titles: vec![],
        files: vec![],
        acceptance_criteria: vec![],
    }];
    (request, templates)
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    let config = RalphConfig::load(cli.config.as_ref()).context("failed to load configuration")?;

    match cli.command {
        Command::Plan { file } => {
            let task_text = read_task_text(&file)?;
            let (request, templates) = build_request(&task_text);
            let decomposition = decomposer::decompose(&request, templates, 0)?;
            let report = validator::validate(&decomposition, &to_validator_config(&config));

            println!("{} {} subtasks", "plan:".bold(), decomposition.subtasks.len());
            for subtask in &decomposition.subtasks {
                println!("  {} {} ({})", subtask.id.cyan(), subtask.title, subtask.priority);
            }
            if report.is_valid {
                println!("{} completeness={:.2}", "✓ valid".green(), report.completeness_score);
            } else {
                println!("{} completeness={:.2}", "✗ invalid".red(), report.completeness_score);
                for error in &report.errors {
                    println!("  error: {error}");
                }
            }
            for warning in &report.warnings {
                println!("  warning: {warning}");
            }
        }

        Command::Run { file } => {
            let task_text = read_task_text(&file)?;
            let (request, templates) = build_request(&task_text);
            let decomposition = decomposer::decompose(&request, templates, 0)?;
            let validation = validator::validate(&decomposition, &to_validator_config(&config));
            if !validation.is_valid {
                println!("{}", "plan failed validation, aborting".red());
                for error in &validation.errors {
                    println!("  error: {error}");
                }
                return Ok(());
            }

            let mut machine = SupervisorStateMachine::new(config.supervisor.max_iterations, config.supervisor.state_timeouts.clone());
            let task_context = TaskContext::new("cli-task", task_text.clone(), config.supervisor.max_iterations, 0);
            machine.initialize(task_context, 0)?;
            machine.start_execution(1)?;

            let mut decomposition = decomposition;
            let resolver_config = ResolverConfig { failure_mode: config.resolver.failure_mode, per_subtask_retry_budget: config.resolver.per_subtask_retry_budget };
            let executor_config = ralph_core::scheduler::ExecutorConfig { max_concurrency: config.executor.max_concurrency, progress_interval_ms: config.executor.progress_interval_ms };

            let result = executor::run(
                &mut decomposition,
                machine.task_context().unwrap(),
                Arc::new(NoopExecutor),
                &executor_config,
                &resolver_config,
                CancelSignal::new(),
                |progress| info!(?progress, "execution progress"),
            )
            .await;

            machine.executor_finished(2)?;

            let modified_files: Vec<String> = result.per_subtask_results.values().flat_map(|r| r.affected_files.clone()).collect();
            let verifier_config = verify::VerifierConfig {
                command_timeout_ms: config.verifier.command_timeout_ms,
                run_syntax_checks: config.verifier.run_syntax_checks,
                type_check_command: config.verifier.type_check_command.clone(),
                lint_command: config.verifier.lint_command.clone(),
                test_command: config.verifier.test_command.clone(),
            };
            let report = verify::verify(&decomposition, &modified_files, std::path::Path::new("."), &verifier_config).await;

            if report.passes_overall() {
                machine.verifier_passed(3)?;
                println!("{} {}/{} subtasks completed", "✓ COMPLETE".green().bold(), result.totals.completed, decomposition.subtasks.len());
            } else {
                machine.iterate("verifier did not pass", 3)?;
                println!("{} pass_rate={:.2}", "✗ ITERATE/FAILED".yellow().bold(), report.summary.pass_rate);
            }

            if config.supervisor.enable_persistence {
                let snapshot = machine.get_persisted_state(4);
                ralph_core::state::persistence::save(&config.supervisor.persistence_path, &snapshot)?;
            }
        }

        Command::Status => {
            if config.supervisor.persistence_path.exists() {
                let snapshot = ralph_core::state::persistence::restore(&config.supervisor.persistence_path)?;
                println!("state: {}", snapshot.current_state);
                println!("transitions: {}", snapshot.state_history.len());
            } else {
                println!("{}", "no persisted supervisor state".dimmed());
            }
        }
    }

    Ok(())
}

fn to_validator_config(config: &RalphConfig) -> validator::ValidatorConfig {
    validator::ValidatorConfig {
        max_subtasks: config.planner.max_subtasks,
        max_dependency_depth: config.planner.max_dependency_depth,
        min_completeness_score: config.planner.min_completeness_score,
    }
}
