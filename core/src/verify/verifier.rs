//! Result Verifier (C8, spec §4.8): turns a plan's acceptance criteria plus
//! the files touched during EXECUTE into a `VerificationReport`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::decomposition::TaskDecomposition;
use crate::domain::verification::{CheckType, VerificationCheck, VerificationReport};

use super::checks;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    pub command_timeout_ms: u64,
    pub run_syntax_checks: bool,
    pub type_check_command: Option<String>,
    pub lint_command: Option<String>,
    pub test_command: Option<String>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self { command_timeout_ms: 30_000, run_syntax_checks: true, type_check_command: None, lint_command: None, test_command: None }
    }
}

/// Runs every acceptance criterion in `decomposition`, plus standing checks
/// over `modified_files`, plus any configured syntax/type/lint/test gates.
pub async fn verify(decomposition: &TaskDecomposition, modified_files: &[String], workdir: &Path, config: &VerifierConfig) -> VerificationReport {
    let timeout = Duration::from_millis(config.command_timeout_ms);
    let mut checks = Vec::new();

    for subtask in &decomposition.subtasks {
        for (idx, criterion) in subtask.acceptance_criteria.iter().enumerate() {
            let id = format!("{}-criterion-{idx}", subtask.id);
            checks.push(self::checks::check_criterion(&id, criterion, workdir, timeout).await);
        }
    }

    for (idx, path) in modified_files.iter().enumerate() {
        let id = format!("file-change-{idx}");
        checks.push(self::checks::check_file_change(&id, path));

        if config.run_syntax_checks {
            if let Some(check) = self::checks::check_syntax(&format!("syntax-{idx}"), path) {
                checks.push(check);
            }
        }
    }

    if let Some(cmd) = &config.type_check_command {
        checks.push(run_gate_command("type-check", CheckType::TypeCheck, cmd, workdir, timeout).await);
    }
    if let Some(cmd) = &config.lint_command {
        checks.push(run_gate_command("lint", CheckType::Lint, cmd, workdir, timeout).await);
    }
    if let Some(cmd) = &config.test_command {
        checks.push(run_gate_command("test", CheckType::Test, cmd, workdir, timeout).await);
    }

    VerificationReport::summarize(checks, format!("verify-{}", decomposition.title), decomposition.task_text.clone())
}

async fn run_gate_command(id: &str, check_type: CheckType, cmd: &str, workdir: &Path, timeout: Duration) -> VerificationCheck {
    use crate::domain::verification::CheckStatus;
    use crate::verify::command;

    match command::run(cmd, workdir, timeout).await {
        Ok(outcome) if outcome.timed_out => VerificationCheck { id: id.into(), check_type, status: CheckStatus::Failed, message: "timeout".into(), details: Some(cmd.to_string()), required: true },
        Ok(outcome) if outcome.exit_code == Some(0) => VerificationCheck { id: id.into(), check_type, status: CheckStatus::Passed, message: format!("{id} gate passed"), details: None, required: true },
        Ok(outcome) => VerificationCheck { id: id.into(), check_type, status: CheckStatus::Failed, message: format!("{id} gate failed"), details: Some(outcome.stderr), required: true },
        Err(e) => VerificationCheck { id: id.into(), check_type, status: CheckStatus::Failed, message: format!("{id} gate errored: {e}"), details: None, required: true },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decomposition::PlanStatus;
    use crate::domain::priority::Priority;
    use crate::domain::subtask::{AcceptanceCriterion, EffortEstimate, EffortLevel, Subtask, SubtaskStatus, SubtaskType};
    use tempfile::tempdir;

    fn plan_with_manual_criteria() -> TaskDecomposition {
        TaskDecomposition {
            task_text: "ship feature".into(),
            title: "ship-feature".into(),
            subtasks: vec![Subtask {
                id: "a".into(),
                title: "A".into(),
                description: String::new(),
                subtask_type: SubtaskType::Code,
                priority: Priority::P1,
                status: SubtaskStatus::Completed,
                dependencies: vec![],
                files: vec![],
                acceptance_criteria: vec![AcceptanceCriterion::manual("looks right")],
                effort: EffortEstimate::new(EffortLevel::Small),
                result: None,
            }],
            root_subtasks: vec!["a".into()],
            leaf_subtasks: vec!["a".into()],
            success_criteria: vec!["done".into()],
            risks: vec![],
            created_at: 0,
            plan_status: PlanStatus::Executing,
        }
    }

    #[tokio::test]
    async fn b5_all_manual_plan_passes_overall() {
        let decomposition = plan_with_manual_criteria();
        let report = verify(&decomposition, &[], Path::new("."), &VerifierConfig::default()).await;
        assert!(report.passes_overall());
        assert_eq!(report.summary.skipped, 1);
    }

    #[tokio::test]
    async fn s3_missing_modified_file_fails_the_report() {
        let decomposition = plan_with_manual_criteria();
        let report = verify(&decomposition, &["/nonexistent/file.rs".to_string()], Path::new("."), &VerifierConfig::default()).await;
        assert!(!report.passes_overall());
    }

    #[tokio::test]
    async fn valid_rust_file_passes_syntax_check() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("lib.rs");
        std::fs::write(&file, "fn main() {}").unwrap();
        let decomposition = plan_with_manual_criteria();
        let report = verify(&decomposition, &[file.to_string_lossy().to_string()], Path::new("."), &VerifierConfig::default()).await;
        assert!(report.checks.iter().any(|c| c.check_type == CheckType::SyntaxCheck && c.status == crate::domain::verification::CheckStatus::Passed));
    }
}
