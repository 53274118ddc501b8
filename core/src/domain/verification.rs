//! VerificationReport and related types (spec §3, §4.8).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    Criterion,
    FileChange,
    SyntaxCheck,
    TypeCheck,
    Lint,
    Test,
    Command,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
    Warning,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCheck {
    pub id: String,
    pub check_type: CheckType,
    pub status: CheckStatus,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VerificationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub skipped: usize,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub report_id: String,
    pub task_description: String,
    pub checks: Vec<VerificationCheck>,
    pub summary: VerificationSummary,
    pub recommendations: Vec<String>,
}

impl VerificationReport {
    /// Invariant: summary totals match the checks list.
    pub fn summarize(checks: Vec<VerificationCheck>, report_id: impl Into<String>, task_description: impl Into<String>) -> Self {
        let total = checks.len();
        let passed = checks.iter().filter(|c| c.status == CheckStatus::Passed).count();
        let failed = checks.iter().filter(|c| c.status == CheckStatus::Failed).count();
        let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();
        let skipped = checks.iter().filter(|c| c.status == CheckStatus::Skipped).count();
        let denom = total - skipped;
        let pass_rate = if denom == 0 { 0.0 } else { passed as f64 / denom as f64 };

        let recommendations = checks
            .iter()
            .filter(|c| c.status == CheckStatus::Failed)
            .map(|c| recommendation_for(c))
            .collect();

        Self {
            report_id: report_id.into(),
            task_description: task_description.into(),
            summary: VerificationSummary { total, passed, failed, warnings, skipped, pass_rate },
            recommendations,
            checks,
        }
    }

    /// Overall-pass: every required criterion passed AND no configured gate failed.
    /// A required criterion that was `skipped` (e.g. verificationMethod = manual)
    /// carries no verdict and is excluded rather than treated as a failure (B5).
    pub fn passes_overall(&self) -> bool {
        let required_ok = self
            .checks
            .iter()
            .filter(|c| c.required && c.status != CheckStatus::Skipped)
            .all(|c| c.status == CheckStatus::Passed);
        let no_gate_failed = self
            .checks
            .iter()
            .filter(|c| matches!(c.check_type, CheckType::Test | CheckType::TypeCheck | CheckType::Lint))
            .all(|c| c.status != CheckStatus::Failed);
        required_ok && no_gate_failed
    }
}

fn recommendation_for(check: &VerificationCheck) -> String {
    match check.check_type {
        CheckType::Criterion => format!("Revisit acceptance criterion: {}", check.message),
        CheckType::FileChange => format!("Ensure the expected file exists: {}", check.message),
        CheckType::SyntaxCheck => format!("Fix syntax error: {}", check.message),
        CheckType::TypeCheck => format!("Resolve type error: {}", check.message),
        CheckType::Lint => format!("Address lint finding: {}", check.message),
        CheckType::Test => format!("Fix failing test: {}", check.message),
        CheckType::Command => format!("Investigate command failure: {}", check.message),
        CheckType::Pattern => format!("Pattern did not match: {}", check.message),
    }
}
