//! Individual check evaluators (spec §4.8).

use std::path::Path;
use std::time::Duration;

use regex::Regex;

use crate::domain::subtask::{AcceptanceCriterion, VerificationMethod};
use crate::domain::verification::{CheckStatus, CheckType, VerificationCheck};

use super::command;

fn pattern_matches(content: &str, pattern: &str) -> bool {
    if let Ok(re) = Regex::new(pattern) {
        re.is_match(content)
    } else {
        content.contains(pattern)
    }
}

/// Evaluates one `AcceptanceCriterion` per its `verificationMethod`.
pub async fn check_criterion(id: &str, criterion: &AcceptanceCriterion, workdir: &Path, command_timeout: Duration) -> VerificationCheck {
    match criterion.verification_method {
        VerificationMethod::Manual => VerificationCheck {
            id: id.to_string(),
            check_type: CheckType::Criterion,
            status: CheckStatus::Skipped,
            message: format!("manual verification required: {}", criterion.description),
            details: None,
            required: criterion.required,
        },
        VerificationMethod::Automated => check_automated_file(id, criterion),
        VerificationMethod::Command => check_command(id, criterion, workdir, command_timeout).await,
    }
}

fn check_automated_file(id: &str, criterion: &AcceptanceCriterion) -> VerificationCheck {
    let Some(file) = &criterion.file else {
        return VerificationCheck {
            id: id.to_string(),
            check_type: CheckType::Criterion,
            status: CheckStatus::Skipped,
            message: "automated criterion has no file to check".into(),
            details: None,
            required: criterion.required,
        };
    };

    let path = Path::new(file);
    if !path.exists() {
        return VerificationCheck {
            id: id.to_string(),
            check_type: CheckType::Criterion,
            status: CheckStatus::Failed,
            message: format!("file does not exist: {file}"),
            details: None,
            required: criterion.required,
        };
    }

    let content = std::fs::read_to_string(path).unwrap_or_default();
    if content.is_empty() {
        return VerificationCheck {
            id: id.to_string(),
            check_type: CheckType::Criterion,
            status: CheckStatus::Warning,
            message: format!("file is empty: {file}"),
            details: None,
            required: criterion.required,
        };
    }

    if let Some(pattern) = &criterion.expected_pattern {
        if !pattern_matches(&content, pattern) {
            return VerificationCheck {
                id: id.to_string(),
                check_type: CheckType::Pattern,
                status: CheckStatus::Failed,
                message: format!("expected pattern not found in {file}"),
                details: Some(pattern.clone()),
                required: criterion.required,
            };
        }
    }

    VerificationCheck {
        id: id.to_string(),
        check_type: CheckType::Criterion,
        status: CheckStatus::Passed,
        message: format!("{file} satisfies criterion"),
        details: None,
        required: criterion.required,
    }
}

async fn check_command(id: &str, criterion: &AcceptanceCriterion, workdir: &Path, timeout: Duration) -> VerificationCheck {
    let Some(cmd) = &criterion.command else {
        return VerificationCheck {
            id: id.to_string(),
            check_type: CheckType::Command,
            status: CheckStatus::Skipped,
            message: "command criterion has no command to run".into(),
            details: None,
            required: criterion.required,
        };
    };

    match command::run(cmd, workdir, timeout).await {
        Ok(outcome) if outcome.timed_out => VerificationCheck {
            id: id.to_string(),
            check_type: CheckType::Command,
            status: CheckStatus::Failed,
            message: "timeout".into(),
            details: Some(cmd.clone()),
            required: criterion.required,
        },
        Ok(outcome) if outcome.exit_code == Some(0) => VerificationCheck {
            id: id.to_string(),
            check_type: CheckType::Command,
            status: CheckStatus::Passed,
            message: format!("command succeeded: {cmd}"),
            details: None,
            required: criterion.required,
        },
        Ok(outcome) => VerificationCheck {
            id: id.to_string(),
            check_type: CheckType::Command,
            status: CheckStatus::Failed,
            message: format!("command exited with {:?}", outcome.exit_code),
            details: Some(outcome.stderr),
            required: criterion.required,
        },
        Err(e) => VerificationCheck {
            id: id.to_string(),
            check_type: CheckType::Command,
            status: CheckStatus::Failed,
            message: format!("failed to run command: {e}"),
            details: None,
            required: criterion.required,
        },
    }
}

/// Standing check for each file touched during EXECUTE.
pub fn check_file_change(id: &str, path: &str) -> VerificationCheck {
    let p = Path::new(path);
    if !p.exists() {
        return VerificationCheck {
            id: id.to_string(),
            check_type: CheckType::FileChange,
            status: CheckStatus::Failed,
            message: format!("expected file missing: {path}"),
            details: None,
            required: true,
        };
    }
    let content = std::fs::read_to_string(p).unwrap_or_default();
    if content.is_empty() {
        return VerificationCheck {
            id: id.to_string(),
            check_type: CheckType::FileChange,
            status: CheckStatus::Warning,
            message: format!("file is empty: {path}"),
            details: None,
            required: true,
        };
    }
    VerificationCheck {
        id: id.to_string(),
        check_type: CheckType::FileChange,
        status: CheckStatus::Passed,
        message: format!("{path} exists and is non-empty"),
        details: None,
        required: true,
    }
}

/// JSON parse for `.json`; brace/bracket balance for curly-brace languages.
pub fn check_syntax(id: &str, path: &str) -> Option<VerificationCheck> {
    let p = Path::new(path);
    let content = std::fs::read_to_string(p).ok()?;

    let ok = if path.ends_with(".json") {
        serde_json::from_str::<serde_json::Value>(&content).is_ok()
    } else if matches!(p.extension().and_then(|e| e.to_str()), Some("rs" | "js" | "ts" | "c" | "cpp" | "java" | "go")) {
        is_balanced(&content)
    } else {
        return None;
    };

    Some(VerificationCheck {
        id: id.to_string(),
        check_type: CheckType::SyntaxCheck,
        status: if ok { CheckStatus::Passed } else { CheckStatus::Failed },
        message: if ok { format!("{path} parses cleanly") } else { format!("{path} has unbalanced braces or invalid syntax") },
        details: None,
        required: false,
    })
}

fn is_balanced(content: &str) -> bool {
    let mut stack = Vec::new();
    for c in content.chars() {
        match c {
            '{' | '[' | '(' => stack.push(c),
            '}' => {
                if stack.pop() != Some('{') {
                    return false;
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            ')' => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn manual_criterion_is_skipped() {
        let criterion = AcceptanceCriterion::manual("eyeball it");
        let check = check_criterion("c1", &criterion, Path::new("."), Duration::from_secs(1)).await;
        assert_eq!(check.status, CheckStatus::Skipped);
    }

    #[tokio::test]
    async fn automated_criterion_fails_on_missing_file() {
        let criterion = AcceptanceCriterion {
            description: "file exists".into(),
            verification_method: VerificationMethod::Automated,
            required: true,
            file: Some("/nonexistent/path.txt".into()),
            expected_pattern: None,
            command: None,
        };
        let check = check_criterion("c1", &criterion, Path::new("."), Duration::from_secs(1)).await;
        assert_eq!(check.status, CheckStatus::Failed);
    }

    #[tokio::test]
    async fn automated_criterion_checks_pattern() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("out.txt");
        std::fs::write(&file, "hello world").unwrap();

        let criterion = AcceptanceCriterion {
            description: "contains greeting".into(),
            verification_method: VerificationMethod::Automated,
            required: true,
            file: Some(file.to_string_lossy().to_string()),
            expected_pattern: Some("hello".into()),
            command: None,
        };
        let check = check_criterion("c1", &criterion, Path::new("."), Duration::from_secs(1)).await;
        assert_eq!(check.status, CheckStatus::Passed);
    }

    #[tokio::test]
    async fn command_criterion_runs_and_reports_exit_code() {
        let criterion = AcceptanceCriterion {
            description: "echo works".into(),
            verification_method: VerificationMethod::Command,
            required: true,
            file: None,
            expected_pattern: None,
            command: Some("echo ok".into()),
        };
        let check = check_criterion("c1", &criterion, Path::new("."), Duration::from_secs(5)).await;
        assert_eq!(check.status, CheckStatus::Passed);
    }

    #[test]
    fn json_syntax_check_rejects_invalid_json() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bad.json");
        std::fs::write(&file, "{ not json").unwrap();
        let check = check_syntax("s1", file.to_str().unwrap()).unwrap();
        assert_eq!(check.status, CheckStatus::Failed);
    }

    #[test]
    fn brace_balance_detects_mismatch() {
        assert!(is_balanced("fn main() { if true { } }"));
        assert!(!is_balanced("fn main() { if true { }"));
    }
}
