//! Timed command execution with SIGTERM-then-SIGKILL cancellation (spec §5).

use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use thiserror::Error;
use tokio::process::Command;
use tracing::warn;

const KILL_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn command: {0}")]
    Spawn(std::io::Error),
    #[error("failed to wait on command: {0}")]
    Wait(std::io::Error),
}

/// Runs `command` under a shell, in `cwd`, bounded by `timeout`. On timeout,
/// sends SIGTERM and gives the process [`KILL_GRACE`] to exit before SIGKILL.
pub async fn run(command: &str, cwd: &std::path::Path, timeout: Duration) -> Result<CommandOutcome, CommandError> {
    let started = std::time::Instant::now();

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(CommandError::Spawn)?;

    let pid = child.id().map(|p| p as i32);

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(CommandOutcome {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
            timed_out: false,
        }),
        Ok(Err(e)) => Err(CommandError::Wait(e)),
        Err(_) => {
            if let Some(pid) = pid {
                let _ = signal::kill(Pid::from_raw(pid), Signal::SIGTERM);
                if tokio::time::timeout(KILL_GRACE, tokio::time::sleep(KILL_GRACE)).await.is_ok() {
                    let _ = signal::kill(Pid::from_raw(pid), Signal::SIGKILL);
                }
            }
            warn!(%command, "command timed out, sent SIGTERM then SIGKILL");
            Ok(CommandOutcome {
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
                duration_ms: started.elapsed().as_millis() as u64,
                timed_out: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_reports_exit_code_zero() {
        let outcome = run("echo ok", std::path::Path::new("."), Duration::from_secs(5)).await.unwrap();
        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.stdout.contains("ok"));
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn failing_command_reports_nonzero_exit_code() {
        let outcome = run("exit 7", std::path::Path::new("."), Duration::from_secs(5)).await.unwrap();
        assert_eq!(outcome.exit_code, Some(7));
    }

    #[tokio::test]
    async fn slow_command_is_killed_on_timeout() {
        let outcome = run("sleep 30", std::path::Path::new("."), Duration::from_millis(100)).await.unwrap();
        assert!(outcome.timed_out);
        assert!(outcome.exit_code.is_none());
    }
}
