use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ralph", about = "Ralph Loop agentic control plane")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decompose a task description into subtasks and validate the plan.
    Plan {
        /// Path to a file containing the task description; reads stdin if omitted.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Drive the full IDLE→PLAN→EXECUTE→VERIFY loop with a no-op executor.
    Run {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Print the persisted supervisor snapshot, if one exists.
    Status,
}
