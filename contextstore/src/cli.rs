//! CLI argument parsing for ctxstore.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ctxstore")]
#[command(author, version, about = "Token-budgeted context window store", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the snapshot path from config
    #[arg(short = 's', long)]
    pub snapshot: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add an item to the context window
    Add {
        /// Item type (system_prompt, user_message, assistant_message, tool_call,
        /// tool_result, file_content, code_snippet, memory)
        #[arg(required = true)]
        item_type: String,

        /// Priority (critical, high, medium, low, ephemeral)
        #[arg(short, long, default_value = "medium")]
        priority: String,

        /// Read content from a file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Literal content; reads stdin if omitted and --file is not given
        content: Option<String>,
    },

    /// Print the current window, insertion-ordered
    Show,

    /// Print occupancy statistics (tokens, usage percent, per-type breakdown)
    State,

    /// Run a compression pass against the configured target
    Compress {
        /// Query text used for semantic relevance scoring
        #[arg(short, long, default_value = "")]
        query: String,

        /// Active file path used for proximity scoring
        #[arg(short = 'f', long)]
        current_file: Option<String>,
    },

    /// Remove an item by id
    Remove {
        #[arg(required = true)]
        id: String,
    },
}
