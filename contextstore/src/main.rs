use std::io::Read as _;
use std::str::FromStr;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use contextstore::cli::{Cli, Command};
use contextstore::{Config, ContextItemType, ContextManager, ContextPriority};

fn setup_logging() {
    env_logger::Builder::from_default_env().filter_level(log::LevelFilter::Info).init();
}

fn snapshot_path(cli: &Cli, config: &Config) -> std::path::PathBuf {
    cli.snapshot.clone().unwrap_or_else(|| config.persistence_path.clone())
}

fn load_or_new(cli: &Cli, config: &Config) -> Result<ContextManager> {
    let path = snapshot_path(cli, config);
    if path.exists() {
        ContextManager::restore(&path).context("failed to restore snapshot")
    } else {
        Ok(ContextManager::new(config.clone()))
    }
}

fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("failed to load configuration")?;

    info!("ctxstore starting");

    let mut manager = load_or_new(&cli, &config)?;
    let path = snapshot_path(&cli, &config);

    match cli.command {
        Command::Add { item_type, priority, file, content } => {
            let item_type = ContextItemType::from_str(&item_type).map_err(|e| eyre::eyre!(e))?;
            let priority = ContextPriority::from_str(&priority).map_err(|e| eyre::eyre!(e))?;

            let body = if let Some(path) = file {
                std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?
            } else if let Some(content) = content {
                content
            } else {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
                buf
            };

            let id = manager.add(item_type, body, priority);
            manager.persist(&path).context("persisting snapshot")?;
            println!("{} added item {}", "✓".green(), id.cyan());
        }

        Command::Show => {
            for (item, content) in manager.get_window() {
                println!(
                    "{} [{}] {} ({} tok)",
                    item.id.cyan(),
                    item.item_type.to_string().dimmed(),
                    content,
                    item.token_count
                );
            }
        }

        Command::State => {
            let state = manager.state();
            println!("tokens:   {} / {}", state.current_tokens, config.max_tokens);
            println!("usage:    {:.1}%", state.usage_percent * 100.0);
            println!("items:    {}", state.item_count);
            if state.is_critical {
                println!("{}", "CRITICAL".red().bold());
            } else if state.is_warning {
                println!("{}", "WARNING".yellow());
            }
            for (item_type, breakdown) in &state.by_type {
                println!("  {:<16} {:>6} tok  ({} items)", item_type, breakdown.tokens, breakdown.count);
            }
        }

        Command::Compress { query, current_file } => {
            let result = manager.compress(&query, current_file.as_deref());
            manager.persist(&path).context("persisting snapshot")?;
            println!(
                "{} removed={} summarized={} ratio={:.2}",
                "✓".green(),
                result.removed_count,
                result.summarized_count,
                result.compression_ratio
            );
        }

        Command::Remove { id } => {
            manager.remove(&id).with_context(|| format!("removing {id}"))?;
            manager.persist(&path).context("persisting snapshot")?;
            println!("{} removed item {}", "✓".green(), id.cyan());
        }
    }

    Ok(())
}
