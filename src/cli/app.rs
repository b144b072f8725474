//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use super::logging::{self, LogLevel, LOG_ENV};
use super::output::{Output, OutputFormat};
use super::{dep, query, task};
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "taskdag")]
#[command(author, version, about = "Local-first task tracking over a dependency DAG")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the configured format, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Log level (overrides --verbose and TASKDAG_LOG)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new taskdag project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Manage dependencies between tasks
    #[command(subcommand)]
    Dep(dep::DepCommands),

    /// Show tasks ready to work on
    Ready,

    /// Show blocked tasks
    Blocked,

    /// Show all tasks and dependency edges
    Graph,

    /// Show tasks in dependency order
    Order,

    /// Verify graph invariants
    Check {
        /// Recompute inconsistent statuses
        #[arg(long)]
        fix: bool,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    let env_level = std::env::var(LOG_ENV).ok();
    let config_level = config.log_level();
    let level = logging::resolve_level(
        cli.log_level,
        cli.verbose,
        env_level.as_deref(),
        config_level.as_deref(),
    );
    logging::init_logging(level)?;

    let format = cli
        .format
        .unwrap_or_else(|| config.default_format().into());
    let output = Output::new(format);

    debug!(project = ?config.project_root, %level, "taskdag starting");

    match cli.command {
        Commands::Init { path } => {
            let project = Project::init(&path)?;
            output.success(&format!(
                "Initialized taskdag project at {}",
                project.root().display()
            ));
        }

        Commands::Task(cmd) => task::run(cmd, &output)?,
        Commands::Dep(cmd) => dep::run(cmd, &output)?,

        Commands::Ready => query::ready(&output)?,
        Commands::Blocked => query::blocked(&output)?,
        Commands::Graph => query::graph(&output)?,
        Commands::Order => query::order(&output)?,
        Commands::Check { fix } => query::check(&output, fix)?,
    }

    Ok(())
}
