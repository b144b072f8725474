//! Dependency CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use super::task::parse_id;
use crate::storage::Project;

#[derive(Subcommand)]
pub enum DepCommands {
    /// Make a task depend on another
    Add {
        /// Task that will wait
        task: String,

        /// Task that must be completed first
        depends_on: String,
    },

    /// Remove a dependency
    Remove {
        /// Task that waits
        task: String,

        /// Dependency to remove
        depends_on: String,
    },

    /// Check whether adding a dependency would create a cycle
    Check {
        /// Task that would wait
        task: String,

        /// Task it would depend on
        depends_on: String,
    },
}

pub fn run(cmd: DepCommands, output: &Output) -> Result<()> {
    match cmd {
        DepCommands::Add { task, depends_on } => add_dependency(output, &task, &depends_on),
        DepCommands::Remove { task, depends_on } => {
            remove_dependency(output, &task, &depends_on)
        }
        DepCommands::Check { task, depends_on } => check_dependency(output, &task, &depends_on),
    }
}

fn add_dependency(output: &Output, task_str: &str, depends_on_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let task_id = parse_id(task_str)?;
    let depends_on_id = parse_id(depends_on_str)?;

    let updated = project
        .graph_file()
        .transaction(|graph| graph.add_dependency(&task_id, &depends_on_id))?;

    if output.is_json() {
        output.data(&updated);
    } else {
        output.success(&format!("{} now depends on {}", task_id, depends_on_id));
        output.changes(&updated.changes);
    }

    Ok(())
}

fn remove_dependency(output: &Output, task_str: &str, depends_on_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let task_id = parse_id(task_str)?;
    let depends_on_id = parse_id(depends_on_str)?;

    let updated = project
        .graph_file()
        .transaction(|graph| graph.remove_dependency(&task_id, &depends_on_id))?;

    if output.is_json() {
        output.data(&updated);
    } else {
        output.success(&format!(
            "Removed dependency: {} no longer depends on {}",
            task_id, depends_on_id
        ));
        output.changes(&updated.changes);
    }

    Ok(())
}

fn check_dependency(output: &Output, task_str: &str, depends_on_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let task_id = parse_id(task_str)?;
    let depends_on_id = parse_id(depends_on_str)?;

    let check = project
        .graph_file()
        .load()?
        .check_dependency(&task_id, &depends_on_id)?;

    if output.is_json() {
        output.data(&check);
    } else if check.has_cycle {
        let path: Vec<String> = check.path.iter().map(ToString::to_string).collect();
        println!("Would create a cycle: {}", path.join(" -> "));
    } else {
        println!("No cycle: {} can depend on {}", task_id, depends_on_id);
    }

    Ok(())
}
