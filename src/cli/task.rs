//! Task CLI commands

use anyhow::{Context, Result};
use clap::Subcommand;

use super::output::Output;
use crate::domain::{NewTask, TaskId, TaskStatus, TaskUpdate, TaskView, Updated};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task
    ///
    /// Examples:
    ///   taskdag task add "Write schema"
    ///   taskdag task add "Build API" --after t-1234567
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(long, short)]
        description: Option<String>,

        /// Tasks that must be completed first (repeatable)
        #[arg(long = "after", value_name = "ID")]
        after: Vec<String>,
    },

    /// List tasks
    List {
        /// Only show tasks with this status
        #[arg(long, short)]
        status: Option<TaskStatus>,
    },

    /// Show task details
    Show {
        /// Task ID
        id: String,
    },

    /// Edit a task's title or description
    Edit {
        /// Task ID
        id: String,

        /// New title
        #[arg(long, short)]
        title: Option<String>,

        /// New description
        #[arg(long, short, conflicts_with = "clear_description")]
        description: Option<String>,

        /// Remove the description
        #[arg(long)]
        clear_description: bool,
    },

    /// Mark task as in progress
    Start {
        /// Task ID
        id: String,
    },

    /// Mark task as done
    Done {
        /// Task ID
        id: String,
    },

    /// Move an in-progress task back to pending
    Pause {
        /// Task ID
        id: String,
    },

    /// Reopen a completed task
    Reopen {
        /// Task ID
        id: String,
    },

    /// Set a task's status directly
    Status {
        /// Task ID
        id: String,

        /// pending, in_progress or completed
        status: TaskStatus,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: String,

        /// Delete even if other tasks depend on it
        #[arg(long)]
        force: bool,
    },

    /// Show whether a task can be worked on
    Readiness {
        /// Task ID
        id: String,
    },
}

pub fn run(cmd: TaskCommands, output: &Output) -> Result<()> {
    match cmd {
        TaskCommands::Add {
            title,
            description,
            after,
        } => add_task(output, title, description, &after),
        TaskCommands::List { status } => list_tasks(output, status),
        TaskCommands::Show { id } => show_task(output, &id),
        TaskCommands::Edit {
            id,
            title,
            description,
            clear_description,
        } => {
            let description = if clear_description {
                Some(None)
            } else {
                description.map(Some)
            };
            edit_task(output, &id, TaskUpdate { title, description })
        }
        TaskCommands::Start { id } => {
            set_status(output, &id, None, TaskStatus::InProgress, "Started")
        }
        TaskCommands::Done { id } => {
            set_status(output, &id, None, TaskStatus::Completed, "Completed")
        }
        TaskCommands::Pause { id } => set_status(
            output,
            &id,
            Some(TaskStatus::InProgress),
            TaskStatus::Pending,
            "Paused",
        ),
        TaskCommands::Reopen { id } => set_status(
            output,
            &id,
            Some(TaskStatus::Completed),
            TaskStatus::Pending,
            "Reopened",
        ),
        TaskCommands::Status { id, status } => set_status(output, &id, None, status, "Updated"),
        TaskCommands::Delete { id, force } => delete_task(output, &id, force),
        TaskCommands::Readiness { id } => readiness(output, &id),
    }
}

/// Parses a task ID argument
pub(crate) fn parse_id(s: &str) -> Result<TaskId> {
    s.parse()
        .with_context(|| format!("Invalid task ID argument: {}", s))
}

fn add_task(
    output: &Output,
    title: String,
    description: Option<String>,
    after: &[String],
) -> Result<()> {
    let project = Project::open_current()?;
    let after = after
        .iter()
        .map(String::as_str)
        .map(parse_id)
        .collect::<Result<Vec<_>>>()?;

    let new = NewTask { title, description };

    // Creation and its edges commit together or not at all
    let view = project.graph_file().transaction(|graph| {
        let view = graph.create_task(new)?;
        for dep in &after {
            graph.add_dependency(&view.id, dep)?;
        }
        graph.view(&view.id)
    })?;

    if output.is_json() {
        output.data(&view);
    } else {
        output.success(&format!("Created task: {} ({})", view.id, view.status));
    }

    Ok(())
}

fn list_tasks(output: &Output, status: Option<TaskStatus>) -> Result<()> {
    let project = Project::open_current()?;
    let tasks = project.graph_file().load()?.list(status);

    if output.is_json() {
        output.data(&tasks);
    } else if tasks.is_empty() {
        println!("No tasks.");
    } else {
        output.summaries(&tasks);
    }

    Ok(())
}

fn show_task(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let id = parse_id(id_str)?;
    let view = project.graph_file().load()?.view(&id)?;

    if output.is_json() {
        output.data(&view);
    } else {
        print_view(&view);
    }

    Ok(())
}

fn print_view(task: &TaskView) {
    println!("Task: {}", task.id);
    println!("Title: {}", task.title);
    println!("Status: {}", task.status);
    println!("Created: {}", task.created_at.format("%Y-%m-%d %H:%M"));
    println!("Updated: {}", task.updated_at.format("%Y-%m-%d %H:%M"));

    if let Some(completed) = task.completed_at {
        println!("Completed: {}", completed.format("%Y-%m-%d %H:%M"));
    }

    if !task.depends_on.is_empty() {
        println!("\nDepends on:");
        for dep in &task.depends_on {
            println!("  {} ({}) {}", dep.id, dep.status, dep.title);
        }
    }

    if !task.dependents.is_empty() {
        println!("\nRequired by:");
        for dependent in &task.dependents {
            println!("  {}", dependent);
        }
    }

    if let Some(desc) = &task.description {
        println!("\nDescription:");
        println!("{}", desc);
    }
}

fn edit_task(output: &Output, id_str: &str, update: TaskUpdate) -> Result<()> {
    if update.is_empty() {
        anyhow::bail!("Nothing to change: pass --title, --description or --clear-description");
    }

    let project = Project::open_current()?;
    let id = parse_id(id_str)?;
    let view = project
        .graph_file()
        .transaction(|graph| graph.update_task(&id, update))?;

    if output.is_json() {
        output.data(&view);
    } else {
        output.success(&format!("Updated task: {}", view.id));
    }

    Ok(())
}

/// Applies a status change, optionally only from a `required` status
fn set_status(
    output: &Output,
    id_str: &str,
    required: Option<TaskStatus>,
    status: TaskStatus,
    verb: &str,
) -> Result<()> {
    let project = Project::open_current()?;
    let id = parse_id(id_str)?;
    let updated: Updated = project.graph_file().transaction(|graph| match required {
        Some(required) => graph.set_status_from(&id, required, status),
        None => graph.set_status(&id, status),
    })?;

    if output.is_json() {
        output.data(&updated);
    } else if updated.changes.is_empty() {
        output.success(&format!("{} is already {}", updated.task.id, updated.task.status));
    } else {
        output.success(&format!("{} task: {} ({})", verb, updated.task.id, updated.task.status));
        output.changes(&updated.changes);
    }

    Ok(())
}

fn delete_task(output: &Output, id_str: &str, force: bool) -> Result<()> {
    let project = Project::open_current()?;
    let id = parse_id(id_str)?;
    let deleted = project
        .graph_file()
        .transaction(|graph| graph.delete_task(&id, force))?;

    if output.is_json() {
        output.data(&deleted);
    } else {
        output.success(&format!(
            "Deleted task: {} ({} edge(s) removed)",
            deleted.task.id, deleted.removed_edges
        ));
        output.changes(&deleted.changes);
    }

    Ok(())
}

fn readiness(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let id = parse_id(id_str)?;
    let readiness = project.graph_file().load()?.readiness(&id)?;

    if output.is_json() {
        output.data(&readiness);
    } else if readiness.ready {
        println!("{} is READY (all dependencies complete)", readiness.task);
    } else {
        println!("{} is waiting on:", readiness.task);
        for dep in &readiness.blocking {
            println!("  {}", dep);
        }
    }

    Ok(())
}
