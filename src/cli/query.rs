//! Query commands (ready, blocked, graph, order, check)

use anyhow::Result;

use super::output::Output;
use crate::storage::Project;

/// Show tasks ready to work on
pub fn ready(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let ready_tasks = project.graph_file().load()?.ready_tasks();

    if output.is_json() {
        output.data(&ready_tasks);
    } else if ready_tasks.is_empty() {
        println!("No tasks ready to work on.");
    } else {
        println!("Ready tasks ({}):", ready_tasks.len());
        output.summaries(&ready_tasks);
    }

    Ok(())
}

/// Show blocked tasks with what blocks them
pub fn blocked(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let graph = project.graph_file().load()?;

    let blocked = graph
        .blocked_tasks()
        .into_iter()
        .map(|task| graph.readiness(&task.id).map(|r| (task, r.blocking)))
        .collect::<Result<Vec<_>, _>>()?;

    if output.is_json() {
        let items: Vec<_> = blocked
            .iter()
            .map(|(task, blockers)| {
                serde_json::json!({
                    "id": task.id,
                    "title": task.title,
                    "status": task.status,
                    "blocked_by": blockers.iter().map(|b| &b.id).collect::<Vec<_>>(),
                })
            })
            .collect();
        output.data(&items);
    } else if blocked.is_empty() {
        println!("No blocked tasks.");
    } else {
        println!("Blocked tasks ({}):", blocked.len());
        println!("{:<12} {:<30} BLOCKED BY", "ID", "TITLE");
        println!("{}", "-".repeat(80));
        for (task, blockers) in blocked {
            let ids: Vec<String> = blockers.iter().map(|b| b.id.to_string()).collect();
            println!("{:<12} {:<30} {}", task.id, task.title, ids.join(", "));
        }
    }

    Ok(())
}

/// Dump all tasks and edges
pub fn graph(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let snapshot = project.graph_file().load()?.snapshot();

    if output.is_json() {
        output.data(&snapshot);
    } else {
        println!(
            "{} task(s), {} dependency edge(s)",
            snapshot.tasks.len(),
            snapshot.dependencies.len()
        );
        for task in &snapshot.tasks {
            println!("  {}", task);
        }
        if !snapshot.dependencies.is_empty() {
            println!();
            for edge in &snapshot.dependencies {
                println!("  {} -> {}", edge.task, edge.depends_on);
            }
        }
    }

    Ok(())
}

/// Print tasks with every dependency before its dependents
pub fn order(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let graph = project.graph_file().load()?;

    let ordered: Vec<_> = graph
        .topological_order()
        .iter()
        .filter_map(|id| graph.store().get(id))
        .map(|task| task.summary())
        .collect();

    if output.is_json() {
        output.data(&ordered);
    } else if ordered.is_empty() {
        println!("No tasks.");
    } else {
        for (i, task) in ordered.iter().enumerate() {
            println!("{:>3}. {}", i + 1, task);
        }
    }

    Ok(())
}

/// Verify the stored graph, optionally repairing statuses
pub fn check(output: &Output, fix: bool) -> Result<()> {
    let project = Project::open_current()?;
    let file = project.graph_file();

    if fix {
        let changes = file.transaction(|graph| Ok(graph.reconcile()))?;
        if output.is_json() {
            output.data(&serde_json::json!({ "fixed": changes }));
        } else if changes.is_empty() {
            output.success("Graph is consistent, nothing to fix.");
        } else {
            output.success(&format!("Repaired {} task status(es).", changes.len()));
            output.changes(&changes);
        }
        return Ok(());
    }

    let violations = file.load()?.verify();

    if output.is_json() {
        output.data(&serde_json::json!({
            "ok": violations.is_empty(),
            "violations": violations,
        }));
    } else if violations.is_empty() {
        output.success("Graph is consistent.");
    } else {
        for violation in &violations {
            println!("  {}", violation);
        }
    }

    if !violations.is_empty() {
        anyhow::bail!(
            "{} invariant violation(s) found. Run 'taskdag check --fix' to repair statuses.",
            violations.len()
        );
    }

    Ok(())
}
