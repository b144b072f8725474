//! Task graph facade
//!
//! [`TaskGraph`] owns a [`TaskStore`] and is the only way to change it once
//! built. Every mutating operation validates its input completely before
//! touching the store, then commits and runs the status cascade, so a
//! rejected call leaves the graph exactly as it was.
//!
//! Uses petgraph for load-time cycle validation and topological ordering.

use chrono::{DateTime, Duration, Utc};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use super::cycle::{would_create_cycle, CycleCheck};
use super::id::TaskId;
use super::status::{self, StatusChange, TransitionRejection};
use super::store::{Edge, StoreError, TaskRecord, TaskStore};
use super::task::{DependencyEdge, NewTask, Task, TaskError, TaskStatus, TaskSummary, TaskUpdate};

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Self-dependency not allowed: {0}")]
    SelfDependency(TaskId),

    #[error("Circular dependency detected: {}", format_path(.path))]
    CircularDependency { path: Vec<TaskId> },

    #[error("{task} already depends on {depends_on}")]
    DuplicateDependency { task: TaskId, depends_on: TaskId },

    #[error("{task} does not depend on {depends_on}")]
    DependencyNotFound { task: TaskId, depends_on: TaskId },

    #[error("Cannot change {task} from {from} to {to}: {reason}")]
    InvalidStatusTransition {
        task: TaskId,
        from: TaskStatus,
        to: TaskStatus,
        reason: TransitionRejection,
    },

    #[error("{task} has {} dependent task(s): {}", .dependents.len(), format_summaries(.dependents))]
    HasDependents {
        task: TaskId,
        dependents: Vec<TaskSummary>,
    },

    #[error(transparent)]
    InvalidTask(#[from] TaskError),
}

impl GraphError {
    /// Returns true for conflicts that the caller may resolve by retrying
    /// with explicit confirmation, as opposed to hard failures
    pub fn is_conflict(&self) -> bool {
        matches!(self, GraphError::HasDependents { .. })
    }
}

impl fmt::Display for TransitionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionRejection::Blocked => {
                f.write_str("task is blocked until its dependencies are completed")
            }
            TransitionRejection::EngineOnly => {
                f.write_str("blocked is derived from dependencies and cannot be set manually")
            }
            TransitionRejection::NotAllowed => {
                f.write_str("tasks move pending -> in_progress -> completed one step at a time")
            }
            TransitionRejection::RequiresStatus(status) => {
                write!(f, "only {} tasks can make this move", status)
            }
        }
    }
}

fn format_path(path: &[TaskId]) -> String {
    path.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> ")
}

fn format_summaries(summaries: &[TaskSummary]) -> String {
    summaries
        .iter()
        .map(|s| format!("{} ({})", s.id, s.title))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A dependency as shown on the dependent task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyView {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

/// Full view of a task with its neighbourhood
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub depends_on: Vec<DependencyView>,
    pub dependents: Vec<TaskSummary>,
}

/// Result of an operation that leaves the task in place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Updated {
    pub task: TaskView,
    /// Status changes applied, in order, including the task's own
    pub changes: Vec<StatusChange>,
}

/// Result of a task deletion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deleted {
    pub task: TaskSummary,
    pub removed_edges: usize,
    pub changes: Vec<StatusChange>,
}

/// All tasks and edges, for external rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub tasks: Vec<TaskSummary>,
    pub dependencies: Vec<Edge>,
}

/// Whether a task can be worked on, and what holds it back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readiness {
    pub task: TaskId,
    pub ready: bool,
    pub blocking: Vec<TaskSummary>,
}

/// An invariant violation found in a stored graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    Cycle { task: TaskId },
    InconsistentStatus {
        task: TaskId,
        status: TaskStatus,
        expected: TaskStatus,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Cycle { task } => write!(f, "dependency cycle through {}", task),
            Violation::InconsistentStatus {
                task,
                status,
                expected,
            } => write!(f, "{} is {} but should be {}", task, status, expected),
        }
    }
}

/// The dependency graph of tasks
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    store: TaskStore,
}

impl TaskGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from persisted records
    ///
    /// Rejects structurally broken input and cycles. Status consistency is
    /// not enforced here; see [`TaskGraph::verify`] and [`TaskGraph::reconcile`].
    pub fn from_records(records: impl IntoIterator<Item = TaskRecord>) -> Result<Self, StoreError> {
        let store = TaskStore::from_records(records)?;
        let graph = Self { store };

        if let Err(task) = graph.toposorted() {
            return Err(StoreError::CycleDetected(task));
        }

        Ok(graph)
    }

    /// Exports all tasks with their edges
    pub fn to_records(&self) -> Vec<TaskRecord> {
        self.store.to_records()
    }

    /// Read-only access to the underlying store
    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.store.contains(id)
    }

    fn require(&self, id: &TaskId) -> Result<&Task, GraphError> {
        self.store
            .get(id)
            .ok_or_else(|| GraphError::TaskNotFound(id.clone()))
    }

    // ------------------------------------------------------------------
    // Task records
    // ------------------------------------------------------------------

    /// Creates a new pending task with no edges
    pub fn create_task(&mut self, new: NewTask) -> Result<TaskView, GraphError> {
        let now = Utc::now();
        let mut offset = 0;
        let id = loop {
            let candidate = TaskId::new(&new.title, now + Duration::nanoseconds(offset));
            if !self.store.contains(&candidate) {
                break candidate;
            }
            offset += 1;
        };

        let task = Task::from_new(id.clone(), new)?;
        info!(task = %id, title = %task.title, "created task");
        self.store.insert_task(task);
        self.view(&id)
    }

    /// Updates the title and/or description of a task
    pub fn update_task(&mut self, id: &TaskId, update: TaskUpdate) -> Result<TaskView, GraphError> {
        let task = self
            .store
            .get_mut(id)
            .ok_or_else(|| GraphError::TaskNotFound(id.clone()))?;

        if task.apply_update(update)? {
            info!(task = %id, "updated task details");
        }
        self.view(id)
    }

    /// Returns the full view of a task
    pub fn view(&self, id: &TaskId) -> Result<TaskView, GraphError> {
        let task = self.require(id)?;

        let depends_on = self
            .store
            .dependency_edges(id)
            .iter()
            .filter_map(|edge| {
                self.store.get(&edge.task).map(|dep| DependencyView {
                    id: dep.id.clone(),
                    title: dep.title.clone(),
                    status: dep.status(),
                    created_at: edge.created_at,
                })
            })
            .collect();

        Ok(TaskView {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status(),
            created_at: task.created_at,
            updated_at: task.updated_at,
            completed_at: task.completed_at,
            depends_on,
            dependents: self.store.dependent_summaries(id),
        })
    }

    /// Lists tasks in creation order, optionally filtered by status
    pub fn list(&self, status: Option<TaskStatus>) -> Vec<TaskSummary> {
        self.store
            .tasks_sorted()
            .into_iter()
            .filter(|task| status.map_or(true, |s| task.status() == s))
            .map(Task::summary)
            .collect()
    }

    // ------------------------------------------------------------------
    // Invariant-sensitive operations
    // ------------------------------------------------------------------

    /// Dry-run cycle check for "`task` depends on `depends_on`"
    ///
    /// The result is advisory: [`TaskGraph::add_dependency`] checks again.
    pub fn check_dependency(&self, task: &TaskId, depends_on: &TaskId) -> Result<CycleCheck, GraphError> {
        self.require(task)?;
        self.require(depends_on)?;
        Ok(would_create_cycle(&self.store, task, depends_on))
    }

    /// Adds the edge "`task` depends on `depends_on`"
    pub fn add_dependency(&mut self, task: &TaskId, depends_on: &TaskId) -> Result<Updated, GraphError> {
        if task == depends_on {
            warn!(task = %task, "rejected self-dependency");
            return Err(GraphError::SelfDependency(task.clone()));
        }
        self.require(task)?;
        self.require(depends_on)?;

        if self.store.has_edge(task, depends_on) {
            warn!(task = %task, depends_on = %depends_on, "rejected duplicate dependency");
            return Err(GraphError::DuplicateDependency {
                task: task.clone(),
                depends_on: depends_on.clone(),
            });
        }

        let check = would_create_cycle(&self.store, task, depends_on);
        if check.has_cycle {
            warn!(path = %format_path(&check.path), "rejected circular dependency");
            return Err(GraphError::CircularDependency { path: check.path });
        }

        self.store
            .insert_edge(task, DependencyEdge::new(depends_on.clone()));
        let changes = status::cascade(&mut self.store, [task.clone()]);
        info!(task = %task, depends_on = %depends_on, changes = changes.len(), "added dependency");

        Ok(Updated {
            task: self.view(task)?,
            changes,
        })
    }

    /// Removes the edge "`task` depends on `depends_on`"
    pub fn remove_dependency(&mut self, task: &TaskId, depends_on: &TaskId) -> Result<Updated, GraphError> {
        self.require(task)?;

        if !self.store.remove_edge(task, depends_on) {
            warn!(task = %task, depends_on = %depends_on, "dependency to remove does not exist");
            return Err(GraphError::DependencyNotFound {
                task: task.clone(),
                depends_on: depends_on.clone(),
            });
        }

        let changes = status::cascade(&mut self.store, [task.clone()]);
        info!(task = %task, depends_on = %depends_on, changes = changes.len(), "removed dependency");

        Ok(Updated {
            task: self.view(task)?,
            changes,
        })
    }

    /// Deletes a task
    ///
    /// Without `force`, a task that others depend on is not deleted and
    /// [`GraphError::HasDependents`] lists them. With `force`, every edge
    /// touching the task goes first, then the record, then the former
    /// dependents are recomputed.
    pub fn delete_task(&mut self, id: &TaskId, force: bool) -> Result<Deleted, GraphError> {
        self.require(id)?;

        let dependents = self.store.dependent_summaries(id);
        if !dependents.is_empty() && !force {
            warn!(task = %id, dependents = dependents.len(), "delete needs confirmation");
            return Err(GraphError::HasDependents {
                task: id.clone(),
                dependents,
            });
        }

        let removed_edges = self.store.dependency_edges(id).len() + dependents.len();
        let (task, former_dependents) = self
            .store
            .remove_task(id)
            .ok_or_else(|| GraphError::TaskNotFound(id.clone()))?;

        let changes = status::cascade(&mut self.store, former_dependents);
        info!(task = %id, removed_edges, changes = changes.len(), "deleted task");

        Ok(Deleted {
            task: task.summary(),
            removed_edges,
            changes,
        })
    }

    /// Applies a user-initiated status change and cascades to dependents
    pub fn set_status(&mut self, id: &TaskId, requested: TaskStatus) -> Result<Updated, GraphError> {
        let from = self.require(id)?.status();

        let changed = status::validate_manual(from, requested).map_err(|reason| {
            warn!(task = %id, %from, to = %requested, "rejected status transition");
            GraphError::InvalidStatusTransition {
                task: id.clone(),
                from,
                to: requested,
                reason,
            }
        })?;

        if !changed {
            return Ok(Updated {
                task: self.view(id)?,
                changes: Vec::new(),
            });
        }

        if let Some(task) = self.store.get_mut(id) {
            task.set_status(requested);
        }

        // A reopened task may have to go straight back to blocked
        let settled = status::recompute(&mut self.store, id).map_or(requested, |c| c.to);
        let mut changes = vec![StatusChange {
            task: id.clone(),
            from,
            to: settled,
        }];

        let seeds = self.store.dependents(id).to_vec();
        changes.extend(status::cascade(&mut self.store, seeds));
        info!(task = %id, %from, to = %settled, changes = changes.len(), "changed status");

        Ok(Updated {
            task: self.view(id)?,
            changes,
        })
    }

    /// Like [`TaskGraph::set_status`], but only for a task currently in
    /// `required`
    ///
    /// Backs commands such as pause and reopen that share a target status
    /// but start from different ones.
    pub fn set_status_from(
        &mut self,
        id: &TaskId,
        required: TaskStatus,
        requested: TaskStatus,
    ) -> Result<Updated, GraphError> {
        let from = self.require(id)?.status();
        if from != required {
            warn!(task = %id, %from, %required, "rejected status transition from wrong state");
            return Err(GraphError::InvalidStatusTransition {
                task: id.clone(),
                from,
                to: requested,
                reason: TransitionRejection::RequiresStatus(required),
            });
        }

        self.set_status(id, requested)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Returns whether a task is ready and which dependencies block it
    pub fn readiness(&self, id: &TaskId) -> Result<Readiness, GraphError> {
        self.require(id)?;

        let blocking: Vec<_> = self
            .store
            .dependencies(id)
            .filter_map(|dep| self.store.get(dep))
            .filter(|dep| !dep.status().is_complete())
            .map(Task::summary)
            .collect();

        Ok(Readiness {
            task: id.clone(),
            ready: blocking.is_empty(),
            blocking,
        })
    }

    /// Tasks that can be worked on: not completed, all dependencies completed
    pub fn ready_tasks(&self) -> Vec<TaskSummary> {
        self.store
            .tasks_sorted()
            .into_iter()
            .filter(|task| !task.status().is_complete())
            .filter(|task| self.store.all_dependencies_completed(&task.id))
            .map(Task::summary)
            .collect()
    }

    /// Tasks held back by at least one incomplete dependency
    pub fn blocked_tasks(&self) -> Vec<TaskSummary> {
        self.store
            .tasks_sorted()
            .into_iter()
            .filter(|task| !task.status().is_complete())
            .filter(|task| !self.store.all_dependencies_completed(&task.id))
            .map(Task::summary)
            .collect()
    }

    /// Returns all tasks and edges
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            tasks: self.list(None),
            dependencies: self.store.edges(),
        }
    }

    /// Returns all task IDs with dependencies before their dependents
    pub fn topological_order(&self) -> Vec<TaskId> {
        // The store is acyclic by construction
        self.toposorted().unwrap_or_default()
    }

    /// Runs petgraph's toposort over the store, reporting a task on a cycle
    /// if there is one
    fn toposorted(&self) -> Result<Vec<TaskId>, TaskId> {
        let mut graph: DiGraph<&TaskId, ()> = DiGraph::new();
        let mut node_map: HashMap<&TaskId, NodeIndex> = HashMap::new();

        for task in self.store.tasks_sorted() {
            node_map.insert(&task.id, graph.add_node(&task.id));
        }

        // Edge direction: depends_on -> task
        for task in self.store.tasks_sorted() {
            for dep in self.store.dependencies(&task.id) {
                if let (Some(&from), Some(&to)) = (node_map.get(dep), node_map.get(&task.id)) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        toposort(&graph, None)
            .map(|order| order.into_iter().map(|idx| graph[idx].clone()).collect())
            .map_err(|cycle| graph[cycle.node_id()].clone())
    }

    /// Checks both graph invariants
    pub fn verify(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        if let Err(task) = self.toposorted() {
            violations.push(Violation::Cycle { task });
        }

        for task in self.store.tasks_sorted() {
            let expected = status::derive(
                task.status(),
                task.resume_status(),
                self.store.all_dependencies_completed(&task.id),
            );
            if expected != task.status() {
                violations.push(Violation::InconsistentStatus {
                    task: task.id.clone(),
                    status: task.status(),
                    expected,
                });
            }
        }

        violations
    }

    /// Recomputes every task once, restoring status consistency
    pub fn reconcile(&mut self) -> Vec<StatusChange> {
        let seeds = self.topological_order();
        let changes = status::cascade(&mut self.store, seeds);
        if !changes.is_empty() {
            info!(changes = changes.len(), "reconciled task statuses");
        }
        changes
    }
}
