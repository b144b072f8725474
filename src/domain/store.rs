//! In-memory task store
//!
//! Holds task records plus the dependency edges in both directions:
//! `dependencies` maps a task to the tasks it depends on (in insertion order),
//! `dependents` maps a task to the tasks depending on it.
//!
//! The store itself only enforces structural consistency (both maps agree,
//! no dangling ids). Acyclicity and status consistency are the job of
//! [`TaskGraph`](super::TaskGraph), which is the only type allowed to mutate
//! a store once it is built.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::TaskId;
use super::task::{DependencyEdge, Task, TaskStatus, TaskSummary};

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Duplicate task record: {0}")]
    DuplicateTask(TaskId),

    #[error("Task {task} depends on unknown task {missing}")]
    DanglingDependency { task: TaskId, missing: TaskId },

    #[error("Task {0} depends on itself")]
    SelfLoop(TaskId),

    #[error("Task {task} lists dependency {depends_on} more than once")]
    DuplicateEdge { task: TaskId, depends_on: TaskId },

    #[error("Stored dependencies contain a cycle through task {0}")]
    CycleDetected(TaskId),
}

/// A task together with its ordered outgoing edges, as persisted on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(flatten)]
    pub task: Task,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<DependencyEdge>,
}

/// A directed edge as exposed in graph snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// The dependent task
    pub task: TaskId,
    /// The task it depends on
    pub depends_on: TaskId,
}

/// Owned table of tasks and edges
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: HashMap<TaskId, Task>,
    dependencies: HashMap<TaskId, Vec<DependencyEdge>>,
    dependents: HashMap<TaskId, Vec<TaskId>>,
}

impl TaskStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from persisted records, checking structural consistency
    ///
    /// Acyclicity is checked separately by [`TaskGraph::from_records`](super::TaskGraph::from_records).
    pub fn from_records(records: impl IntoIterator<Item = TaskRecord>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        let mut pending_edges = Vec::new();

        for mut record in records {
            let id = record.task.id.clone();
            if store.tasks.contains_key(&id) {
                return Err(StoreError::DuplicateTask(id));
            }
            record.task.normalize_resume_status();
            store.insert_task(record.task);
            pending_edges.push((id, record.depends_on));
        }

        for (id, edges) in pending_edges {
            for edge in edges {
                if edge.task == id {
                    return Err(StoreError::SelfLoop(id));
                }
                if !store.contains(&edge.task) {
                    return Err(StoreError::DanglingDependency {
                        task: id,
                        missing: edge.task,
                    });
                }
                if store.has_edge(&id, &edge.task) {
                    return Err(StoreError::DuplicateEdge {
                        task: id,
                        depends_on: edge.task,
                    });
                }
                store.insert_edge(&id, edge);
            }
        }

        Ok(store)
    }

    /// Exports all tasks with their edges, sorted by id
    pub fn to_records(&self) -> Vec<TaskRecord> {
        let mut records: Vec<_> = self
            .tasks
            .values()
            .map(|task| TaskRecord {
                task: task.clone(),
                depends_on: self.dependencies.get(&task.id).cloned().unwrap_or_default(),
            })
            .collect();
        records.sort_by(|a, b| a.task.id.cmp(&b.task.id));
        records
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterates over all tasks in arbitrary order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Returns all tasks sorted by creation time, then id
    pub fn tasks_sorted(&self) -> Vec<&Task> {
        let mut tasks: Vec<_> = self.tasks.values().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        tasks
    }

    /// Returns the status of a task, if it exists
    pub fn status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.tasks.get(id).map(Task::status)
    }

    /// Returns the outgoing edges of a task in insertion order
    pub fn dependency_edges(&self, id: &TaskId) -> &[DependencyEdge] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the direct dependencies of a task in insertion order
    pub fn dependencies(&self, id: &TaskId) -> impl Iterator<Item = &TaskId> {
        self.dependency_edges(id).iter().map(|edge| &edge.task)
    }

    /// Returns the direct dependents of a task in insertion order
    pub fn dependents(&self, id: &TaskId) -> &[TaskId] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns summaries of the tasks that directly depend on `id`
    pub fn dependent_summaries(&self, id: &TaskId) -> Vec<TaskSummary> {
        self.dependents(id)
            .iter()
            .filter_map(|dep| self.tasks.get(dep).map(Task::summary))
            .collect()
    }

    pub fn has_edge(&self, task: &TaskId, depends_on: &TaskId) -> bool {
        self.dependencies(task).any(|dep| dep == depends_on)
    }

    /// Returns every edge in the store, grouped by dependent in creation order
    pub fn edges(&self) -> Vec<Edge> {
        self.tasks_sorted()
            .into_iter()
            .flat_map(|task| {
                self.dependencies(&task.id).map(move |dep| Edge {
                    task: task.id.clone(),
                    depends_on: dep.clone(),
                })
            })
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(Vec::len).sum()
    }

    /// Returns true when every direct dependency of `id` is completed
    pub fn all_dependencies_completed(&self, id: &TaskId) -> bool {
        self.dependencies(id)
            .all(|dep| self.status(dep).is_some_and(|s| s.is_complete()))
    }

    pub(crate) fn insert_task(&mut self, task: Task) {
        self.tasks.insert(task.id.clone(), task);
    }

    /// Inserts an edge without any validation
    pub(crate) fn insert_edge(&mut self, task: &TaskId, edge: DependencyEdge) {
        self.dependents
            .entry(edge.task.clone())
            .or_default()
            .push(task.clone());
        self.dependencies.entry(task.clone()).or_default().push(edge);
    }

    /// Removes an edge, returning true if it existed
    pub(crate) fn remove_edge(&mut self, task: &TaskId, depends_on: &TaskId) -> bool {
        let Some(edges) = self.dependencies.get_mut(task) else {
            return false;
        };

        let before = edges.len();
        edges.retain(|edge| &edge.task != depends_on);
        let removed = edges.len() != before;
        if edges.is_empty() {
            self.dependencies.remove(task);
        }

        if let Some(back) = self.dependents.get_mut(depends_on) {
            back.retain(|dep| dep != task);
            if back.is_empty() {
                self.dependents.remove(depends_on);
            }
        }

        removed
    }

    /// Removes a task and every edge touching it
    ///
    /// Returns the removed task and its former dependents.
    pub(crate) fn remove_task(&mut self, id: &TaskId) -> Option<(Task, Vec<TaskId>)> {
        let task = self.tasks.remove(id)?;

        let former_dependents = self.dependents.remove(id).unwrap_or_default();
        for dependent in &former_dependents {
            if let Some(edges) = self.dependencies.get_mut(dependent) {
                edges.retain(|edge| &edge.task != id);
                if edges.is_empty() {
                    self.dependencies.remove(dependent);
                }
            }
        }

        let own_edges = self.dependencies.remove(id).unwrap_or_default();
        for edge in own_edges {
            if let Some(back) = self.dependents.get_mut(&edge.task) {
                back.retain(|dep| dep != id);
                if back.is_empty() {
                    self.dependents.remove(&edge.task);
                }
            }
        }

        Some((task, former_dependents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task(n: u32) -> Task {
        let id: TaskId = format!("t-{n:07x}").parse().unwrap();
        Task::new(id, format!("Task {n}"))
    }

    fn store_with(tasks: &[&Task]) -> TaskStore {
        let mut store = TaskStore::new();
        for task in tasks {
            store.insert_task((*task).clone());
        }
        store
    }

    #[test]
    fn edges_are_tracked_both_ways() {
        let a = make_task(1);
        let b = make_task(2);
        let mut store = store_with(&[&a, &b]);

        store.insert_edge(&b.id, DependencyEdge::new(a.id.clone()));

        assert!(store.has_edge(&b.id, &a.id));
        assert!(!store.has_edge(&a.id, &b.id));
        assert_eq!(store.dependencies(&b.id).collect::<Vec<_>>(), vec![&a.id]);
        assert_eq!(store.dependents(&a.id), &[b.id.clone()]);
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn dependency_order_is_insertion_order() {
        let a = make_task(1);
        let b = make_task(2);
        let c = make_task(3);
        let mut store = store_with(&[&a, &b, &c]);

        store.insert_edge(&a.id, DependencyEdge::new(c.id.clone()));
        store.insert_edge(&a.id, DependencyEdge::new(b.id.clone()));

        let deps: Vec<_> = store.dependencies(&a.id).cloned().collect();
        assert_eq!(deps, vec![c.id.clone(), b.id.clone()]);
    }

    #[test]
    fn remove_edge_cleans_both_maps() {
        let a = make_task(1);
        let b = make_task(2);
        let mut store = store_with(&[&a, &b]);
        store.insert_edge(&b.id, DependencyEdge::new(a.id.clone()));

        assert!(store.remove_edge(&b.id, &a.id));
        assert!(!store.remove_edge(&b.id, &a.id));
        assert!(store.dependents(&a.id).is_empty());
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn remove_task_drops_touching_edges() {
        let a = make_task(1);
        let b = make_task(2);
        let c = make_task(3);
        let mut store = store_with(&[&a, &b, &c]);
        // c -> b -> a
        store.insert_edge(&b.id, DependencyEdge::new(a.id.clone()));
        store.insert_edge(&c.id, DependencyEdge::new(b.id.clone()));

        let (removed, former) = store.remove_task(&b.id).unwrap();

        assert_eq!(removed.id, b.id);
        assert_eq!(former, vec![c.id.clone()]);
        assert!(store.dependents(&a.id).is_empty());
        assert_eq!(store.dependencies(&c.id).count(), 0);
        assert_eq!(store.edge_count(), 0);
        assert!(store.remove_task(&b.id).is_none());
    }

    #[test]
    fn all_dependencies_completed() {
        let mut a = make_task(1);
        let b = make_task(2);
        let mut store = store_with(&[&a, &b]);
        assert!(store.all_dependencies_completed(&b.id));

        store.insert_edge(&b.id, DependencyEdge::new(a.id.clone()));
        assert!(!store.all_dependencies_completed(&b.id));

        a.set_status(TaskStatus::Completed);
        store.insert_task(a);
        assert!(store.all_dependencies_completed(&b.id));
    }

    #[test]
    fn records_roundtrip() {
        let a = make_task(1);
        let b = make_task(2);
        let mut store = store_with(&[&a, &b]);
        store.insert_edge(&b.id, DependencyEdge::new(a.id.clone()));

        let rebuilt = TaskStore::from_records(store.to_records()).unwrap();

        assert_eq!(rebuilt.len(), 2);
        assert!(rebuilt.has_edge(&b.id, &a.id));
        assert_eq!(rebuilt.dependents(&a.id), &[b.id.clone()]);
    }

    #[test]
    fn from_records_normalizes_resume_status() {
        let record: TaskRecord = serde_json::from_value(serde_json::json!({
            "id": "t-0000001",
            "title": "Hand edited",
            "status": "in_progress",
            "resume_status": "pending",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "depends_on": [],
        }))
        .unwrap();
        let id = record.task.id.clone();

        let store = TaskStore::from_records(vec![record]).unwrap();
        assert_eq!(
            store.get(&id).unwrap().resume_status(),
            TaskStatus::InProgress
        );
    }

    #[test]
    fn from_records_rejects_structural_errors() {
        let a = make_task(1);
        let b = make_task(2);

        let dangling = vec![TaskRecord {
            task: a.clone(),
            depends_on: vec![DependencyEdge::new(b.id.clone())],
        }];
        assert!(matches!(
            TaskStore::from_records(dangling),
            Err(StoreError::DanglingDependency { .. })
        ));

        let self_loop = vec![TaskRecord {
            task: a.clone(),
            depends_on: vec![DependencyEdge::new(a.id.clone())],
        }];
        assert!(matches!(
            TaskStore::from_records(self_loop),
            Err(StoreError::SelfLoop(id)) if id == a.id
        ));

        let duplicate_edge = vec![
            TaskRecord {
                task: a.clone(),
                depends_on: vec![
                    DependencyEdge::new(b.id.clone()),
                    DependencyEdge::new(b.id.clone()),
                ],
            },
            TaskRecord {
                task: b.clone(),
                depends_on: vec![],
            },
        ];
        assert!(matches!(
            TaskStore::from_records(duplicate_edge),
            Err(StoreError::DuplicateEdge { .. })
        ));

        let duplicate_task = vec![
            TaskRecord {
                task: a.clone(),
                depends_on: vec![],
            },
            TaskRecord {
                task: a.clone(),
                depends_on: vec![],
            },
        ];
        assert!(matches!(
            TaskStore::from_records(duplicate_task),
            Err(StoreError::DuplicateTask(id)) if id == a.id
        ));
    }
}
