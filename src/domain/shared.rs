//! Thread-safe handle to a task graph
//!
//! Mutations take the write lock for the whole operation, so a cycle check
//! and the edge insert it guards can never interleave with another writer.
//! Reads take the read lock and copy out what they need, so they never see a
//! cascade half-way through.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::graph::{GraphSnapshot, TaskGraph};

/// Cloneable, shareable handle to a [`TaskGraph`]
#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<RwLock<TaskGraph>>,
}

impl SharedGraph {
    pub fn new(graph: TaskGraph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    // Facade operations validate before they mutate, so a poisoned lock
    // still guards a consistent graph.
    fn read_guard(&self) -> RwLockReadGuard<'_, TaskGraph> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, TaskGraph> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs a read-only query against a consistent view of the graph
    pub fn read<T>(&self, f: impl FnOnce(&TaskGraph) -> T) -> T {
        f(&*self.read_guard())
    }

    /// Runs a mutating operation with exclusive access
    pub fn write<T>(&self, f: impl FnOnce(&mut TaskGraph) -> T) -> T {
        f(&mut *self.write_guard())
    }

    /// Returns a consistent copy of all tasks and edges
    pub fn snapshot(&self) -> GraphSnapshot {
        self.read(TaskGraph::snapshot)
    }

    /// Returns a full copy of the graph
    pub fn to_graph(&self) -> TaskGraph {
        self.read(TaskGraph::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GraphError, NewTask, TaskId, TaskStatus};
    use std::thread;

    #[test]
    fn concurrent_opposite_edges_never_form_a_cycle() {
        for _ in 0..50 {
            let shared = SharedGraph::default();
            let a = shared.write(|g| g.create_task(NewTask::new("A")).unwrap().id);
            let b = shared.write(|g| g.create_task(NewTask::new("B")).unwrap().id);

            let handles: Vec<_> = [(a.clone(), b.clone()), (b.clone(), a.clone())]
                .into_iter()
                .map(|(from, to)| {
                    let shared = shared.clone();
                    thread::spawn(move || shared.write(|g| g.add_dependency(&from, &to)))
                })
                .collect();

            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            let ok = results.iter().filter(|r| r.is_ok()).count();
            let cycles = results
                .iter()
                .filter(|r| matches!(r, Err(GraphError::CircularDependency { .. })))
                .count();

            assert_eq!((ok, cycles), (1, 1));
            assert_eq!(shared.snapshot().dependencies.len(), 1);
            assert!(shared.read(|g| g.verify().is_empty()));
        }
    }

    #[test]
    fn readers_see_whole_cascades() {
        let shared = SharedGraph::default();
        let root = shared.write(|g| g.create_task(NewTask::new("root")).unwrap().id);
        let leaves: Vec<TaskId> = (0..20)
            .map(|i| {
                shared.write(|g| {
                    let id = g.create_task(NewTask::new(format!("leaf {i}"))).unwrap().id;
                    g.add_dependency(&id, &root).unwrap();
                    id
                })
            })
            .collect();

        let reader = {
            let shared = shared.clone();
            let leaves = leaves.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let statuses: Vec<TaskStatus> = shared.read(|g| {
                        leaves
                            .iter()
                            .filter_map(|id| g.store().status(id))
                            .collect()
                    });
                    let blocked = statuses.iter().filter(|s| s.is_blocked()).count();
                    assert!(blocked == 0 || blocked == statuses.len());
                }
            })
        };

        shared.write(|g| g.set_status(&root, TaskStatus::InProgress)).unwrap();
        shared.write(|g| g.set_status(&root, TaskStatus::Completed)).unwrap();
        reader.join().unwrap();

        assert!(shared.read(|g| g.blocked_tasks().is_empty()));
    }
}
