//! Cycle detection for proposed dependency edges
//!
//! Adding `from -> to` ("from depends on to") closes a cycle exactly when
//! `from` is already reachable from `to` along dependency edges.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::id::TaskId;
use super::store::TaskStore;

/// Outcome of a cycle check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleCheck {
    pub has_cycle: bool,

    /// The closed walk through the proposed edge, starting and ending at
    /// the proposed dependency. Empty when there is no cycle.
    pub path: Vec<TaskId>,
}

impl CycleCheck {
    fn clear() -> Self {
        Self::default()
    }
}

/// Checks whether adding "`from` depends on `to`" would create a cycle
///
/// Runs an iterative depth-first search from `to`, following dependency
/// edges in insertion order. On success the returned path lists the walk
/// `to, ..., from, to`: the existing chain from `to` down to `from`, closed
/// by the proposed edge. Never mutates the store. Self-dependencies are
/// reported as the one-step cycle `[from, from]`.
pub fn would_create_cycle(store: &TaskStore, from: &TaskId, to: &TaskId) -> CycleCheck {
    if from == to {
        return CycleCheck {
            has_cycle: true,
            path: vec![from.clone(), from.clone()],
        };
    }

    let mut visited: HashSet<&TaskId> = HashSet::new();
    // Each frame is a node on the current path plus the index of the next
    // dependency edge to explore from it.
    let mut stack: Vec<(&TaskId, usize)> = vec![(to, 0)];
    visited.insert(to);

    while let Some(frame) = stack.last_mut() {
        let node = frame.0;
        if node == from {
            let mut path: Vec<TaskId> = stack.iter().map(|(id, _)| (*id).clone()).collect();
            path.push(to.clone());
            return CycleCheck {
                has_cycle: true,
                path,
            };
        }

        match store.dependency_edges(node).get(frame.1) {
            Some(edge) => {
                frame.1 += 1;
                if visited.insert(&edge.task) {
                    stack.push((&edge.task, 0));
                }
            }
            None => {
                stack.pop();
            }
        }
    }

    CycleCheck::clear()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{DependencyEdge, Task};

    fn add_tasks(store: &mut TaskStore, names: &[&str]) -> Vec<TaskId> {
        names
            .iter()
            .enumerate()
            .map(|(n, name)| {
                let id: TaskId = format!("t-{n:07x}").parse().unwrap();
                store.insert_task(Task::new(id.clone(), *name));
                id
            })
            .collect()
    }

    fn depend(store: &mut TaskStore, task: &TaskId, on: &TaskId) {
        store.insert_edge(task, DependencyEdge::new(on.clone()));
    }

    #[test]
    fn no_cycle_in_empty_neighbourhood() {
        let mut store = TaskStore::new();
        let ids = add_tasks(&mut store, &["A", "B"]);

        let check = would_create_cycle(&store, &ids[0], &ids[1]);
        assert!(!check.has_cycle);
        assert!(check.path.is_empty());
    }

    #[test]
    fn closing_a_chain_reports_the_walk() {
        let mut store = TaskStore::new();
        let ids = add_tasks(&mut store, &["A", "B", "C"]);
        let (a, b, c) = (&ids[0], &ids[1], &ids[2]);
        // A depends on B, B depends on C
        depend(&mut store, a, b);
        depend(&mut store, b, c);

        // C depends on A would close the loop
        let check = would_create_cycle(&store, c, a);
        assert!(check.has_cycle);
        assert_eq!(check.path, vec![a.clone(), b.clone(), c.clone(), a.clone()]);
    }

    #[test]
    fn path_skips_dead_end_branches() {
        let mut store = TaskStore::new();
        let ids = add_tasks(&mut store, &["A", "B", "C", "D"]);
        let (a, b, c, d) = (&ids[0], &ids[1], &ids[2], &ids[3]);
        // A depends on D (dead end) and on B; B depends on C
        depend(&mut store, a, d);
        depend(&mut store, a, b);
        depend(&mut store, b, c);

        let check = would_create_cycle(&store, c, a);
        assert!(check.has_cycle);
        assert_eq!(check.path, vec![a.clone(), b.clone(), c.clone(), a.clone()]);
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let mut store = TaskStore::new();
        let ids = add_tasks(&mut store, &["A", "B", "C", "D"]);
        let (a, b, c, d) = (&ids[0], &ids[1], &ids[2], &ids[3]);
        depend(&mut store, a, b);
        depend(&mut store, a, c);
        depend(&mut store, b, d);
        depend(&mut store, c, d);

        // Another edge into the shared bottom task is fine
        assert!(!would_create_cycle(&store, a, d).has_cycle);
        // D depending on A is not
        let check = would_create_cycle(&store, d, a);
        assert!(check.has_cycle);
        assert_eq!(check.path.first(), Some(a));
        assert_eq!(check.path.last(), Some(a));
        assert!(check.path.contains(d));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut store = TaskStore::new();
        let ids = add_tasks(&mut store, &["A"]);

        let check = would_create_cycle(&store, &ids[0], &ids[0]);
        assert!(check.has_cycle);
        assert_eq!(check.path, vec![ids[0].clone(), ids[0].clone()]);
    }

    #[test]
    fn check_does_not_mutate_store() {
        let mut store = TaskStore::new();
        let ids = add_tasks(&mut store, &["A", "B"]);
        depend(&mut store, &ids[0], &ids[1]);

        let _ = would_create_cycle(&store, &ids[1], &ids[0]);
        assert_eq!(store.edge_count(), 1);
        assert!(!store.has_edge(&ids[1], &ids[0]));
    }

    #[test]
    fn long_chain_does_not_overflow() {
        let mut store = TaskStore::new();
        let names: Vec<String> = (0..5_000).map(|i| format!("T{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let ids = add_tasks(&mut store, &refs);
        for pair in ids.windows(2) {
            depend(&mut store, &pair[0], &pair[1]);
        }

        let check = would_create_cycle(&store, &ids[ids.len() - 1], &ids[0]);
        assert!(check.has_cycle);
        assert_eq!(check.path.len(), ids.len() + 1);
    }
}
