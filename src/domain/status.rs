//! Status engine
//!
//! Two halves:
//! - [`derive`] is the finite-state table that maps a task's current status
//!   and the completion of its direct dependencies to the status it must have.
//! - [`cascade`] re-applies that table across the reverse edges of the graph
//!   with an explicit worklist, so changes propagate to every transitive
//!   dependent without recursion.
//!
//! [`validate_manual`] holds the rules for user-initiated status changes.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::id::TaskId;
use super::store::TaskStore;
use super::task::TaskStatus;

/// Derived status for a task
///
/// `resume` is the last status the user progressed the task to while it was
/// unblocked; it is what a blocked task returns to once its dependencies are
/// all completed.
pub fn derive(current: TaskStatus, resume: TaskStatus, all_dependencies_completed: bool) -> TaskStatus {
    use TaskStatus::*;

    match (current, all_dependencies_completed) {
        (Completed, _) => Completed,
        (Pending, true) => Pending,
        (InProgress, true) => InProgress,
        (Blocked, true) => match resume {
            InProgress => InProgress,
            _ => Pending,
        },
        (Pending | InProgress | Blocked, false) => Blocked,
    }
}

/// Why a manual status change was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRejection {
    /// The task is blocked and stays under engine control
    Blocked,
    /// `blocked` is only ever set by the engine
    EngineOnly,
    /// The change skips a step or moves backwards in a way that is not allowed
    NotAllowed,
    /// The command only applies to tasks in the given status
    RequiresStatus(TaskStatus),
}

/// Validates a user-initiated status change
///
/// Returns `Ok(false)` when the requested status equals the current one.
pub fn validate_manual(current: TaskStatus, requested: TaskStatus) -> Result<bool, TransitionRejection> {
    use TaskStatus::*;

    if current == Blocked {
        return Err(TransitionRejection::Blocked);
    }
    if current == requested {
        return Ok(false);
    }

    match (current, requested) {
        (_, Blocked) => Err(TransitionRejection::EngineOnly),
        (Pending, InProgress) | (InProgress, Completed) => Ok(true),
        // Pausing work and explicitly reopening a finished task
        (InProgress, Pending) | (Completed, Pending) => Ok(true),
        _ => Err(TransitionRejection::NotAllowed),
    }
}

/// A status change applied by the engine or the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub task: TaskId,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// Recomputes the status of a single task from its dependencies
///
/// Returns the change if the status moved.
pub(crate) fn recompute(store: &mut TaskStore, id: &TaskId) -> Option<StatusChange> {
    let all_completed = store.all_dependencies_completed(id);
    let task = store.get_mut(id)?;

    let from = task.status();
    let to = derive(from, task.resume_status(), all_completed);
    if from == to {
        return None;
    }

    task.set_status(to);
    Some(StatusChange {
        task: id.clone(),
        from,
        to,
    })
}

/// Recomputes `seeds` and, transitively, the dependents of every task whose
/// status changed
///
/// Each task is recomputed at most once. A task whose status does not change
/// stops the propagation along its branch. Engine-driven changes never move a
/// task into or out of `completed`, and only completion feeds [`derive`], so
/// a task's inputs are settled by the time it is popped.
pub(crate) fn cascade(store: &mut TaskStore, seeds: impl IntoIterator<Item = TaskId>) -> Vec<StatusChange> {
    let mut queue: VecDeque<TaskId> = VecDeque::new();
    let mut visited: HashSet<TaskId> = HashSet::new();
    let mut changes = Vec::new();

    for seed in seeds {
        if visited.insert(seed.clone()) {
            queue.push_back(seed);
        }
    }

    while let Some(id) = queue.pop_front() {
        let Some(change) = recompute(store, &id) else {
            debug!(task = %id, "status unchanged, pruning cascade branch");
            continue;
        };

        debug!(task = %id, from = %change.from, to = %change.to, "cascade updated status");
        for dependent in store.dependents(&id) {
            if visited.insert(dependent.clone()) {
                queue.push_back(dependent.clone());
            }
        }
        changes.push(change);
    }

    changes
}
