//! Domain models for taskdag
//!
//! Contains the dependency graph engine without any I/O concerns.

mod id;
mod task;
mod store;
mod cycle;
mod status;
mod graph;
mod shared;

pub use id::{IdError, TaskId};
pub use task::{
    validate_title, DependencyEdge, NewTask, Task, TaskError, TaskStatus, TaskSummary, TaskUpdate,
    MAX_TITLE_LEN,
};
pub use store::{Edge, StoreError, TaskRecord, TaskStore};
pub use cycle::{would_create_cycle, CycleCheck};
pub use status::{derive, validate_manual, StatusChange, TransitionRejection};
pub use graph::{
    Deleted, DependencyView, GraphError, GraphSnapshot, Readiness, TaskGraph, TaskView, Updated,
    Violation,
};
pub use shared::SharedGraph;
