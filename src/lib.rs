//! taskdag - local-first task tracking over a dependency DAG
//!
//! Tasks depend on other tasks. The engine keeps the dependency edges
//! acyclic, derives `blocked` from incomplete dependencies, and cascades
//! status changes to every transitive dependent.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{GraphError, SharedGraph, Task, TaskGraph, TaskId, TaskStatus};
