//! # Storage Layer
//!
//! Persistence for taskdag with git-friendly file formats.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks and edges | JSONL (one task per line) | `.taskdag/tasks.jsonl` |
//! | Config | TOML | `.taskdag/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`GraphFile`] serializes processes through an `fs2` lock on
//!   `.taskdag/graph.lock`
//! - All writes are atomic (temp file + rename)
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for accessing a taskdag project
//! - [`GraphFile`] - Load, save and transact on the task graph
//! - [`Config`] - Project and global configuration

mod jsonl;
mod config;
mod project;

pub use jsonl::GraphFile;
pub use config::{Config, ConfigError, OutputFormat, Settings, PROJECT_DIR};
pub use project::{Project, ProjectError};
