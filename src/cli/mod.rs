//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project setup | `init` |
//! | Task | Work items and status | `task add`, `task start`, `task done`, `task delete` |
//! | Dep | Dependency edges | `dep add`, `dep remove`, `dep check` |
//! | Query | Graph state | `ready`, `blocked`, `graph`, `order`, `check` |
//!
//! All commands accept `--format text|json`. Logs go to stderr; raise the
//! level with `-v` or `--log-level`.
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod logging;
mod task;
mod dep;
mod query;

pub use app::{run, Cli, Commands};
pub use logging::LogLevel;
pub use output::{Output, OutputFormat};
