//! Output formatting for CLI commands

use serde::Serialize;

use crate::domain::{StatusChange, TaskSummary};
use crate::storage;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl From<storage::OutputFormat> for OutputFormat {
    fn from(format: storage::OutputFormat) -> Self {
        match format {
            storage::OutputFormat::Text => OutputFormat::Text,
            storage::OutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Text => {
                // Callers render their own text; this is the fallback
                if let Ok(json) = serde_json::to_string_pretty(data) {
                    println!("{}", json);
                }
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(data) {
                    println!("{}", json);
                }
            }
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Prints a task table (text only)
    pub fn summaries(&self, tasks: &[TaskSummary]) {
        if self.is_json() {
            return;
        }
        println!("{:<12} {:<12} TITLE", "ID", "STATUS");
        println!("{}", "-".repeat(60));
        for task in tasks {
            println!("{:<12} {:<12} {}", task.id, task.status, task.title);
        }
    }

    /// Prints the status changes an operation caused (text only)
    pub fn changes(&self, changes: &[StatusChange]) {
        if self.is_json() || changes.is_empty() {
            return;
        }
        println!("Status changes:");
        for change in changes {
            println!("  {}: {} -> {}", change.task, change.from, change.to);
        }
    }
}
