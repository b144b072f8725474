//! Task domain model
//!
//! Tasks are units of work linked by "depends on" edges. A task's status is
//! partly user-driven (pending, in progress, completed) and partly derived
//! (blocked), so the status fields are only writable from inside the domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::id::TaskId;

/// Maximum length of a task title, in characters
pub const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Error, PartialEq)]
pub enum TaskError {
    #[error("Task title must not be empty")]
    EmptyTitle,

    #[error("Task title is {0} characters long, the limit is {MAX_TITLE_LEN}")]
    TitleTooLong(usize),

    #[error("Unknown status '{0}': expected pending, in_progress, completed or blocked")]
    UnknownStatus(String),
}

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Blocked,
    ];

    /// Returns true if this status represents completion
    pub fn is_complete(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Returns true if the engine is holding this task back
    pub fn is_blocked(&self) -> bool {
        matches!(self, TaskStatus::Blocked)
    }

    /// Returns true for the statuses a user can progress a task through
    /// while it is unblocked
    pub fn is_resumable(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            _ => Err(TaskError::UnknownStatus(s.to_string())),
        }
    }
}

/// A directed "depends on" edge, stored on the dependent side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The task that must be completed first
    pub task: TaskId,

    /// When the edge was added
    pub created_at: DateTime<Utc>,
}

impl DependencyEdge {
    pub fn new(task: TaskId) -> Self {
        Self {
            task,
            created_at: Utc::now(),
        }
    }
}

/// Payload for creating a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update of a task's descriptive fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,

    /// `Some(None)` clears the description
    #[serde(default)]
    pub description: Option<Option<String>>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// Validates and normalizes a task title
pub fn validate_title(title: &str) -> Result<String, TaskError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TaskError::EmptyTitle);
    }

    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(TaskError::TitleTooLong(len));
    }

    Ok(title.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.trim().is_empty())
}

/// A task record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Human-readable title
    pub title: String,

    /// Optional free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Current status (derived or user-set)
    status: TaskStatus,

    /// Last status the user progressed the task to while it was unblocked
    #[serde(default)]
    resume_status: TaskStatus,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,

    /// When the task was completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new pending task
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            description: None,
            status: TaskStatus::Pending,
            resume_status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Creates a task from a validated creation payload
    pub fn from_new(id: TaskId, new: NewTask) -> Result<Self, TaskError> {
        let title = validate_title(&new.title)?;
        let mut task = Self::new(id, title);
        task.description = normalize_description(new.description);
        Ok(task)
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn resume_status(&self) -> TaskStatus {
        self.resume_status
    }

    /// Writes a new status and keeps the derived bookkeeping in sync
    pub(crate) fn set_status(&mut self, status: TaskStatus) {
        if self.status == status {
            return;
        }

        self.status = status;
        if status.is_resumable() {
            self.resume_status = status;
        }

        self.completed_at = if status.is_complete() {
            Some(Utc::now())
        } else {
            None
        };
        self.touch();
    }

    /// Brings a loaded record's resume status in line with its status
    ///
    /// While a task is pending or in progress, that status is by definition
    /// the one to resume to.
    pub(crate) fn normalize_resume_status(&mut self) {
        if self.status.is_resumable() {
            self.resume_status = self.status;
        }
    }

    /// Applies a descriptive update, validating the title
    pub fn apply_update(&mut self, update: TaskUpdate) -> Result<bool, TaskError> {
        let title = update.title.as_deref().map(validate_title).transpose()?;

        let mut changed = false;
        if let Some(title) = title {
            if title != self.title {
                self.title = title;
                changed = true;
            }
        }
        if let Some(description) = update.description {
            let description = normalize_description(description);
            if description != self.description {
                self.description = description;
                changed = true;
            }
        }

        if changed {
            self.touch();
        }
        Ok(changed)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Returns a short summary of this task
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            status: self.status,
        }
    }
}

/// Compact view of a task used in listings and conflict reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
}

impl fmt::Display for TaskSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}", self.id, self.status, self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task() -> Task {
        Task::new(TaskId::new("Test", Utc::now()), "Test")
    }

    #[test]
    fn new_task_is_pending() {
        let task = make_task();
        assert_eq!(task.status(), TaskStatus::Pending);
        assert_eq!(task.resume_status(), TaskStatus::Pending);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn status_parsing() {
        assert_eq!("pending".parse::<TaskStatus>().unwrap(), TaskStatus::Pending);
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("IN_PROGRESS".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("done".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
        assert!("finished".parse::<TaskStatus>().is_err());

        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn set_status_tracks_resume_and_completion() {
        let mut task = make_task();

        task.set_status(TaskStatus::InProgress);
        assert_eq!(task.resume_status(), TaskStatus::InProgress);

        task.set_status(TaskStatus::Blocked);
        assert_eq!(task.status(), TaskStatus::Blocked);
        assert_eq!(task.resume_status(), TaskStatus::InProgress);

        task.set_status(TaskStatus::Completed);
        assert!(task.completed_at.is_some());
        assert_eq!(task.resume_status(), TaskStatus::InProgress);

        task.set_status(TaskStatus::Pending);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn title_validation() {
        assert_eq!(validate_title("  Build API "), Ok("Build API".to_string()));
        assert_eq!(validate_title("   "), Err(TaskError::EmptyTitle));

        let long = "x".repeat(MAX_TITLE_LEN + 1);
        assert_eq!(validate_title(&long), Err(TaskError::TitleTooLong(201)));
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN)).is_ok());
    }

    #[test]
    fn from_new_drops_blank_description() {
        let id = TaskId::new("T", Utc::now());
        let task = Task::from_new(id, NewTask::new("T").with_description("  ")).unwrap();
        assert!(task.description.is_none());
    }

    #[test]
    fn apply_update_reports_changes() {
        let mut task = make_task();

        let changed = task
            .apply_update(TaskUpdate {
                title: Some("Renamed".to_string()),
                description: Some(Some("Details".to_string())),
            })
            .unwrap();
        assert!(changed);
        assert_eq!(task.title, "Renamed");
        assert_eq!(task.description.as_deref(), Some("Details"));

        let unchanged = task
            .apply_update(TaskUpdate {
                title: Some("Renamed".to_string()),
                description: None,
            })
            .unwrap();
        assert!(!unchanged);

        task.apply_update(TaskUpdate {
            title: None,
            description: Some(None),
        })
        .unwrap();
        assert!(task.description.is_none());
    }

    #[test]
    fn apply_update_rejects_bad_title_without_changes() {
        let mut task = make_task();
        let before = task.clone();

        let result = task.apply_update(TaskUpdate {
            title: Some(String::new()),
            description: Some(Some("ignored".to_string())),
        });

        assert_eq!(result, Err(TaskError::EmptyTitle));
        assert_eq!(task, before);
    }

    #[test]
    fn normalize_resume_status_follows_unblocked_status() {
        let json = r#"{"id":"t-0000001","title":"T","status":"in_progress","resume_status":"pending","created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}"#;
        let mut task: Task = serde_json::from_str(json).unwrap();

        task.normalize_resume_status();
        assert_eq!(task.resume_status(), TaskStatus::InProgress);

        // Blocked tasks keep what they will return to
        task.set_status(TaskStatus::Blocked);
        task.resume_status = TaskStatus::Pending;
        task.normalize_resume_status();
        assert_eq!(task.resume_status(), TaskStatus::Pending);
    }

    #[test]
    fn serde_roundtrip_keeps_private_status() {
        let mut task = make_task();
        task.set_status(TaskStatus::InProgress);
        task.set_status(TaskStatus::Blocked);

        let json = serde_json::to_string(&task).unwrap();
        let parsed: Task = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.status(), TaskStatus::Blocked);
        assert_eq!(parsed.resume_status(), TaskStatus::InProgress);
    }
}
