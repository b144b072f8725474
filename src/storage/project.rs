//! Project management
//!
//! Handles project initialization and provides access to the graph file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::info;

use super::config::PROJECT_DIR;
use super::{Config, GraphFile};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a taskdag project. Run 'taskdag init' first.")]
    NotInProject,
}

const DEFAULT_CONFIG: &str = r#"# taskdag configuration

# Output format when --format is not given: "text" or "json"
# default_format = "text"

# Log level when neither --log-level nor TASKDAG_LOG is set
# log_level = "warn"
"#;

const GITIGNORE: &str = r#"# Lock and temp files are recreated on demand
graph.lock
*.tmp
"#;

/// A taskdag project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(PROJECT_DIR).is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    ///
    /// Existing files are left alone, so running this twice is harmless.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let data_dir = root.join(PROJECT_DIR);

        fs::create_dir_all(&data_dir).with_context(|| {
            format!("Failed to create {} directory: {}", PROJECT_DIR, data_dir.display())
        })?;

        let config_path = data_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = data_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, GITIGNORE).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        info!(root = %root.display(), "initialized project");
        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the `.taskdag` directory path
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the graph file
    pub fn graph_file(&self) -> GraphFile {
        GraphFile::for_project(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewTask;
    use crate::storage::Settings;
    use tempfile::TempDir;

    #[test]
    fn init_creates_structure() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.data_dir().is_dir());
        assert!(project.data_dir().join("config.toml").is_file());
        assert!(project.data_dir().join(".gitignore").is_file());
    }

    #[test]
    fn default_config_parses_to_defaults() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert_eq!(project.config().project, Settings::default());
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();

        let project = Project::init(dir.path()).unwrap();
        project
            .graph_file()
            .transaction(|g| g.create_task(NewTask::new("keep me")))
            .unwrap();

        let project = Project::init(dir.path()).unwrap();
        assert_eq!(project.graph_file().load().unwrap().len(), 1);
    }

    #[test]
    fn open_existing_project() {
        let dir = TempDir::new().unwrap();
        Project::init(dir.path()).unwrap();

        let project = Project::open(dir.path()).unwrap();
        assert_eq!(project.root(), dir.path());
    }

    #[test]
    fn open_non_project_fails() {
        let dir = TempDir::new().unwrap();
        let err = Project::open(dir.path()).err().unwrap();

        assert!(matches!(
            err.downcast_ref::<ProjectError>(),
            Some(ProjectError::NotInProject)
        ));
    }

    #[test]
    fn graph_file_lives_in_data_dir() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        let file = project.graph_file();
        assert!(file.path().ends_with(".taskdag/tasks.jsonl"));
    }
}
