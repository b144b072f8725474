//! Configuration handling for taskdag
//!
//! Configuration is stored in `.taskdag/config.toml` (project) and
//! `config.toml` in the platform config directory (global). Project values
//! override global ones.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the per-project data directory
pub const PROJECT_DIR: &str = ".taskdag";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level '{0}': expected error, warn, info, debug or trace")]
    InvalidLogLevel(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Settings shared by the project and global files
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Output format when `--format` is not given
    pub default_format: Option<OutputFormat>,

    /// Log level when neither a flag nor `TASKDAG_LOG` is set
    pub log_level: Option<String>,
}

impl Settings {
    fn validate(self) -> Result<Self, ConfigError> {
        if let Some(level) = &self.log_level {
            if level.parse::<tracing::Level>().is_err() {
                return Err(ConfigError::InvalidLogLevel(level.clone()));
            }
        }
        Ok(self)
    }

    /// Fills unset values from a lower-priority source
    fn or(self, fallback: Settings) -> Settings {
        Settings {
            default_format: self.default_format.or(fallback.default_format),
            log_level: self.log_level.or(fallback.log_level),
        }
    }
}

/// Combined configuration (global + project)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub project: Settings,
    pub global: Settings,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project_root = Self::find_project_root();
        let project = match &project_root {
            Some(root) => Self::load_project_config(root)?,
            None => Settings::default(),
        };

        Ok(Self {
            project,
            global,
            project_root,
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        Ok(Self {
            project: Self::load_project_config(project_root)?,
            global: Self::load_global()?,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "taskdag", "taskdag").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Project settings with global settings filling the gaps
    pub fn effective(&self) -> Settings {
        self.project.clone().or(self.global.clone())
    }

    /// The output format to use when no flag is given
    pub fn default_format(&self) -> OutputFormat {
        self.effective().default_format.unwrap_or_default()
    }

    /// The configured log level, if any
    pub fn log_level(&self) -> Option<String> {
        self.effective().log_level
    }

    fn load_global() -> Result<Settings> {
        match Self::global_config_dir() {
            Some(dir) => Self::load_file(&dir.join("config.toml"))
                .context("Failed to load global config"),
            None => Ok(Settings::default()),
        }
    }

    fn load_project_config(project_root: &Path) -> Result<Settings> {
        Self::load_file(&project_root.join(PROJECT_DIR).join("config.toml"))
            .context("Failed to load project config")
    }

    fn load_file(path: &Path) -> Result<Settings> {
        if !path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let settings: Settings =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(settings.validate()?)
    }

    /// Finds the project root by looking for a `.taskdag/` directory
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(&current)
    }

    /// Walks up from `start` looking for a `.taskdag/` directory
    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Returns the project root, or an error if not in a project
    pub fn require_project_root(&self) -> Result<&Path> {
        self.project_root
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Not in a taskdag project. Run 'taskdag init' first."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config::default();

        assert_eq!(config.default_format(), OutputFormat::Text);
        assert_eq!(config.log_level(), None);
        assert!(config.require_project_root().is_err());
    }

    #[test]
    fn parse_settings() {
        let toml = r#"
default_format = "json"
log_level = "debug"
"#;

        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.default_format, Some(OutputFormat::Json));
        assert_eq!(settings.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn project_overrides_global() {
        let config = Config {
            project: Settings {
                default_format: None,
                log_level: Some("info".to_string()),
            },
            global: Settings {
                default_format: Some(OutputFormat::Json),
                log_level: Some("trace".to_string()),
            },
            project_root: None,
        };

        assert_eq!(config.default_format(), OutputFormat::Json);
        assert_eq!(config.log_level().as_deref(), Some("info"));
    }

    #[test]
    fn load_file_rejects_bad_log_level() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "log_level = \"loud\"\n").unwrap();

        let err = Config::load_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid log level 'loud'"));
    }

    #[test]
    fn load_file_rejects_unparseable_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_format = [").unwrap();

        assert!(Config::load_file(&path).is_err());
    }

    #[test]
    fn missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let settings = Config::load_file(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn find_project_root_walks_up() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(PROJECT_DIR)).unwrap();

        let sub_dir = dir.path().join("sub").join("dir");
        fs::create_dir_all(&sub_dir).unwrap();

        let root = Config::find_project_root_from(&sub_dir);
        assert_eq!(root.as_deref(), Some(dir.path()));
    }
}
