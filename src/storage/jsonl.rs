//! JSONL storage for the task graph
//!
//! Tasks are stored in `.taskdag/tasks.jsonl` with one JSON object per line,
//! each carrying its ordered `depends_on` edges. A sibling lock file
//! serializes access: readers take a shared lock, and
//! [`GraphFile::transaction`] holds an exclusive lock across
//! load, mutate and save so two processes can never both pass a cycle check
//! and then commit conflicting edges.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use tracing::debug;

use crate::domain::{GraphError, TaskGraph, TaskRecord};

/// Store for the task graph in JSONL format
pub struct GraphFile {
    path: PathBuf,
}

impl GraphFile {
    /// Creates a graph file at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the default graph file for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".taskdag").join("tasks.jsonl"))
    }

    /// Returns the path to the data file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_file_name("graph.lock")
    }

    fn open_lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let lock_path = self.lock_path();
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))
    }

    /// Loads the graph under a shared lock
    pub fn load(&self) -> Result<TaskGraph> {
        let lock = self.open_lock()?;
        lock.lock_shared()
            .context("Failed to acquire read lock on task store")?;

        // Lock is released when `lock` is dropped
        self.read_graph()
    }

    /// Runs a graph operation atomically
    ///
    /// Holds an exclusive lock for the whole load, mutate, save sequence.
    /// When the operation fails nothing is written.
    pub fn transaction<T>(
        &self,
        op: impl FnOnce(&mut TaskGraph) -> std::result::Result<T, GraphError>,
    ) -> Result<T> {
        let lock = self.open_lock()?;
        lock.lock_exclusive()
            .context("Failed to acquire write lock on task store")?;

        let mut graph = self.read_graph()?;
        let value = op(&mut graph)?;
        self.write_graph(&graph)?;

        Ok(value)
    }

    /// Replaces the stored graph under an exclusive lock
    pub fn save(&self, graph: &TaskGraph) -> Result<()> {
        let lock = self.open_lock()?;
        lock.lock_exclusive()
            .context("Failed to acquire write lock on task store")?;

        self.write_graph(graph)
    }

    fn read_graph(&self) -> Result<TaskGraph> {
        if !self.path.exists() {
            return Ok(TaskGraph::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open task store: {}", self.path.display()))?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let record: TaskRecord = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse task at line {}", line_num + 1))?;
            records.push(record);
        }

        debug!(path = %self.path.display(), tasks = records.len(), "loaded task store");
        TaskGraph::from_records(records)
            .with_context(|| format!("Invalid task store: {}", self.path.display()))
    }

    fn write_graph(&self, graph: &TaskGraph) -> Result<()> {
        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            let mut writer = BufWriter::new(&file);

            // Records come sorted by ID for consistent output
            for record in graph.to_records() {
                let line = serde_json::to_string(&record).context("Failed to serialize task")?;
                writeln!(writer, "{}", line).context("Failed to write task")?;
            }

            writer.flush().context("Failed to flush task store")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        debug!(path = %self.path.display(), tasks = graph.len(), "saved task store");
        Ok(())
    }
}
