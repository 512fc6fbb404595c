//! JSONL storage for projects
//!
//! Projects are stored in `.prodtrack/projects.jsonl` with one JSON object
//! per line. Readers take a shared lock on the data file; writers serialize
//! on `.prodtrack/projects.lock` and replace the data file atomically.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use super::workspace::WORKSPACE_DIR;
use crate::domain::{Project, ProjectId, Transition};

/// Store for project records in JSONL format
pub struct ProjectStore {
    path: PathBuf,
}

impl ProjectStore {
    /// Creates a new project store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the default store for a workspace
    pub fn for_workspace(root: &Path) -> Self {
        Self::new(root.join(WORKSPACE_DIR).join("projects.jsonl"))
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all projects from the store.
    ///
    /// Later lines win when an id appears more than once.
    pub fn read_all(&self) -> Result<BTreeMap<ProjectId, Project>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open project store: {}", self.path.display()))?;

        file.lock_shared()
            .context("Failed to acquire read lock on project store")?;

        let reader = BufReader::new(&file);
        let mut projects = BTreeMap::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let project: Project = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse project at line {}", line_num + 1))?;
            project
                .validate()
                .with_context(|| format!("Invalid project at line {}", line_num + 1))?;

            projects.insert(project.id.clone(), project);
        }

        // Lock is released when file is dropped
        Ok(projects)
    }

    /// Reads active projects in id order
    pub fn read_active(&self) -> Result<Vec<Project>> {
        Ok(self
            .read_all()?
            .into_values()
            .filter(|p| p.active)
            .collect())
    }

    /// Looks up a single project
    pub fn get(&self, id: &ProjectId) -> Result<Project> {
        self.read_all()?
            .remove(id)
            .ok_or_else(|| anyhow::anyhow!("Project not found: {}", id))
    }

    /// Path of the lock file serializing writers
    pub fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Takes the writer lock; it is released when the returned file is dropped.
    ///
    /// Not reentrant: a second call from the same process blocks.
    fn lock(&self) -> Result<File> {
        self.ensure_parent()?;
        let lock_path = self.lock_path();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

        file.lock_exclusive()
            .context("Failed to acquire write lock on project store")?;

        Ok(file)
    }

    fn ensure_parent(&self) -> Result<&Path> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        Ok(parent)
    }

    /// Writes all projects to the store (full rewrite)
    pub fn write_all(&self, projects: &BTreeMap<ProjectId, Project>) -> Result<()> {
        let _lock = self.lock()?;
        self.rewrite(projects)
    }

    /// Full rewrite through a uniquely named temp file; caller holds the lock
    fn rewrite(&self, projects: &BTreeMap<ProjectId, Project>) -> Result<()> {
        let dir = self.ensure_parent()?;

        let mut temp = tempfile::Builder::new()
            .prefix("projects.")
            .suffix(".tmp")
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;

        {
            let mut writer = BufWriter::new(&mut temp);

            // BTreeMap iteration keeps the file sorted by id
            for project in projects.values() {
                let line = serde_json::to_string(project).context("Failed to serialize project")?;
                writeln!(writer, "{}", line).context("Failed to write project")?;
            }

            writer.flush().context("Failed to flush project store")?;
        }

        temp.persist(&self.path).with_context(|| {
            format!("Failed to replace project store: {}", self.path.display())
        })?;

        Ok(())
    }

    /// Appends a single project (used for adds without a full rewrite)
    pub fn append(&self, project: &Project) -> Result<()> {
        let _lock = self.lock()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open project store: {}", self.path.display()))?;

        let mut writer = BufWriter::new(&file);
        let line = serde_json::to_string(project).context("Failed to serialize project")?;
        writeln!(writer, "{}", line).context("Failed to write project")?;

        writer.flush().context("Failed to flush project store")?;

        Ok(())
    }

    /// Reads the current record, applies `operation` and persists the result.
    ///
    /// The writer lock is held from the read until the rewrite, so the
    /// operation always sees the latest record. Nothing is written when the
    /// operation fails or changes nothing.
    pub fn apply<F>(&self, id: &ProjectId, operation: F) -> Result<Transition>
    where
        F: FnOnce(&Project) -> Result<Transition>,
    {
        let _lock = self.lock()?;

        let mut projects = self.read_all()?;
        let current = projects
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("Project not found: {}", id))?;

        let transition = operation(current)?;
        if !transition.is_noop() {
            projects.insert(id.clone(), transition.project.clone());
            self.rewrite(&projects)?;
        }

        Ok(transition)
    }
}
