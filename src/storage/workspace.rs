//! Workspace management
//!
//! Handles workspace initialization and provides access to the store and
//! configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::{Config, ProjectStore};

/// Name of the directory holding workspace data
pub const WORKSPACE_DIR: &str = ".prodtrack";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Not in a prodtrack workspace. Run 'prodtrack init' first.")]
    NotInWorkspace,
}

/// A prodtrack workspace
pub struct Workspace {
    root: PathBuf,
    config: Config,
}

impl Workspace {
    /// Opens an existing workspace at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(WORKSPACE_DIR).is_dir() {
            return Err(WorkspaceError::NotInWorkspace.into());
        }

        let config = Config::for_workspace(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the workspace at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let root = find_root(&cwd).ok_or(WorkspaceError::NotInWorkspace)?;

        Self::open(root)
    }

    /// Initializes a new workspace at the given path
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let data_dir = root.join(WORKSPACE_DIR);

        fs::create_dir_all(&data_dir).with_context(|| {
            format!("Failed to create {} directory: {}", WORKSPACE_DIR, data_dir.display())
        })?;

        let config_path = data_dir.join("config.toml");
        if !config_path.exists() {
            let default_config = r#"# prodtrack configuration

# Weekly non-working day, skipped by every deadline calculation
rest_day = "Sun"

# Priority for new projects: 1 (most urgent) to 5
default_priority = 3

# Business days to the global deadline at which a project counts as urgent
urgent_window_days = 3

[actor]
# Recorded as the person completing stages.
# Falls back to $PRODTRACK_ACTOR, then $USER.
# name = "workshop"
"#;
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = data_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, "*.tmp\n*.lock\n").with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        Self::open(root)
    }

    /// Returns the workspace root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .prodtrack directory path
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the project store
    pub fn store(&self) -> ProjectStore {
        ProjectStore::for_workspace(&self.root)
    }
}

/// Walks up from `start` looking for a `.prodtrack/` directory
pub fn find_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(WORKSPACE_DIR).is_dir() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}
