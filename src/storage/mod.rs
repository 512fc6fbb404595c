//! # Storage Layer
//!
//! Caller-side persistence for prodtrack. The domain layer never touches
//! these types; the CLI reads a record here, runs a domain operation and
//! writes the returned record back.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Projects | JSONL (one JSON per line) | `.prodtrack/projects.jsonl` |
//! | Config | TOML | `.prodtrack/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`ProjectStore`] uses file locking (`fs2`) for concurrent access
//! - Read-modify-write runs under one exclusive lock on `projects.lock`
//! - All full rewrites are atomic (uniquely named temp file + rename)
//!
//! ## Key Types
//!
//! - [`Workspace`] - Entry point for accessing a prodtrack workspace
//! - [`ProjectStore`] - Read/write project records as JSONL
//! - [`Config`] - Workspace and global configuration

mod config;
mod jsonl;
mod workspace;

pub use config::{ActorConfig, Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig};
pub use jsonl::ProjectStore;
pub use workspace::{find_root, Workspace, WorkspaceError, WORKSPACE_DIR};
