//! Configuration handling for prodtrack
//!
//! Configuration is stored in `.prodtrack/config.toml` (workspace) and
//! `~/.config/prodtrack/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Weekday;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::workspace::WORKSPACE_DIR;
use crate::domain::{Actor, BusinessCalendar, Priority};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Who gets recorded as completing stages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Actor name (defaults to $PRODTRACK_ACTOR, then $USER)
    pub name: Option<String>,
}

impl ActorConfig {
    /// Gets the effective actor name from config, environment, or defaults
    pub fn effective_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| std::env::var("PRODTRACK_ACTOR").ok())
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

/// Workspace-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// The weekly non-working day
    pub rest_day: Weekday,

    /// Priority given to new projects (1-5)
    pub default_priority: u8,

    /// Business days to the global deadline at which a project counts as urgent
    pub urgent_window_days: i64,

    pub actor: ActorConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            rest_day: Weekday::Sun,
            default_priority: 3,
            urgent_window_days: 3,
            actor: ActorConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Rejects values the domain would refuse later
    pub fn validate(&self) -> Result<(), ConfigError> {
        Priority::new(i64::from(self.default_priority))
            .map_err(|e| ConfigError::Invalid(format!("default_priority: {}", e)))?;

        if self.urgent_window_days < 0 {
            return Err(ConfigError::Invalid(format!(
                "urgent_window_days must not be negative, got {}",
                self.urgent_window_days
            )));
        }

        Ok(())
    }

    pub fn calendar(&self) -> BusinessCalendar {
        BusinessCalendar::new(self.rest_day)
    }

    pub fn default_priority(&self) -> Priority {
        Priority::new(i64::from(self.default_priority)).unwrap_or_default()
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.actor.effective_name())
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + workspace)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
}

impl Config {
    /// Loads configuration for a specific workspace
    pub fn for_workspace(root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(root)?;

        Ok(Self { project, global })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "prodtrack", "prodtrack").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    pub fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads workspace configuration from a specific root
    fn load_project_config(root: &Path) -> Result<ProjectConfig> {
        let config_path = root.join(WORKSPACE_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        config
            .validate()
            .with_context(|| format!("Invalid project config: {}", config_path.display()))?;

        Ok(config)
    }

    /// Saves the workspace configuration
    pub fn save_project(&self, root: &Path) -> Result<()> {
        let config_path = root.join(WORKSPACE_DIR).join("config.toml");

        let content =
            toml::to_string_pretty(&self.project).context("Failed to serialize project config")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write project config: {}", config_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = ProjectConfig::default();
        assert_eq!(config.rest_day, Weekday::Sun);
        assert_eq!(config.default_priority().value(), 3);
        assert_eq!(config.urgent_window_days, 3);
        assert!(config.validate().is_ok());
        assert_eq!(GlobalConfig::default().default_format, OutputFormat::Text);
    }

    #[test]
    fn parse_project_config() {
        let toml = r#"
rest_day = "Sat"
default_priority = 2
urgent_window_days = 5

[actor]
name = "planta"
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.rest_day, Weekday::Sat);
        assert_eq!(config.calendar().rest_day(), Weekday::Sat);
        assert_eq!(config.default_priority().value(), 2);
        assert_eq!(config.urgent_window_days, 5);
        assert_eq!(config.actor().as_str(), "planta");
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: ProjectConfig = toml::from_str("urgent_window_days = 1").unwrap();
        assert_eq!(config.rest_day, Weekday::Sun);
        assert_eq!(config.default_priority, 3);
    }

    #[test]
    fn parse_global_config() {
        let config: GlobalConfig = toml::from_str(r#"default_format = "json""#).unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
    }

    #[test]
    fn invalid_priority_is_rejected() {
        let config = ProjectConfig {
            default_priority: 7,
            ..ProjectConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_file_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let prodtrack_dir = dir.path().join(WORKSPACE_DIR);
        fs::create_dir_all(&prodtrack_dir).unwrap();
        fs::write(prodtrack_dir.join("config.toml"), "default_priority = 0\n").unwrap();

        assert!(Config::for_workspace(dir.path()).is_err());
    }

    #[test]
    fn save_and_reload() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(WORKSPACE_DIR)).unwrap();

        let mut config = Config::for_workspace(dir.path()).unwrap();
        config.project.rest_day = Weekday::Fri;
        config.save_project(dir.path()).unwrap();

        let reloaded = Config::for_workspace(dir.path()).unwrap();
        assert_eq!(reloaded.project.rest_day, Weekday::Fri);
    }

    #[test]
    fn actor_name_from_config_wins() {
        let actor = ActorConfig {
            name: Some("ana".to_string()),
        };
        assert_eq!(actor.effective_name(), "ana");
    }
}
