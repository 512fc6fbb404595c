//! Main CLI application structure

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{board, project};
use crate::domain::WorkArea;
use crate::storage::{Config, Workspace};

#[derive(Parser)]
#[command(name = "prodtrack")]
#[command(author, version, about = "Stage tracking for manufacturing and installation projects")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Name recorded when completing stages
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Reference date for schedules (YYYY-MM-DD, defaults to today in UTC)
    #[arg(long, global = true, env = "PRODTRACK_TODAY")]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new prodtrack workspace
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage projects
    #[command(subcommand)]
    Project(project::ProjectCommands),

    /// Show in-flight projects ranked by urgency
    Board,

    /// Show the work queue for an area
    Area {
        /// design, procurement, manufacturing, metalwork or installation
        area: WorkArea,
    },

    /// Show workspace statistics
    Status,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = match cli.format {
        Some(format) => format,
        None => Config::load_global()?.default_format.into(),
    };
    let output = Output::new(format, cli.verbose);

    output.verbose("prodtrack starting");

    let today = cli.today.unwrap_or_else(|| Utc::now().date_naive());

    match cli.command {
        Commands::Init { path } => {
            output.verbose_ctx("init", &format!("Initializing workspace at: {}", path));
            let workspace = Workspace::init(&path)?;
            output.verbose_ctx(
                "init",
                &format!("Created directory at: {}", workspace.data_dir().display()),
            );
            output.success(&format!(
                "Initialized prodtrack workspace at {}",
                workspace.root().display()
            ));
        }

        Commands::Project(cmd) => project::run(cmd, &output, cli.actor.as_deref(), cli.today)?,

        Commands::Board => board::board(&output, today)?,
        Commands::Area { area } => board::area(&output, area, today)?,
        Commands::Status => board::status(&output, today)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}
