//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting. This is the only layer
//! that reads the system clock.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Workspace setup | `init` |
//! | Project | Record and stage changes | `project add`, `project advance`, `project sub` |
//! | Board | Ranked and grouped views | `board`, `area metalwork`, `status` |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output:
//! ```bash
//! prodtrack --verbose board
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod board;
mod output;
mod project;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
