//! Command-line interface definition

use crate::types::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Browse transport benchmark runs and their latency distributions
#[derive(Parser, Debug, Clone)]
#[command(name = "nbt")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the partition files (one <partition>.jsonl per variant)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Force colored output
    #[arg(long, global = true, conflicts_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations offered by the tool
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the known protocol variants
    Variants,

    /// Show how many runs each variant holds
    Overview,

    /// List run summaries of one variant
    List {
        /// Variant id, e.g. `kcp` or `mrtp-redundancy` (defaults to the configured variant)
        variant: Option<String>,
    },

    /// Show one run with its latency histogram
    Detail {
        /// Variant id
        variant: String,

        /// Record id
        id: String,

        /// Also print every RTT sample
        #[arg(long)]
        raw: bool,
    },

    /// Import a harness result CSV into its variant's partition
    Import {
        /// Path of the CSV file written by the benchmark harness
        file: PathBuf,
    },

    /// Show the effective configuration and supported environment variables
    Config,
}

impl Cli {
    /// Validate CLI arguments beyond what clap checks
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        match &self.command {
            Command::Detail { id, .. } if id.trim().is_empty() => {
                Err("Record id cannot be empty".to_string())
            }
            Command::List { variant: Some(variant) } if variant.trim().is_empty() => {
                Err("Variant id cannot be empty".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }

    /// Name of the selected subcommand, for logging
    pub fn command_name(&self) -> &'static str {
        self.command.name()
    }
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Variants => "variants",
            Command::Overview => "overview",
            Command::List { .. } => "list",
            Command::Detail { .. } => "detail",
            Command::Import { .. } => "import",
            Command::Config => "config",
        }
    }
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
