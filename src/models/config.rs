//! Configuration data model and validation

use crate::types::{AppError, OutputFormat, ProtocolVariant, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one JSON-lines file per storage partition
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// How command results are printed
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,

    /// Variant listed when none is given
    #[serde(default = "default_variant")]
    pub default_variant: String,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_format: default_output_format(),
            default_variant: default_variant(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(AppError::config("Data directory cannot be empty"));
        }

        if self.data_dir.is_file() {
            return Err(AppError::config(format!(
                "Data directory '{}' is a file",
                self.data_dir.display()
            )));
        }

        self.default_variant
            .parse::<ProtocolVariant>()
            .map_err(|_| AppError::config(format!("Unknown default variant: {}", self.default_variant)))?;

        Ok(())
    }

    /// The default variant as a typed value
    pub fn default_protocol_variant(&self) -> Result<ProtocolVariant> {
        self.default_variant.parse()
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(data_dir) = std::env::var("NBT_DATA_DIR") {
            let data_dir = data_dir.trim();
            if !data_dir.is_empty() {
                self.data_dir = PathBuf::from(data_dir);
            }
        }

        if let Ok(format) = std::env::var("NBT_OUTPUT_FORMAT") {
            self.output_format = format.parse()
                .map_err(|e| AppError::config(format!("Invalid NBT_OUTPUT_FORMAT value '{}': {}", format, e)))?;
        }

        if let Ok(variant) = std::env::var("NBT_DEFAULT_VARIANT") {
            self.default_variant = variant.trim().to_string();
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_data_dir() -> PathBuf {
    PathBuf::from(crate::defaults::DEFAULT_DATA_DIR)
}

fn default_output_format() -> OutputFormat {
    crate::defaults::DEFAULT_OUTPUT_FORMAT
}

fn default_variant() -> String {
    crate::defaults::DEFAULT_VARIANT.to_string()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
