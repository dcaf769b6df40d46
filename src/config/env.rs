//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::types::{OutputFormat, ProtocolVariant};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "NBT_DATA_DIR" => {
                if value.trim().is_empty() {
                    return Err(AppError::config("NBT_DATA_DIR cannot be empty"));
                }
            }
            "NBT_OUTPUT_FORMAT" => {
                value.parse::<OutputFormat>()
                    .map_err(|e| AppError::config(format!("Invalid NBT_OUTPUT_FORMAT value '{}': {}", value, e)))?;
            }
            "NBT_DEFAULT_VARIANT" => {
                value.parse::<ProtocolVariant>()
                    .map_err(|e| AppError::config(format!("Invalid NBT_DEFAULT_VARIANT value '{}': {}", value, e)))?;
            }
            "ENABLE_COLOR" => {
                value.parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("NBT_DATA_DIR", "Directory holding the partition files", "./data"),
            ("NBT_OUTPUT_FORMAT", "Output format (table or json)", "table"),
            ("NBT_DEFAULT_VARIANT", "Variant listed when none is given", "mrtp-redundancy"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<20} {}\n", var, description));
            help.push_str(&format!("  {:<20} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(var_name, _, _)| {
                let value = std::env::var(var_name).ok()?;
                Self::validate_env_var(var_name, &value)
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_manager_validate_env_var() {
        assert!(EnvManager::validate_env_var("NBT_DATA_DIR", "/var/lib/nbt").is_ok());
        assert!(EnvManager::validate_env_var("NBT_OUTPUT_FORMAT", "json").is_ok());
        assert!(EnvManager::validate_env_var("NBT_DEFAULT_VARIANT", "kcp").is_ok());
        assert!(EnvManager::validate_env_var("NBT_DEFAULT_VARIANT", "mrtpunsequenced").is_ok());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "false").is_ok());
        assert!(EnvManager::validate_env_var("SOMETHING_ELSE", "whatever").is_ok());

        assert!(EnvManager::validate_env_var("NBT_DATA_DIR", "  ").is_err());
        assert!(EnvManager::validate_env_var("NBT_OUTPUT_FORMAT", "xml").is_err());
        assert!(EnvManager::validate_env_var("NBT_DEFAULT_VARIANT", "udp").is_err());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "maybe").is_err());
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();

        assert!(help.contains("Supported Environment Variables:"));
        assert!(help.contains("NBT_DATA_DIR"));
        assert!(help.contains("Configuration Priority"));
        assert!(help.contains("Command-line arguments"));
    }

    #[test]
    fn test_load_missing_env_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EnvManager::load_env_file_from(&dir.path().join(".env"), false).is_ok());
    }
}
