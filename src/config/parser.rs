//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    models::Config,
    error::Result,
    config::env::EnvManager,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        // .env values only fill variables that are not already set
        EnvManager::load_env_file(self.cli.debug)?;

        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config);

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        if let Some(ref data_dir) = self.cli.data_dir {
            config.data_dir = data_dir.clone();
        }

        if let Some(format) = self.cli.format {
            config.output_format = format;
        }

        if self.cli.color || self.cli.no_color {
            config.enable_color = self.cli.color;
        } else {
            config.enable_color = config.enable_color && self.cli.use_colors();
        }

        // CLI-only flags
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!("{}", display_config_summary(config));
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    let parser = ConfigParser::new(cli);
    parser.parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Data Directory: {}", config.data_dir.display()));
    summary.push(format!("Output Format: {}", config.output_format));
    summary.push(format!("Default Variant: {}", config.default_variant));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
